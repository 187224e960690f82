use uuid::Uuid;

use crate::actix_web::{
    web::{Data, Json, Path},
    HttpResponse,
};
use crate::context::AccountInfo;
use crate::core::models::option::{Opt, OptCreate};
use crate::core::ports::repository::Manager;
use crate::core::services::option as option_service;
use crate::error::Error;

pub async fn add<M>(account: AccountInfo, store: Data<M>, poll_id: Path<Uuid>, Json(body): Json<OptCreate>) -> Result<HttpResponse, Error>
where
    M: Manager + 'static,
{
    let opt = option_service::add_option(store.get_ref(), poll_id.into_inner(), account.id, body).await?;
    Ok(HttpResponse::Created().json(opt))
}

pub async fn list<M>(account: AccountInfo, store: Data<M>, poll_id: Path<Uuid>) -> Result<Json<Vec<Opt>>, Error>
where
    M: Manager + 'static,
{
    Ok(Json(option_service::list_options(store.get_ref(), poll_id.into_inner(), account.id).await?))
}
