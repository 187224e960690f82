use crate::actix_web::web::{Data, Json};
use crate::context::AccountInfo;
use crate::core::models::account::{Profile, Update};
use crate::core::ports::repository::Manager;
use crate::core::services::identity;
use crate::error::Error;

pub async fn detail<M>(account: AccountInfo, store: Data<M>) -> Result<Json<Profile>, Error>
where
    M: Manager + 'static,
{
    let account = identity::get_account(store.get_ref(), account.id).await?;
    Ok(Json(account.into()))
}

pub async fn update<M>(account: AccountInfo, store: Data<M>, Json(body): Json<Update>) -> Result<Json<Profile>, Error>
where
    M: Manager + 'static,
{
    let account = identity::update_account(store.get_ref(), account.id, body).await?;
    Ok(Json(account.into()))
}
