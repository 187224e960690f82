use uuid::Uuid;

use crate::actix_web::{
    web::{Data, Json, Path},
    HttpResponse,
};
use crate::config::Config;
use crate::context::AccountInfo;
use crate::core::models::vote::{Ballot, Vote};
use crate::core::ports::repository::Manager;
use crate::core::services::vote as vote_service;
use crate::error::Error;

pub async fn cast<M>(account: AccountInfo, store: Data<M>, config: Data<Config>, poll_id: Path<Uuid>, Json(body): Json<Ballot>) -> Result<Json<Vote>, Error>
where
    M: Manager + 'static,
{
    Ok(Json(vote_service::cast_vote(store.get_ref(), config.vote_policy, poll_id.into_inner(), account.id, body).await?))
}

pub async fn retract<M>(account: AccountInfo, store: Data<M>, poll_id: Path<Uuid>, Json(body): Json<Ballot>) -> Result<HttpResponse, Error>
where
    M: Manager + 'static,
{
    vote_service::retract_vote(store.get_ref(), poll_id.into_inner(), account.id, body).await?;
    Ok(HttpResponse::NoContent().finish())
}
