use uuid::Uuid;

use crate::actix_web::{
    web::{Data, Json, Path},
    HttpResponse,
};
use crate::context::AccountInfo;
use crate::core::models::poll::{Create, Join, PollView, Rename};
use crate::core::models::vote::PollOptionResult;
use crate::core::ports::repository::Manager;
use crate::core::services::{poll as poll_service, vote as vote_service};
use crate::error::Error;

pub async fn list<M>(account: AccountInfo, store: Data<M>) -> Result<Json<Vec<PollView>>, Error>
where
    M: Manager + 'static,
{
    Ok(Json(poll_service::list_polls(store.get_ref(), account.id).await?))
}

pub async fn create<M>(account: AccountInfo, store: Data<M>, Json(body): Json<Create>) -> Result<HttpResponse, Error>
where
    M: Manager + 'static,
{
    let poll = poll_service::create_poll(store.get_ref(), account.id, body).await?;
    Ok(HttpResponse::Created().json(poll))
}

pub async fn detail<M>(account: AccountInfo, store: Data<M>, poll_id: Path<Uuid>) -> Result<Json<PollView>, Error>
where
    M: Manager + 'static,
{
    Ok(Json(poll_service::get_poll(store.get_ref(), poll_id.into_inner(), account.id).await?))
}

pub async fn rename<M>(account: AccountInfo, store: Data<M>, poll_id: Path<Uuid>, Json(body): Json<Rename>) -> Result<Json<PollView>, Error>
where
    M: Manager + 'static,
{
    Ok(Json(poll_service::rename_poll(store.get_ref(), poll_id.into_inner(), account.id, body).await?))
}

pub async fn delete_poll<M>(account: AccountInfo, store: Data<M>, poll_id: Path<Uuid>) -> Result<HttpResponse, Error>
where
    M: Manager + 'static,
{
    poll_service::delete_poll(store.get_ref(), poll_id.into_inner(), account.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// The poll is resolved from the invite code alone; the id in the path is not consulted.
pub async fn join<M>(account: AccountInfo, store: Data<M>, Json(body): Json<Join>) -> Result<Json<PollView>, Error>
where
    M: Manager + 'static,
{
    Ok(Json(poll_service::join_poll(store.get_ref(), account.id, body).await?))
}

pub async fn results<M>(account: AccountInfo, store: Data<M>, poll_id: Path<Uuid>) -> Result<Json<Vec<PollOptionResult>>, Error>
where
    M: Manager + 'static,
{
    Ok(Json(vote_service::get_results(store.get_ref(), poll_id.into_inner(), account.id).await?))
}
