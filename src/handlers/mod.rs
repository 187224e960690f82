pub mod account;
pub mod option;
pub mod poll;
pub mod vote;

use crate::actix_web::{
    web::{Data, Json},
    HttpResponse,
};
use crate::config::Config;
use crate::core::models::account::{Login, Profile, Register, Token};
use crate::core::ports::repository::Manager;
use crate::core::services::identity;
use crate::error::Error;
use crate::impls::tokener::jwt::JWT;

pub async fn register<M>(store: Data<M>, Json(body): Json<Register>) -> Result<HttpResponse, Error>
where
    M: Manager + 'static,
{
    let account = identity::register(store.get_ref(), body).await?;
    Ok(HttpResponse::Created().json(Profile::from(account)))
}

pub async fn login<M>(store: Data<M>, tokener: Data<JWT>, config: Data<Config>, Json(body): Json<Login>) -> Result<Json<Token>, Error>
where
    M: Manager + 'static,
{
    let token = identity::login(store.get_ref(), tokener.get_ref(), config.token_ttl, body).await?;
    Ok(Json(token))
}
