use std::future::{ready, Future, Ready};
use std::marker::PhantomData;
use std::pin::Pin;
use std::rc::Rc;

use log::warn;

use crate::actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web::Data,
    HttpMessage,
};
use crate::context::AccountInfo;
use crate::core::ports::repository::Manager;
use crate::core::services::identity;
use crate::error::Error;
use crate::impls::tokener::jwt::JWT;

/// Rejects requests without a valid bearer token and exposes the caller as [`AccountInfo`].
///
/// The store (`Data<M>`) and the tokener (`Data<JWT>`) are taken from the app data.
pub struct JwtAuth<M> {
    _store: PhantomData<fn() -> M>,
}

impl<M> JwtAuth<M> {
    pub fn new() -> Self {
        Self { _store: PhantomData }
    }
}

impl<M> Default for JwtAuth<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B, M> Transform<S, ServiceRequest> for JwtAuth<M>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
    M: Manager + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Transform = JwtAuthService<S, M>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthService {
            next_service: Rc::new(service),
            _store: PhantomData,
        }))
    }
}

pub struct JwtAuthService<S, M> {
    next_service: Rc<S>,
    _store: PhantomData<fn() -> M>,
}

fn bearer_token(req: &ServiceRequest) -> Result<String, Error> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::Unauthorized("authorization header missing".into()))?;
    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Unauthorized("invalid authorization header format".into()))?;
    Ok(token.to_owned())
}

async fn authenticate<M>(req: &ServiceRequest) -> Result<AccountInfo, Error>
where
    M: Manager + 'static,
{
    let token = bearer_token(req)?;
    let store = req
        .app_data::<Data<M>>()
        .cloned()
        .ok_or_else(|| Error::ServerError("store is not registered".into()))?;
    let tokener = req
        .app_data::<Data<JWT>>()
        .cloned()
        .ok_or_else(|| Error::ServerError("tokener is not registered".into()))?;
    let account = identity::authenticate(store.get_ref(), tokener.get_ref(), &token).await?;
    Ok(AccountInfo { id: account.id })
}

impl<S, B, M> Service<ServiceRequest> for JwtAuthService<S, M>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
    M: Manager + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.next_service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let next_service = self.next_service.clone();
        Box::pin(async move {
            match authenticate::<M>(&req).await {
                Ok(account) => {
                    req.extensions_mut().insert(account);
                    let resp = next_service.call(req).await?;
                    Ok(resp.map_into_left_body())
                }
                Err(e) => {
                    warn!("rejected {} {}: {}", req.method(), req.path(), e);
                    Ok(req.error_response(e).map_into_right_body())
                }
            }
        })
    }
}
