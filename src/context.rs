use std::future::{ready, Ready};

use uuid::Uuid;

use crate::actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use crate::error::Error;

/// The authenticated caller, placed in the request extensions by the JWT middleware.
#[derive(Debug, Clone, Copy)]
pub struct AccountInfo {
    pub id: Uuid,
}

impl FromRequest for AccountInfo {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<Self>() {
            Some(account) => ready(Ok(*account)),
            None => ready(Err(Error::Unauthorized("authentication required".into()))),
        }
    }
}
