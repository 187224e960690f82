use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Claims carried inside an access token.
pub trait Payload: Serialize + for<'d> Deserialize<'d> {
    /// Identifier of the account the token was issued to.
    fn user(&self) -> &str;
}

pub trait Tokener<P: Payload> {
    fn gen_token(&self, payload: &P) -> Result<String, Error>;
    /// Fails on a bad signature, a malformed token or an expired one.
    fn verify_token(&self, token: &str) -> Result<P, Error>;
}
