use chrono::{Duration, Utc};
use hex::ToHex;
use log::{info, warn};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::models::account::{Account, Insert as AccountInsert, Login, Patch as AccountPatch, Register, Token, Update};
use crate::core::ports::repository::AccountCommon;
use crate::core::ports::tokener::{Payload, Tokener};
use crate::error::Error;

pub const MAX_NAME_LEN: usize = 50;
const SALT_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Payload for Claim {
    fn user(&self) -> &str {
        &self.sub
    }
}

fn hash_password(pass: &str, slt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pass);
    hasher.update(slt);
    hasher.finalize().encode_hex()
}

// constant time in the length of the stored hash
fn verify_password(pass: &str, slt: &str, hash: &str) -> bool {
    let computed = hash_password(pass, slt);
    computed.len() == hash.len() && computed.bytes().zip(hash.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

fn random_salt() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(SALT_LEN).map(char::from).collect()
}

fn validate_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Invalid("name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::Invalid(format!("name must be at most {} characters", MAX_NAME_LEN)));
    }
    Ok(name.to_owned())
}

fn validate_email(email: &str) -> Result<String, Error> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace),
        None => false,
    };
    if !valid {
        return Err(Error::Invalid("email is not valid".into()));
    }
    Ok(email.to_owned())
}

fn validate_password(password: &str) -> Result<(), Error> {
    if password.is_empty() {
        return Err(Error::Invalid("password must not be empty".into()));
    }
    Ok(())
}

pub async fn register<S>(store: &S, Register { name, email, password }: Register) -> Result<Account, Error>
where
    S: AccountCommon,
{
    let name = validate_name(&name)?;
    let email = validate_email(&email)?;
    validate_password(&password)?;
    let salt = random_salt();
    let account = AccountCommon::insert(
        store,
        AccountInsert {
            name,
            email,
            password_hash: hash_password(&password, &salt),
            salt,
        },
    )
    .await?;
    info!("account registered: {}", account.id);
    Ok(account)
}

pub async fn login<S, T>(store: &S, tokener: &T, ttl: Duration, Login { email, password }: Login) -> Result<Token, Error>
where
    S: AccountCommon,
    T: Tokener<Claim>,
{
    let account = match AccountCommon::get_by_email(store, &email).await? {
        Some(account) => account,
        None => {
            warn!("login failed for unknown email");
            return Err(Error::Unauthorized("invalid email or password".into()));
        }
    };
    if !verify_password(&password, &account.salt, &account.password_hash) {
        warn!("invalid password for account {}", account.id);
        return Err(Error::Unauthorized("invalid email or password".into()));
    }
    let now = Utc::now();
    let expires_at = now + ttl;
    let token = tokener.gen_token(&Claim {
        sub: account.id.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
        jti: Uuid::new_v4().to_string(),
    })?;
    info!("account logged in: {}", account.id);
    Ok(Token { token, expires_at })
}

/// Resolves a bearer token to the live account it was issued for.
pub async fn authenticate<S, T>(store: &S, tokener: &T, token: &str) -> Result<Account, Error>
where
    S: AccountCommon,
    T: Tokener<Claim>,
{
    let claim = tokener.verify_token(token).map_err(|_| Error::Unauthorized("invalid or expired token".into()))?;
    let id = claim.user().parse::<Uuid>().map_err(|_| Error::Unauthorized("invalid user id in token".into()))?;
    AccountCommon::get(store, id).await?.ok_or_else(|| Error::Unauthorized("invalid or expired token".into()))
}

pub async fn get_account<S>(store: &S, id: Uuid) -> Result<Account, Error>
where
    S: AccountCommon,
{
    AccountCommon::get(store, id).await?.ok_or_else(|| Error::NotFound("Account not found.".into()))
}

pub async fn update_account<S>(store: &S, id: Uuid, Update { name, email, password }: Update) -> Result<Account, Error>
where
    S: AccountCommon,
{
    let mut patch = AccountPatch {
        name: name.as_deref().map(validate_name).transpose()?,
        email: email.as_deref().map(validate_email).transpose()?,
        ..default::default()
    };
    if let Some(password) = password {
        validate_password(&password)?;
        let salt = random_salt();
        patch.password_hash = Some(hash_password(&password, &salt));
        patch.salt = Some(salt);
    }
    if patch.is_empty() {
        return Err(Error::Invalid("no fields provided for updating account".into()));
    }
    let account = AccountCommon::patch(store, id, patch).await?;
    info!("account updated: {}", account.id);
    Ok(account)
}
