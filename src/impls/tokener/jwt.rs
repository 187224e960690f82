use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::core::ports::tokener::{Payload, Tokener};
use crate::error::Error;

/// HS256 tokens signed with a shared secret.
pub struct JWT {
    secret: Vec<u8>,
}

impl JWT {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }
}

impl<P> Tokener<P> for JWT
where
    P: Payload,
{
    fn gen_token(&self, payload: &P) -> Result<String, Error> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(&self.secret);
        let token = encode(&header, payload, &key)?;
        Ok(token)
    }

    fn verify_token(&self, token: &str) -> Result<P, Error> {
        let key = DecodingKey::from_secret(&self.secret);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        let payload = decode(token, &key, &validation)?;
        Ok(payload.claims)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::services::identity::Claim;
    use chrono::{Duration, Utc};

    fn claim(sub: &str, exp: Duration) -> Claim {
        let now = Utc::now();
        Claim {
            sub: sub.into(),
            iat: now.timestamp(),
            exp: (now + exp).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn test_gen_and_verify_token() {
        let jwt = JWT::new(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 0]);
        let claim = claim("alice", Duration::hours(1));
        let token = jwt.gen_token(&claim).unwrap();
        let c: Claim = jwt.verify_token(&token).unwrap();
        assert_eq!(claim.sub, c.sub);
        assert_eq!(claim.jti, c.jti);
    }

    #[test]
    fn test_expired_token() {
        let jwt = JWT::new(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 0]);
        let token = jwt.gen_token(&claim("alice", Duration::minutes(-5))).unwrap();
        let res: Result<Claim, Error> = jwt.verify_token(&token);
        assert!(matches!(res, Err(Error::JWTError(_))));
    }

    #[test]
    fn test_wrong_secret() {
        let token = JWT::new(b"one".to_vec()).gen_token(&claim("alice", Duration::hours(1))).unwrap();
        let res: Result<Claim, Error> = JWT::new(b"two".to_vec()).verify_token(&token);
        assert!(res.is_err());
    }
}
