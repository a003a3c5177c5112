use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::config::JwtConfig;

/// Signing and verification material for bearer tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::from_secs((config.ttl_minutes.max(1) as u64) * 60),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_at(user_id, OffsetDateTime::now_utc())
    }

    fn sign_at(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Checks signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}
