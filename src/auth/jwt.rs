use std::{fmt, sync::Arc};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    auth::token::{TokenError, TokenMaker, TokenPayload},
    clock::Clock,
    config::JwtConfig,
};

/// Shortest HMAC secret accepted by [`JwtMaker`].
pub const MIN_SECRET_SIZE: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    jti: Uuid,   // token id
    sub: Uuid,   // user id
    iat: i64,    // issued at (unix seconds)
    exp: i64,    // expires at (unix seconds)
    iss: String, // issuer
    aud: String, // audience
}

/// HS256 JWT implementation of [`TokenMaker`].
#[derive(Clone)]
pub struct JwtMaker {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for JwtMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtMaker")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl JwtMaker {
    pub fn new(
        secret: &str,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_SIZE {
            return Err(TokenError::InvalidKeySize {
                min: MIN_SECRET_SIZE,
            });
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            audience: audience.into(),
            clock,
        })
    }

    pub fn from_config(cfg: &JwtConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        Self::new(&cfg.secret, cfg.issuer.clone(), cfg.audience.clone(), clock)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock in `verify`.
        validation.validate_exp = false;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation
    }
}

fn timestamp(secs: i64) -> Result<OffsetDateTime, TokenError> {
    OffsetDateTime::from_unix_timestamp(secs).map_err(|_| TokenError::InvalidToken)
}

impl TokenMaker for JwtMaker {
    fn issue(&self, subject: Uuid, duration: Duration) -> Result<String, TokenError> {
        let ttl = duration.whole_seconds();
        if ttl < 1 {
            return Err(TokenError::InvalidDuration);
        }
        let iat = self.clock.now().unix_timestamp();
        // The expiry must stay representable, or the token could never be verified.
        let exp = iat
            .checked_add(ttl)
            .filter(|exp| OffsetDateTime::from_unix_timestamp(*exp).is_ok())
            .ok_or(TokenError::InvalidDuration)?;
        let claims = Claims {
            jti: Uuid::new_v4(),
            sub: subject,
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            error!(error = %e, "jwt encode failed");
            TokenError::Issuance(e.to_string())
        })?;
        debug!(user_id = %subject, token_id = %claims.jti, "jwt signed");
        Ok(token)
    }

    fn verify(&self, token: &str) -> Result<TokenPayload, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation()).map_err(|e| {
            warn!(error = %e, "jwt rejected");
            TokenError::InvalidToken
        })?;
        let claims = data.claims;

        if self.clock.now().unix_timestamp() >= claims.exp {
            debug!(user_id = %claims.sub, "jwt expired");
            return Err(TokenError::ExpiredToken);
        }

        debug!(user_id = %claims.sub, token_id = %claims.jti, "jwt verified");
        Ok(TokenPayload {
            id: claims.jti,
            subject: claims.sub,
            issued_at: timestamp(claims.iat)?,
            expires_at: timestamp(claims.exp)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{testing::FixedClock, SystemClock};
    use time::macros::datetime;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn make_maker(clock: Arc<dyn Clock>) -> JwtMaker {
        JwtMaker::new(SECRET, "test-issuer", "test-aud", clock).expect("maker")
    }

    fn frozen() -> Arc<FixedClock> {
        Arc::new(FixedClock::at(datetime!(2024-03-01 12:00:00 UTC)))
    }

    #[test]
    fn issue_and_verify_returns_subject() {
        let clock = frozen();
        let maker = make_maker(clock.clone());
        let user_id = Uuid::new_v4();

        let token = maker.issue(user_id, Duration::minutes(1)).expect("issue");
        let payload = maker.verify(&token).expect("verify");

        assert_eq!(payload.subject, user_id);
        assert_eq!(payload.issued_at, datetime!(2024-03-01 12:00:00 UTC));
        assert_eq!(payload.expires_at, datetime!(2024-03-01 12:01:00 UTC));
    }

    #[test]
    fn works_with_system_clock() {
        let maker = make_maker(Arc::new(SystemClock));
        let user_id = Uuid::new_v4();
        let token = maker.issue(user_id, Duration::minutes(15)).unwrap();
        assert_eq!(maker.verify(&token).unwrap().subject, user_id);
    }

    #[test]
    fn token_expires_exactly_at_expiry() {
        let clock = frozen();
        let maker = make_maker(clock.clone());
        let token = maker.issue(Uuid::new_v4(), Duration::seconds(60)).unwrap();

        clock.advance(Duration::seconds(59));
        assert!(maker.verify(&token).is_ok());

        clock.advance(Duration::seconds(1));
        assert!(matches!(maker.verify(&token), Err(TokenError::ExpiredToken)));

        clock.advance(Duration::hours(1));
        assert!(matches!(maker.verify(&token), Err(TokenError::ExpiredToken)));
    }

    #[test]
    fn rejects_non_positive_duration() {
        let maker = make_maker(frozen());
        for d in [Duration::ZERO, Duration::seconds(-5), Duration::milliseconds(500)] {
            let err = maker.issue(Uuid::new_v4(), d).unwrap_err();
            assert!(matches!(err, TokenError::InvalidDuration), "{d:?}");
        }
    }

    #[test]
    fn rejects_duration_past_representable_time() {
        let maker = make_maker(frozen());
        let err = maker
            .issue(Uuid::new_v4(), Duration::days(365 * 10_000))
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidDuration));
    }

    #[test]
    fn long_but_representable_duration_verifies() {
        let maker = make_maker(frozen());
        let user_id = Uuid::new_v4();
        let token = maker.issue(user_id, Duration::days(365 * 1_000)).unwrap();
        assert_eq!(maker.verify(&token).unwrap().subject, user_id);
    }

    #[test]
    fn rejects_short_secret() {
        let err = JwtMaker::new("too-short", "iss", "aud", Arc::new(SystemClock)).unwrap_err();
        assert!(matches!(err, TokenError::InvalidKeySize { min: 32 }));
    }

    #[test]
    fn each_token_gets_a_fresh_id() {
        let maker = make_maker(frozen());
        let user_id = Uuid::new_v4();
        let a = maker.issue(user_id, Duration::minutes(1)).unwrap();
        let b = maker.issue(user_id, Duration::minutes(1)).unwrap();
        assert_ne!(a, b);
        assert_ne!(maker.verify(&a).unwrap().id, maker.verify(&b).unwrap().id);
    }

    #[test]
    fn any_single_bit_flip_is_rejected() {
        let maker = make_maker(frozen());
        let token = maker.issue(Uuid::new_v4(), Duration::minutes(5)).unwrap();
        let bytes = token.as_bytes();

        for i in 0..bytes.len() {
            for bit in 0..8 {
                let mut mutated = bytes.to_vec();
                mutated[i] ^= 1 << bit;
                let mutated = String::from_utf8_lossy(&mutated).into_owned();
                assert!(
                    matches!(maker.verify(&mutated), Err(TokenError::InvalidToken)),
                    "byte {i} bit {bit} accepted"
                );
            }
        }
    }

    #[test]
    fn rejects_token_from_other_secret() {
        let clock = frozen();
        let other = JwtMaker::new(
            "ffffffffffffffffffffffffffffffff",
            "test-issuer",
            "test-aud",
            clock.clone(),
        )
        .unwrap();
        let token = other.issue(Uuid::new_v4(), Duration::minutes(1)).unwrap();
        let maker = make_maker(clock);
        assert!(matches!(maker.verify(&token), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn rejects_wrong_issuer_or_audience() {
        let clock = frozen();
        let good = make_maker(clock.clone());
        let bad = JwtMaker::new(SECRET, "bad-iss", "bad-aud", clock).unwrap();
        let token = good.issue(Uuid::new_v4(), Duration::minutes(1)).unwrap();
        assert!(matches!(bad.verify(&token), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn rejects_garbage() {
        let maker = make_maker(frozen());
        for token in ["", "abc", "a.b.c", "not.a.jwt.at.all"] {
            assert!(matches!(maker.verify(token), Err(TokenError::InvalidToken)));
        }
    }

    #[test]
    fn debug_does_not_print_secret() {
        let maker = make_maker(frozen());
        let printed = format!("{maker:?}");
        assert!(!printed.contains(SECRET));
    }
}
