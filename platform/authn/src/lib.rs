//! Platform authentication helpers.
//!
//! Turns presented credentials into an [`ActorContext`]. Access tokens carry
//! the account and its roles; refresh tokens carry the session they belong to
//! and are only exchanged by the server acting as the system actor.

mod password;
mod token;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use platform_authz::{AccountId, ActorContext};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub use password::{hash_password, verify_password};
pub use token::{Claims, IssuedToken, TokenKind};

/// Header used by the refresh and sign-out flows.
pub const REFRESH_TOKEN_HEADER: &str = "refresh-token";

/// Longest access token lifetime the server accepts: one day.
pub const MAX_ACCESS_TTL_MINUTES: i64 = 24 * 60;
/// Longest refresh token lifetime the server accepts: one year.
pub const MAX_REFRESH_TTL_DAYS: i64 = 365;

#[derive(Debug, Error)]
pub enum AuthnError {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("credentials expired")]
    Expired,
    #[error("invalid credentials")]
    InvalidToken,
    #[error("token kind not accepted here")]
    WrongTokenKind,
    #[error("invalid email or password")]
    InvalidPassword,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("token lifetime out of range")]
    TokenLifetime,
}

impl AuthnError {
    /// Errors that mean "the caller is not who they claim", as opposed to a
    /// failure on our side.
    pub fn is_unauthenticated(&self) -> bool {
        !matches!(
            self,
            AuthnError::Signing(_) | AuthnError::PasswordHash(_) | AuthnError::TokenLifetime
        )
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: Vec<u8>,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Vec::new(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 30,
        }
    }
}

/// Raw credential material read off a request.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub bearer: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
            refresh_token: None,
        }
    }

    pub fn refresh(token: impl Into<String>) -> Self {
        Self {
            bearer: None,
            refresh_token: Some(token.into()),
        }
    }
}

/// A verified refresh token: the account and the session it was issued for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RefreshGrant {
    pub account_id: AccountId,
    pub session_id: Uuid,
}

pub struct Authenticator {
    config: AuthConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Authenticator {
    pub fn new(config: AuthConfig) -> Self {
        let encoding = EncodingKey::from_secret(&config.jwt_secret);
        let decoding = DecodingKey::from_secret(&config.jwt_secret);
        Self {
            config,
            encoding,
            decoding,
            validation: Validation::default(),
        }
    }

    /// Resolve the bearer credential into the actor for this request.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<ActorContext, AuthnError> {
        let token = credentials
            .bearer
            .as_deref()
            .ok_or(AuthnError::MissingCredentials)?;
        let claims = self.decode(token, TokenKind::Access)?;
        debug!(account = %claims.sub, "bearer token accepted");
        Ok(ActorContext::account(claims.sub.into(), claims.roles))
    }

    /// Verify the refresh credential. The caller still has to confirm the
    /// session has not been revoked.
    pub fn refresh_grant(&self, credentials: &Credentials) -> Result<RefreshGrant, AuthnError> {
        let token = credentials
            .refresh_token
            .as_deref()
            .ok_or(AuthnError::MissingCredentials)?;
        let claims = self.decode(token, TokenKind::Refresh)?;
        let session_id = claims.sid.ok_or(AuthnError::InvalidToken)?;
        Ok(RefreshGrant {
            account_id: claims.sub.into(),
            session_id,
        })
    }

    pub fn issue_access(
        &self,
        account: AccountId,
        roles: &[String],
    ) -> Result<IssuedToken, AuthnError> {
        let ttl = Duration::try_minutes(self.config.access_ttl_minutes)
            .ok_or(AuthnError::TokenLifetime)?;
        self.issue(account, TokenKind::Access, roles.to_vec(), None, ttl)
    }

    pub fn issue_refresh(
        &self,
        account: AccountId,
        session_id: Uuid,
    ) -> Result<IssuedToken, AuthnError> {
        let ttl =
            Duration::try_days(self.config.refresh_ttl_days).ok_or(AuthnError::TokenLifetime)?;
        self.issue(account, TokenKind::Refresh, Vec::new(), Some(session_id), ttl)
    }

    fn issue(
        &self,
        account: AccountId,
        kind: TokenKind,
        roles: Vec<String>,
        sid: Option<Uuid>,
        ttl: Duration,
    ) -> Result<IssuedToken, AuthnError> {
        let now = Utc::now();
        let expires_at: DateTime<Utc> = now
            .checked_add_signed(ttl)
            .ok_or(AuthnError::TokenLifetime)?;
        let claims = Claims {
            sub: account.into_uuid(),
            kind,
            roles,
            sid,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(AuthnError::Signing)?;
        Ok(IssuedToken { token, expires_at })
    }

    fn decode(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthnError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthnError::Expired,
                _ => AuthnError::InvalidToken,
            })?;
        if claims.kind != expected {
            return Err(AuthnError::WrongTokenKind);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new(AuthConfig {
            jwt_secret: b"0123456789abcdef0123456789abcdef".to_vec(),
            ..AuthConfig::default()
        })
    }

    #[test]
    fn access_token_round_trips_into_an_actor() {
        let authn = authenticator();
        let account = AccountId::new(Uuid::new_v4());
        let issued = authn
            .issue_access(account, &["moderator".to_string()])
            .unwrap();

        let actor = authn
            .authenticate(&Credentials::bearer(issued.token))
            .unwrap();
        assert!(actor.is(account));
        assert!(actor.has_role("moderator"));
    }

    #[test]
    fn missing_bearer_is_rejected() {
        let err = authenticator()
            .authenticate(&Credentials::default())
            .unwrap_err();
        assert!(matches!(err, AuthnError::MissingCredentials));
        assert!(err.is_unauthenticated());
    }

    #[test]
    fn expired_token_is_rejected() {
        let authn = Authenticator::new(AuthConfig {
            jwt_secret: b"0123456789abcdef0123456789abcdef".to_vec(),
            access_ttl_minutes: -10,
            ..AuthConfig::default()
        });
        let issued = authn
            .issue_access(AccountId::new(Uuid::new_v4()), &[])
            .unwrap();
        let err = authn
            .authenticate(&Credentials::bearer(issued.token))
            .unwrap_err();
        assert!(matches!(err, AuthnError::Expired));
    }

    #[test]
    fn oversized_lifetimes_are_errors_not_panics() {
        let authn = Authenticator::new(AuthConfig {
            jwt_secret: b"0123456789abcdef0123456789abcdef".to_vec(),
            access_ttl_minutes: i64::MAX / 2,
            refresh_ttl_days: i64::MAX / 2,
        });
        let account = AccountId::new(Uuid::new_v4());

        let err = authn.issue_access(account, &[]).unwrap_err();
        assert!(matches!(err, AuthnError::TokenLifetime));
        assert!(!err.is_unauthenticated());
        let err = authn.issue_refresh(account, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AuthnError::TokenLifetime));
    }

    #[test]
    fn lifetime_past_the_calendar_is_an_error() {
        // Fits in a TimeDelta but overflows the date range when added to now.
        let authn = Authenticator::new(AuthConfig {
            jwt_secret: b"0123456789abcdef0123456789abcdef".to_vec(),
            refresh_ttl_days: 200_000_000,
            ..AuthConfig::default()
        });
        let err = authn
            .issue_refresh(AccountId::new(Uuid::new_v4()), Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, AuthnError::TokenLifetime));
    }

    #[test]
    fn token_signed_with_another_secret_is_invalid() {
        let other = Authenticator::new(AuthConfig {
            jwt_secret: b"ffffffffffffffffffffffffffffffff".to_vec(),
            ..AuthConfig::default()
        });
        let issued = other
            .issue_access(AccountId::new(Uuid::new_v4()), &[])
            .unwrap();
        let err = authenticator()
            .authenticate(&Credentials::bearer(issued.token))
            .unwrap_err();
        assert!(matches!(err, AuthnError::InvalidToken));
    }

    #[test]
    fn refresh_and_access_tokens_are_not_interchangeable() {
        let authn = authenticator();
        let account = AccountId::new(Uuid::new_v4());
        let session = Uuid::new_v4();
        let refresh = authn.issue_refresh(account, session).unwrap();
        let access = authn.issue_access(account, &[]).unwrap();

        let err = authn
            .authenticate(&Credentials::bearer(refresh.token.clone()))
            .unwrap_err();
        assert!(matches!(err, AuthnError::WrongTokenKind));
        let err = authn
            .refresh_grant(&Credentials::refresh(access.token))
            .unwrap_err();
        assert!(matches!(err, AuthnError::WrongTokenKind));

        let grant = authn
            .refresh_grant(&Credentials::refresh(refresh.token))
            .unwrap();
        assert_eq!(
            grant,
            RefreshGrant {
                account_id: account,
                session_id: session,
            }
        );
    }
}
