//! Login state: the realm an operator works on and the token sent to the
//! Astarte APIs. Token claims are only read to decide which parts of the
//! dashboard to show, authorization is enforced by the APIs themselves.

use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("realm must not be empty")]
    EmptyRealm,

    #[error("token is not a JWT")]
    MalformedToken,

    #[error("token claims could not be decoded: {0}")]
    InvalidClaims(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiService {
    RealmManagement,
    AppEngine,
    Pairing,
    Channels,
    Flow,
}

/// The Astarte claims of a token. Each one lists the request patterns
/// allowed on an API, an absent claim means no access at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub a_rma: Option<Vec<String>>,
    #[serde(default)]
    pub a_aea: Option<Vec<String>>,
    #[serde(default)]
    pub a_pa: Option<Vec<String>>,
    #[serde(default)]
    pub a_ch: Option<Vec<String>>,
    #[serde(default)]
    pub a_f: Option<Vec<String>>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn decode(token: &str) -> Result<Self, SessionError> {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SessionError::MalformedToken);
        };

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .or_else(|_| URL_SAFE.decode(payload))
            .map_err(|err| SessionError::InvalidClaims(err.to_string()))?;

        serde_json::from_slice(&payload).map_err(|err| SessionError::InvalidClaims(err.to_string()))
    }

    pub fn grants(&self, service: ApiService) -> Option<&[String]> {
        let claim = match service {
            ApiService::RealmManagement => &self.a_rma,
            ApiService::AppEngine => &self.a_aea,
            ApiService::Pairing => &self.a_pa,
            ApiService::Channels => &self.a_ch,
            ApiService::Flow => &self.a_f,
        };
        claim.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    realm: String,
    token: String,
    claims: TokenClaims,
}

impl Session {
    pub fn new(realm: &str, token: &str) -> Result<Self, SessionError> {
        let realm = realm.trim();
        if realm.is_empty() {
            return Err(SessionError::EmptyRealm);
        }

        let token = token.trim();
        let claims = TokenClaims::decode(token)?;

        Ok(Self {
            realm: realm.to_string(),
            token: token.to_string(),
            claims,
        })
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    pub fn can_access(&self, service: ApiService) -> bool {
        self.claims
            .grants(service)
            .is_some_and(|grants| !grants.is_empty())
    }

    /// Tokens without an `exp` claim never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.claims
            .exp
            .is_some_and(|exp| exp <= now.timestamp())
    }
}
