use async_trait::async_trait;
use base64::Engine as _;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde_json::{Map, Value};

use crate::services::auth::authority::{
    AuthorityInitError, AuthorityLoader, RejectReason, ValidationAuthority,
};
use crate::services::auth::credential::Credential;
use crate::services::auth::principal::Claim;

/// Settings for the signed-token authority.
///
/// `signing_key` is the base64 text from config; it is decoded when the
/// authority is initialized, not when config is read.
#[derive(Clone)]
pub struct AuthorityConfig {
    pub issuer: String,
    pub audience: String,
    pub leeway_seconds: u64,
    pub signing_key: String,
}

impl std::fmt::Debug for AuthorityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("AuthorityConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl From<jsonwebtoken::errors::Error> for RejectReason {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::InvalidIssuer => Self::UnknownIssuer,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::InvalidToken
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Self::Malformed,
            _ => Self::Internal(e.to_string()),
        }
    }
}

/// HMAC-SHA256 signed token verifier.
///
/// - Built with validation rules only; the key is installed by `install_key`.
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct JwtAuthority {
    decoding_key: Option<DecodingKey>,
    validation: Validation,
}

impl std::fmt::Debug for JwtAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthority")
            .field("validation", &self.validation)
            .field("key_loaded", &self.decoding_key.is_some())
            .finish()
    }
}

impl JwtAuthority {
    pub fn new(config: &AuthorityConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.leeway = config.leeway_seconds;
        validation.validate_nbf = true;

        Self {
            decoding_key: None,
            validation,
        }
    }

    /// Decode the base64 shared secret and make the authority usable.
    pub fn install_key(&mut self, signing_key: &str) -> Result<(), AuthorityInitError> {
        let secret = base64::engine::general_purpose::STANDARD
            .decode(signing_key.trim())
            .map_err(|e| AuthorityInitError::InvalidKey(e.to_string()))?;

        if secret.is_empty() {
            return Err(AuthorityInitError::InvalidKey("empty key".into()));
        }

        self.decoding_key = Some(DecodingKey::from_secret(&secret));
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.decoding_key.is_some()
    }

    // Verify and decode a token into its raw claim object.
    pub fn verify(&self, token: &str) -> Result<Map<String, Value>, RejectReason> {
        let key = self
            .decoding_key
            .as_ref()
            .ok_or_else(|| RejectReason::Internal("signing key not loaded".into()))?;

        let data = jsonwebtoken::decode::<Map<String, Value>>(token, key, &self.validation)?;

        Ok(data.claims)
    }
}

#[async_trait]
impl ValidationAuthority for JwtAuthority {
    async fn validate(&self, credential: Option<&Credential>) -> Result<Vec<Claim>, RejectReason> {
        let credential = credential.ok_or(RejectReason::MissingCredential)?;
        let claims = self.verify(credential.as_str())?;
        Ok(claims_from_map(claims))
    }
}

/// Flatten a claim object into (type, value) pairs.
///
/// - strings are kept as-is
/// - arrays produce one pair per element
/// - `null` is dropped
/// - anything else is rendered as JSON text
fn claims_from_map(map: Map<String, Value>) -> Vec<Claim> {
    let mut claims = Vec::with_capacity(map.len());

    for (claim_type, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(v) = claim_value(item) {
                        claims.push(Claim::new(claim_type.clone(), v));
                    }
                }
            }
            other => {
                if let Some(v) = claim_value(other) {
                    claims.push(Claim::new(claim_type, v));
                }
            }
        }
    }

    claims
}

fn claim_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Loader that builds a `JwtAuthority` from config on first use.
///
/// construct = validation rules, initialize = signing key decode.
#[derive(Debug, Clone)]
pub struct JwtAuthorityLoader {
    config: AuthorityConfig,
}

impl JwtAuthorityLoader {
    pub fn new(config: AuthorityConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AuthorityLoader for JwtAuthorityLoader {
    type Authority = JwtAuthority;

    async fn construct(&self) -> Result<JwtAuthority, AuthorityInitError> {
        Ok(JwtAuthority::new(&self.config))
    }

    async fn initialize(&self, authority: &mut JwtAuthority) -> Result<(), AuthorityInitError> {
        authority.install_key(&self.config.signing_key)?;

        tracing::info!(
            issuer = %self.config.issuer,
            audience = %self.config.audience,
            "jwt validation authority ready"
        );

        Ok(())
    }
}
