//! Authorization header → Credential
//!
//! - `Authorization: OAuth <token>` の形だけを認識する（scheme は大文字小文字を区別する）
//! - ヘッダ無し / 別 scheme / 壊れたヘッダは「credential 無し」として扱う（エラーではない）
//! - 内部的には理由を区別して保持し、ログ相関に使う

use axum::http::{HeaderMap, header};

/// The only scheme token this gate recognizes. Compared byte-for-byte.
pub const OAUTH_SCHEME: &str = "OAuth";

/// Opaque token string taken from the `Authorization` header.
///
/// The gate assumes nothing about its structure; only the validation authority
/// knows how to read it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// `None` for an empty token; a credential always carries something.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        (!raw.is_empty()).then_some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print token material
        f.debug_struct("Credential")
            .field("len", &self.0.len())
            .finish()
    }
}

/// Result of reading the `Authorization` header.
///
/// Every variant except `Present` collapses to "no credential" for the gate, but
/// the distinction is kept so rejections can be logged with a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOutcome {
    Missing,
    Malformed,
    UnsupportedScheme,
    Present(Credential),
}

impl CredentialOutcome {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = headers.get_all(header::AUTHORIZATION).iter();

        let Some(value) = values.next() else {
            return Self::Missing;
        };

        // More than one Authorization header is ambiguous.
        if values.next().is_some() {
            return Self::Malformed;
        }

        let Ok(raw) = value.to_str() else {
            return Self::Malformed;
        };

        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Malformed;
        }

        let (scheme, parameter) = match raw.split_once(char::is_whitespace) {
            Some((scheme, parameter)) => (scheme, parameter.trim()),
            None => (raw, ""),
        };

        if scheme != OAUTH_SCHEME {
            return Self::UnsupportedScheme;
        }

        if parameter.is_empty() {
            return Self::Malformed;
        }

        Self::Present(Credential(parameter.to_owned()))
    }

    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Self::Present(credential) => Some(credential),
            _ => None,
        }
    }

    pub fn into_credential(self) -> Option<Credential> {
        match self {
            Self::Present(credential) => Some(credential),
            _ => None,
        }
    }

    // Short label used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Malformed => "malformed",
            Self::UnsupportedScheme => "unsupported_scheme",
            Self::Present(_) => "present",
        }
    }
}

/// Pull an `OAuth` credential out of the request headers.
///
/// Returns `None` when there is no usable credential. That is a routing signal,
/// not an error: the validation gateway turns it into a rejection.
pub fn extract_credential(headers: &HeaderMap) -> Option<Credential> {
    CredentialOutcome::from_headers(headers).into_credential()
}
