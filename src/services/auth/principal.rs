/*
 * Responsibility
 * - 検証済み claims から作る「認証済み主体」(Principal) の型
 * - middleware が request extensions に 1 つだけ格納し、handler は読むだけ
 */
use std::sync::Arc;

use serde::Serialize;

/// Well-known name of the request slot holding the principal.
///
/// Extensions are keyed by type (`CurrentPrincipal`); this literal is what shows up in logs.
pub const PRINCIPAL_KEY: &str = "identity.currentprincipal";

/// A single (type, value) pair taken from a validated token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// Identity record attached to an admitted request.
///
/// Lives only for the duration of one call; never cached across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    claims: Vec<Claim>,
    authenticated: bool,
}

impl Principal {
    pub fn authenticated(claims: Vec<Claim>) -> Self {
        Self {
            claims,
            authenticated: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    pub fn find_all<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Display name: `name` claim, falling back to `sub`.
    pub fn name(&self) -> Option<&str> {
        self.find_first("name").or_else(|| self.find_first("sub"))
    }
}

/// Request extension slot written by the authentication gate.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Arc<Principal>);
