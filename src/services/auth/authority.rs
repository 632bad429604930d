//! Validation authority contract + process-wide lazy holder.
//!
//! The authority is built on first use and then shared read-only by every request.
//! `LazyAuthority` serializes the first build so concurrent first requests never
//! construct or initialize it twice, and keeps a constructed instance around when
//! its initialization fails.
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::services::auth::credential::Credential;
use crate::services::auth::principal::Claim;

/// Why a credential was not accepted.
///
/// Kept for logs only; clients always see the same 401.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("no credential supplied")]
    MissingCredential,
    #[error("credential is malformed")]
    Malformed,
    #[error("credential has expired")]
    Expired,
    #[error("credential is not valid yet")]
    NotYetValid,
    #[error("signature mismatch")]
    InvalidSignature,
    #[error("unknown issuer")]
    UnknownIssuer,
    #[error("audience mismatch")]
    InvalidAudience,
    #[error("authority error: {0}")]
    Internal(String),
}

/// Failure to bring the validation authority up.
#[derive(Debug, Clone, Error)]
pub enum AuthorityInitError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
    #[error("authority unavailable: {0}")]
    Unavailable(String),
}

/// Validates a credential and returns the identity claims it carries.
///
/// `None` is passed through as-is; implementations must reject it.
#[async_trait]
pub trait ValidationAuthority: Send + Sync {
    async fn validate(&self, credential: Option<&Credential>) -> Result<Vec<Claim>, RejectReason>;
}

/// Builds a validation authority in two steps.
///
/// - `construct`: create the instance (cheap, no external resources)
/// - `initialize`: make it ready to validate (key material, metadata, ...)
///
/// `initialize` may fail and be called again on the same instance.
#[async_trait]
pub trait AuthorityLoader: Send + Sync + 'static {
    type Authority: ValidationAuthority + 'static;

    async fn construct(&self) -> Result<Self::Authority, AuthorityInitError>;

    async fn initialize(&self, authority: &mut Self::Authority) -> Result<(), AuthorityInitError>;
}

#[async_trait]
impl<L: AuthorityLoader> AuthorityLoader for Arc<L> {
    type Authority = L::Authority;

    async fn construct(&self) -> Result<Self::Authority, AuthorityInitError> {
        (**self).construct().await
    }

    async fn initialize(&self, authority: &mut Self::Authority) -> Result<(), AuthorityInitError> {
        (**self).initialize(authority).await
    }
}

// Loader with its concrete authority type erased.
#[async_trait]
trait Bootstrap: Send + Sync {
    async fn bootstrap(&self) -> Result<Arc<dyn ValidationAuthority>, AuthorityInitError>;
}

struct Bootstrapper<L: AuthorityLoader> {
    loader: L,
    // Constructed but not yet initialized; kept across failed attempts.
    pending: Mutex<Option<L::Authority>>,
}

impl<L: AuthorityLoader> Bootstrapper<L> {
    fn take_pending(&self) -> Option<L::Authority> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn keep_pending(&self, authority: L::Authority) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(authority);
    }
}

#[async_trait]
impl<L: AuthorityLoader> Bootstrap for Bootstrapper<L> {
    async fn bootstrap(&self) -> Result<Arc<dyn ValidationAuthority>, AuthorityInitError> {
        let mut authority = match self.take_pending() {
            Some(authority) => authority,
            None => {
                tracing::debug!("constructing validation authority");
                self.loader.construct().await?
            }
        };

        if let Err(err) = self.loader.initialize(&mut authority).await {
            self.keep_pending(authority);
            return Err(err);
        }

        Ok(Arc::new(authority))
    }
}

/// Lazily loaded, process-wide validation authority.
///
/// - First caller constructs and initializes; concurrent callers wait for that same attempt.
/// - A failed initialize leaves the slot empty. The next call re-runs only `initialize`
///   on the instance that was already constructed.
/// - Once initialized, reads take no lock.
pub struct LazyAuthority {
    bootstrap: Box<dyn Bootstrap>,
    cell: OnceCell<Arc<dyn ValidationAuthority>>,
}

impl fmt::Debug for LazyAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyAuthority")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl LazyAuthority {
    pub fn new<L: AuthorityLoader>(loader: L) -> Self {
        Self {
            bootstrap: Box::new(Bootstrapper {
                loader,
                pending: Mutex::new(None),
            }),
            cell: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> Result<&Arc<dyn ValidationAuthority>, AuthorityInitError> {
        self.cell
            .get_or_try_init(|| async {
                tracing::info!("initializing validation authority");
                self.bootstrap.bootstrap().await.inspect_err(|err| {
                    tracing::error!(error = %err, "validation authority initialization failed");
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct AcceptAll {
        ready: bool,
    }

    #[async_trait]
    impl ValidationAuthority for AcceptAll {
        async fn validate(&self, _: Option<&Credential>) -> Result<Vec<Claim>, RejectReason> {
            if !self.ready {
                return Err(RejectReason::Internal("not initialized".into()));
            }
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        constructs: AtomicUsize,
        initializes: AtomicUsize,
        failures_left: AtomicUsize,
    }

    #[async_trait]
    impl AuthorityLoader for CountingLoader {
        type Authority = AcceptAll;

        async fn construct(&self) -> Result<AcceptAll, AuthorityInitError> {
            self.constructs.fetch_add(1, Ordering::SeqCst);
            Ok(AcceptAll { ready: false })
        }

        async fn initialize(&self, authority: &mut AcceptAll) -> Result<(), AuthorityInitError> {
            self.initializes.fetch_add(1, Ordering::SeqCst);
            // Widen the race window for concurrent first use.
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AuthorityInitError::Unavailable("boom".into()));
            }
            authority.ready = true;
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_use_loads_once() {
        let loader = Arc::new(CountingLoader::default());
        let lazy = Arc::new(LazyAuthority::new(loader.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let lazy = lazy.clone();
            tasks.spawn(async move {
                let ptr = lazy
                    .get()
                    .await
                    .map(|a| Arc::as_ptr(a) as *const () as usize);
                ptr
            });
        }

        let mut ptrs = Vec::new();
        while let Some(res) = tasks.join_next().await {
            ptrs.push(res.unwrap().unwrap());
        }

        assert_eq!(loader.constructs.load(Ordering::SeqCst), 1);
        assert_eq!(loader.initializes.load(Ordering::SeqCst), 1);
        assert!(ptrs.windows(2).all(|w| w[0] == w[1]));
        assert!(lazy.is_initialized());
    }

    #[tokio::test]
    async fn repeated_get_after_init_is_a_no_op() {
        let loader = Arc::new(CountingLoader::default());
        let lazy = LazyAuthority::new(loader.clone());

        lazy.get().await.unwrap();
        lazy.get().await.unwrap();
        lazy.get().await.unwrap();

        assert_eq!(loader.constructs.load(Ordering::SeqCst), 1);
        assert_eq!(loader.initializes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_init_is_retried_on_next_call() {
        let loader = Arc::new(CountingLoader {
            failures_left: AtomicUsize::new(1),
            ..Default::default()
        });
        let lazy = LazyAuthority::new(loader.clone());

        assert!(lazy.get().await.is_err());
        assert!(!lazy.is_initialized());

        let authority = lazy.get().await.unwrap();
        assert_eq!(authority.validate(None).await, Ok(Vec::new()));

        // The instance built by the first attempt is reused; only initialize runs again.
        assert_eq!(loader.constructs.load(Ordering::SeqCst), 1);
        assert_eq!(loader.initializes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_construct_is_retried_from_scratch() {
        struct FlakyConstruct {
            constructs: AtomicUsize,
        }

        #[async_trait]
        impl AuthorityLoader for FlakyConstruct {
            type Authority = AcceptAll;

            async fn construct(&self) -> Result<AcceptAll, AuthorityInitError> {
                if self.constructs.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(AuthorityInitError::Unavailable("not yet".into()));
                }
                Ok(AcceptAll { ready: false })
            }

            async fn initialize(&self, authority: &mut AcceptAll) -> Result<(), AuthorityInitError> {
                authority.ready = true;
                Ok(())
            }
        }

        let loader = Arc::new(FlakyConstruct {
            constructs: AtomicUsize::new(0),
        });
        let lazy = LazyAuthority::new(loader.clone());

        assert!(lazy.get().await.is_err());
        assert!(lazy.get().await.is_ok());
        assert_eq!(loader.constructs.load(Ordering::SeqCst), 2);
    }
}
