//! Acting-user identity
//!
//! Resolution is an external concern; [`CachedIdentityResolver`] keeps
//! repeated bulk operations by the same user from re-resolving the token.

use crate::config::EngineConfig;
use crate::error::IdentityError;
use async_trait::async_trait;
use ecm_model::{AuthToken, UserProfile};
use moka::future::Cache;
use std::sync::Arc;

/// Token to user profile resolution
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the user behind `auth`
    async fn resolve(&self, auth: &AuthToken) -> Result<UserProfile, IdentityError>;
}

/// Caching decorator over any resolver
#[derive(Clone)]
pub struct CachedIdentityResolver {
    inner: Arc<dyn IdentityResolver>,
    cache: Cache<AuthToken, UserProfile>,
}

impl std::fmt::Debug for CachedIdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedIdentityResolver")
            .field("entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl CachedIdentityResolver {
    /// Wrap `inner` with capacity and TTL from `config`
    #[must_use]
    pub fn new(inner: Arc<dyn IdentityResolver>, config: &EngineConfig) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(config.identity_cache_capacity)
                .time_to_live(config.identity_cache_ttl())
                .build(),
        }
    }

    /// Drop every cached profile
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl IdentityResolver for CachedIdentityResolver {
    async fn resolve(&self, auth: &AuthToken) -> Result<UserProfile, IdentityError> {
        if let Some(profile) = self.cache.get(auth).await {
            return Ok(profile);
        }
        // Failures are not cached
        let profile = self.inner.resolve(auth).await?;
        self.cache.insert(auth.clone(), profile.clone()).await;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityResolver for CountingResolver {
        async fn resolve(&self, auth: &AuthToken) -> Result<UserProfile, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if auth.expose() == "bad" {
                return Err(IdentityError::InvalidToken);
            }
            Ok(UserProfile::new("u1", "clerk@example.com"))
        }
    }

    #[tokio::test]
    async fn resolves_once_per_token() {
        let inner = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedIdentityResolver::new(inner.clone(), &EngineConfig::default());
        let token = AuthToken::new("good");

        let first = cached.resolve(&token).await.unwrap();
        let second = cached.resolve(&token).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let inner = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedIdentityResolver::new(inner.clone(), &EngineConfig::default());
        let token = AuthToken::new("bad");

        assert_eq!(cached.resolve(&token).await, Err(IdentityError::InvalidToken));
        assert_eq!(cached.resolve(&token).await, Err(IdentityError::InvalidToken));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
