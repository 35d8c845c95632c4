//! Secret alias resolution
//!
//! Step execution descriptors never carry literal URLs or credentials;
//! they carry **aliases**. At execution time an alias is resolved per
//! tenant against a pluggable key-value secret provider, trying
//! tenant-scoped then global-scoped backing keys. Resolved values are
//! cached per `(tenant, alias)` for the process lifetime; the cache is
//! clearable for tests and inspectable without ever exposing values.

use flowcert_types::TenantId;
use std::collections::HashMap;
use std::sync::RwLock;

/// A secret alias could not be resolved for a tenant. Fatal for the
/// activity invocation that needed it; the owning workflow transitions
/// to failed or escalates rather than crashing the worker.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret alias '{alias}' not found for tenant '{tenant_id}'")]
    AliasNotFound { alias: String, tenant_id: String },
}

pub type SecretResult<T> = Result<T, SecretError>;

// ── Provider seam ────────────────────────────────────────────────────

/// Keyed lookup against a backing secret store. The environment
/// provider is the reference implementation; a real secret-manager
/// backend plugs in here.
pub trait SecretProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads secrets from process environment variables.
#[derive(Debug, Default)]
pub struct EnvSecretProvider;

impl SecretProvider for EnvSecretProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

/// Fixed in-memory provider for deterministic tests.
#[derive(Debug, Default)]
pub struct MapSecretProvider {
    entries: HashMap<String, String>,
}

impl MapSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }
}

impl SecretProvider for MapSecretProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

// ── Key derivation ───────────────────────────────────────────────────

/// Uppercase and replace every non-alphanumeric character with `_`,
/// yielding an env-style key segment.
pub fn sanitize_key_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Backing keys for a `(tenant, alias)` pair, in precedence order:
/// tenant-scoped before global, `FC_SECRET` namespace before the bare
/// `SECRET` fallback. The first populated key wins.
pub fn candidate_keys(tenant_id: &TenantId, alias: &str) -> [String; 4] {
    let tenant = sanitize_key_segment(tenant_id.as_str());
    let alias = sanitize_key_segment(alias);
    [
        format!("FC_SECRET_{tenant}__{alias}"),
        format!("FC_SECRET__{alias}"),
        format!("SECRET_{tenant}__{alias}"),
        format!("SECRET__{alias}"),
    ]
}

// ── Secret store ─────────────────────────────────────────────────────

/// Entry metadata exposed by [`SecretStore::snapshot`]. Carries the
/// cache key and the value length, never the value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedSecretInfo {
    pub tenant_id: String,
    pub alias: String,
    pub value_len: usize,
}

/// Resolves secret aliases through a provider, caching results for the
/// process lifetime. Construct once per process and inject wherever
/// needed. Writes are idempotent upserts of the same key, so concurrent
/// readers are safe.
pub struct SecretStore {
    provider: Box<dyn SecretProvider>,
    cache: RwLock<HashMap<(String, String), String>>,
}

impl SecretStore {
    pub fn new(provider: impl SecretProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve an alias for a tenant, caching the result.
    pub fn resolve(&self, tenant_id: &TenantId, alias: &str) -> SecretResult<String> {
        let cache_key = (tenant_id.to_string(), alias.to_string());

        if let Ok(cache) = self.cache.read() {
            if let Some(value) = cache.get(&cache_key) {
                return Ok(value.clone());
            }
        }

        for key in candidate_keys(tenant_id, alias) {
            if let Some(value) = self.provider.get(&key) {
                tracing::debug!(tenant = %tenant_id, alias, backing_key = %key, "secret alias resolved");
                if let Ok(mut cache) = self.cache.write() {
                    cache.insert(cache_key, value.clone());
                }
                return Ok(value);
            }
        }

        Err(SecretError::AliasNotFound {
            alias: alias.to_string(),
            tenant_id: tenant_id.to_string(),
        })
    }

    /// Drop every cached entry. Intended for tests and credential
    /// rotation drills.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
        tracing::debug!("secret cache cleared");
    }

    /// Redacted view of the cache for debugging: keys and value
    /// lengths only.
    pub fn snapshot(&self) -> Vec<CachedSecretInfo> {
        let Ok(cache) = self.cache.read() else {
            return Vec::new();
        };
        let mut entries: Vec<CachedSecretInfo> = cache
            .iter()
            .map(|((tenant_id, alias), value)| CachedSecretInfo {
                tenant_id: tenant_id.clone(),
                alias: alias.clone(),
                value_len: value.len(),
            })
            .collect();
        entries.sort_by(|a, b| (&a.tenant_id, &a.alias).cmp(&(&b.tenant_id, &b.alias)));
        entries
    }

    /// Number of cached entries.
    pub fn cached_count(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("cached", &self.cached_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("acme-gmbh")
    }

    #[test]
    fn test_sanitize_key_segment() {
        assert_eq!(sanitize_key_segment("acme-gmbh"), "ACME_GMBH");
        assert_eq!(sanitize_key_segment("notary.endpoint"), "NOTARY_ENDPOINT");
        assert_eq!(sanitize_key_segment("plain42"), "PLAIN42");
    }

    #[test]
    fn test_candidate_key_precedence() {
        let keys = candidate_keys(&tenant(), "notary-token");
        assert_eq!(
            keys,
            [
                "FC_SECRET_ACME_GMBH__NOTARY_TOKEN",
                "FC_SECRET__NOTARY_TOKEN",
                "SECRET_ACME_GMBH__NOTARY_TOKEN",
                "SECRET__NOTARY_TOKEN",
            ]
        );
    }

    #[test]
    fn test_tenant_scoped_wins_over_global() {
        let store = SecretStore::new(
            MapSecretProvider::new()
                .with_secret("FC_SECRET_ACME_GMBH__API", "tenant-value")
                .with_secret("FC_SECRET__API", "global-value"),
        );
        assert_eq!(store.resolve(&tenant(), "api").unwrap(), "tenant-value");
    }

    #[test]
    fn test_global_fallback_resolves_for_any_tenant() {
        let store =
            SecretStore::new(MapSecretProvider::new().with_secret("FC_SECRET__API", "global"));
        assert_eq!(store.resolve(&tenant(), "api").unwrap(), "global");
        assert_eq!(
            store.resolve(&TenantId::new("other"), "api").unwrap(),
            "global"
        );
    }

    #[test]
    fn test_bare_secret_namespace_fallback() {
        let store =
            SecretStore::new(MapSecretProvider::new().with_secret("SECRET__LEGACY", "old"));
        assert_eq!(store.resolve(&tenant(), "legacy").unwrap(), "old");
    }

    #[test]
    fn test_missing_alias_fails_with_names() {
        let store = SecretStore::new(MapSecretProvider::new());
        let err = store.resolve(&tenant(), "nope").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nope"));
        assert!(msg.contains("acme-gmbh"));
    }

    #[test]
    fn test_cache_and_clear() {
        let store =
            SecretStore::new(MapSecretProvider::new().with_secret("FC_SECRET__API", "v1"));
        assert_eq!(store.cached_count(), 0);
        store.resolve(&tenant(), "api").unwrap();
        assert_eq!(store.cached_count(), 1);

        // Cached value survives repeated resolution.
        store.resolve(&tenant(), "api").unwrap();
        assert_eq!(store.cached_count(), 1);

        store.clear();
        assert_eq!(store.cached_count(), 0);
    }

    #[test]
    fn test_snapshot_redacts_values() {
        let store = SecretStore::new(
            MapSecretProvider::new().with_secret("FC_SECRET__API", "super-secret"),
        );
        store.resolve(&tenant(), "api").unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].alias, "api");
        assert_eq!(snapshot[0].value_len, "super-secret".len());
        let debug = format!("{snapshot:?}");
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_env_provider_ignores_empty_values() {
        // An empty env var is treated as unset so the next candidate
        // key gets a chance.
        std::env::set_var("FC_SECRET__FLOWCERT_EMPTY_TEST", "");
        assert_eq!(EnvSecretProvider.get("FC_SECRET__FLOWCERT_EMPTY_TEST"), None);
        std::env::remove_var("FC_SECRET__FLOWCERT_EMPTY_TEST");
    }
}
