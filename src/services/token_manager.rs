//! Token pools and token acquisition.
//!
//! [`TokenManager`] is the seam the handlers depend on. [`PoolTokenManager`] is the
//! default implementation: named pools from configuration merged with an optional JSON
//! token file that is reloaded whenever its modification time changes.

use crate::core::config::{TokenConfig, TokenEntry};
use crate::core::error::{AppError, Result};
use crate::core::metrics::get_metrics;
use crate::services::model_service::ModelCatalog;
use anyhow::Context;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::http::StatusCode;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Detail returned when no candidate pool has a usable token.
pub const NO_TOKEN_MESSAGE: &str = "No available tokens. Please try again later.";

/// Source of upstream authentication tokens.
#[async_trait]
pub trait TokenManager: Send + Sync {
    /// Reload the pools if their backing source changed since the last load.
    async fn reload_if_stale(&self) -> Result<()>;

    /// Next usable token from `pool`, if any.
    fn get_token(&self, pool: &str) -> Option<String>;

    /// Report that the upstream rejected `token` with `status`.
    fn record_failure(&self, _token: &str, _status: u16) {}

    /// Number of usable tokens per pool.
    fn pool_sizes(&self) -> BTreeMap<String, usize> {
        BTreeMap::new()
    }
}

/// Search the model's candidate pools in order and return the first token found.
///
/// A failed reload is logged and the previously loaded pools are used.
pub async fn acquire_token(
    token_manager: &dyn TokenManager,
    catalog: &ModelCatalog,
    model_id: &str,
) -> Result<String> {
    if let Err(e) = token_manager.reload_if_stale().await {
        tracing::warn!(error = %e, "Token reload failed, using previously loaded pools");
    }

    let metrics = get_metrics();
    for pool in catalog.pool_candidates_for_model(model_id) {
        if let Some(token) = token_manager.get_token(pool) {
            metrics
                .token_acquisitions
                .with_label_values(&[pool, "hit"])
                .inc();
            tracing::debug!(model = %model_id, pool = %pool, "Token acquired");
            return Ok(token);
        }
        metrics
            .token_acquisitions
            .with_label_values(&[pool, "miss"])
            .inc();
    }

    tracing::warn!(model = %model_id, "No available token in any candidate pool");
    Err(AppError::http(StatusCode::TOO_MANY_REQUESTS, NO_TOKEN_MESSAGE))
}

#[derive(Debug, Default)]
struct PoolSnapshot {
    pools: HashMap<String, Vec<String>>,
    file_modified: Option<SystemTime>,
}

/// Round-robin token pools with cooldown for rejected tokens.
pub struct PoolTokenManager {
    inline: HashMap<String, Vec<String>>,
    file: Option<PathBuf>,
    snapshot: ArcSwap<PoolSnapshot>,
    cursors: DashMap<String, AtomicUsize>,
    cooldowns: DashMap<String, Instant>,
    cooldown: Duration,
    reload_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for PoolTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("PoolTokenManager")
            .field("file", &self.file)
            .field("pool_count", &snapshot.pools.len())
            .field("cooling_down", &self.cooldowns.len())
            .finish()
    }
}

impl PoolTokenManager {
    /// Build a manager from configuration without touching the token file.
    pub fn new(config: &TokenConfig) -> Self {
        let mut inline: HashMap<String, Vec<String>> = HashMap::new();
        for pool in &config.pools {
            merge_entries(inline.entry(pool.name.clone()).or_default(), &pool.tokens);
        }

        Self {
            snapshot: ArcSwap::from_pointee(PoolSnapshot {
                pools: inline.clone(),
                file_modified: None,
            }),
            inline,
            file: config.file.as_ref().map(PathBuf::from),
            cursors: DashMap::new(),
            cooldowns: DashMap::new(),
            cooldown: Duration::from_secs(config.cooldown_secs),
            reload_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Build a manager and perform the initial token file load.
    ///
    /// A missing or unreadable file is logged; the inline pools remain usable.
    pub async fn from_config(config: &TokenConfig) -> Self {
        let manager = Self::new(config);
        if let Err(e) = manager.reload_if_stale().await {
            tracing::warn!(error = %e, "Initial token file load failed");
        }
        let sizes = manager.pool_sizes();
        tracing::info!(pools = ?sizes, "Token pools loaded");
        manager
    }

    fn in_cooldown(&self, token: &str) -> bool {
        let expired = match self.cooldowns.get(token) {
            Some(until) if Instant::now() < *until => return true,
            Some(_) => true,
            None => false,
        };
        if expired {
            self.cooldowns.remove(token);
        }
        false
    }

    async fn load_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat token file: {}", path.display()))?;
        let modified = metadata.modified().ok();

        {
            let current = self.snapshot.load();
            if modified.is_some() && current.file_modified == modified {
                return Ok(());
            }
        }

        let _guard = self.reload_lock.lock().await;
        // Another task may have finished the same reload while we waited
        if modified.is_some() && self.snapshot.load().file_modified == modified {
            return Ok(());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read token file: {}", path.display()))?;
        let from_file: HashMap<String, Vec<TokenEntry>> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse token file: {}", path.display()))?;

        let mut pools = self.inline.clone();
        for (name, entries) in &from_file {
            merge_entries(pools.entry(name.clone()).or_default(), entries);
        }

        tracing::info!(
            path = %path.display(),
            pools = pools.len(),
            "Token file reloaded"
        );
        self.snapshot.store(Arc::new(PoolSnapshot {
            pools,
            file_modified: modified,
        }));
        Ok(())
    }
}

fn merge_entries(target: &mut Vec<String>, entries: &[TokenEntry]) {
    for entry in entries.iter().filter(|e| e.is_enabled()) {
        let token = entry.token().trim().to_string();
        if !target.contains(&token) {
            target.push(token);
        }
    }
}

#[async_trait]
impl TokenManager for PoolTokenManager {
    async fn reload_if_stale(&self) -> Result<()> {
        match &self.file {
            Some(path) => self.load_file(path).await.map_err(AppError::Config),
            None => Ok(()),
        }
    }

    fn get_token(&self, pool: &str) -> Option<String> {
        let snapshot = self.snapshot.load();
        let tokens = snapshot.pools.get(pool)?;
        if tokens.is_empty() {
            return None;
        }

        let start = self
            .cursors
            .entry(pool.to_string())
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Ordering::Relaxed);

        (0..tokens.len())
            .map(|offset| &tokens[(start + offset) % tokens.len()])
            .find(|token| !self.in_cooldown(token))
            .cloned()
    }

    fn record_failure(&self, token: &str, status: u16) {
        if matches!(status, 401 | 403 | 429) {
            let token_prefix: String = token.chars().take(8).collect();
            tracing::warn!(
                token_prefix = %token_prefix,
                status = status,
                cooldown_secs = self.cooldown.as_secs(),
                "Token rejected by upstream, cooling down"
            );
            self.cooldowns
                .insert(token.to_string(), Instant::now() + self.cooldown);
        }
    }

    fn pool_sizes(&self) -> BTreeMap<String, usize> {
        self.snapshot
            .load()
            .pools
            .iter()
            .map(|(name, tokens)| (name.clone(), tokens.len()))
            .collect()
    }
}
