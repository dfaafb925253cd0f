//! Secrets merger.
//!
//! # Contract
//! - The declared document carries placeholders only (e.g. `access_token: "***"`).
//! - The secrets document maps kind -> connector type name -> flat field map:
//!
//!   ```yaml
//!   sources:
//!     GitHub:
//!       access_token: tok-123
//!   destinations:
//!     Postgres:
//!       password: hunter2
//!   ```
//!
//! - [`merge_secrets`] overlays a secret field only when the declared config
//!   already has that key. Unexpected keys are never injected.
//! - No secrets document at all is a warning, not an error.
//! - `Debug` on [`SecretsStore`] redacts every value.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use abt_model::{ConnectorConfig, EntityCollection};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretsStore {
    #[serde(default)]
    pub sources: BTreeMap<String, ConnectorConfig>,
    #[serde(default)]
    pub destinations: BTreeMap<String, ConnectorConfig>,
}

impl SecretsStore {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.destinations.is_empty()
    }
}

impl fmt::Debug for SecretsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Type names and field names only; never values.
        let redact = |m: &BTreeMap<String, ConnectorConfig>| -> BTreeMap<String, Vec<String>> {
            m.iter()
                .map(|(ty, fields)| (ty.clone(), fields.keys().cloned().collect()))
                .collect()
        };
        f.debug_struct("SecretsStore")
            .field("sources", &redact(&self.sources))
            .field("destinations", &redact(&self.destinations))
            .finish()
    }
}

/// Load a secrets document. `Ok(None)` when the file does not exist.
pub fn load_secrets(path: impl AsRef<Path>) -> Result<Option<SecretsStore>> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "secrets file not found; no secrets will be applied");
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read secrets file: {}", path.display()))?;
    load_secrets_from_str(&raw)
        .with_context(|| format!("invalid secrets file: {}", path.display()))
        .map(Some)
}

pub fn load_secrets_from_str(raw: &str) -> Result<SecretsStore> {
    let v: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
    if v.is_null() {
        return Ok(SecretsStore::default());
    }
    // Errors from here can quote a value; keep them generic.
    serde_yaml::from_value(v).map_err(|_| {
        anyhow::anyhow!("secrets document must map sources/destinations -> type name -> fields")
    })
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Counts from one merge pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Entities that had at least one field overlaid.
    pub entities: usize,
    /// Total fields overlaid.
    pub fields: usize,
}

/// Overlay secrets onto declared sources and destinations in place.
///
/// Idempotent: merging the same store twice gives the same configs as once.
pub fn merge_secrets(store: Option<&SecretsStore>, declared: &mut EntityCollection) -> MergeStats {
    let Some(store) = store else {
        warn!("no secrets document; declared configuration is used as-is");
        return MergeStats::default();
    };

    let mut stats = MergeStats::default();

    let mut sources = std::mem::take(&mut declared.sources).into_iter().collect::<Vec<_>>();
    for s in &mut sources {
        if let Some(secret) = store.sources.get(&s.type_name) {
            let n = overlay(&mut s.config, secret);
            stats.record(n);
            debug!(kind = "source", name = %s.name, fields = n, "secrets applied");
        }
    }
    declared.sources = sources.into_iter().collect();

    let mut destinations = std::mem::take(&mut declared.destinations)
        .into_iter()
        .collect::<Vec<_>>();
    for d in &mut destinations {
        if let Some(secret) = store.destinations.get(&d.type_name) {
            let n = overlay(&mut d.config, secret);
            stats.record(n);
            debug!(kind = "destination", name = %d.name, fields = n, "secrets applied");
        }
    }
    declared.destinations = destinations.into_iter().collect();

    stats
}

impl MergeStats {
    fn record(&mut self, fields: usize) {
        if fields > 0 {
            self.entities += 1;
            self.fields += fields;
        }
    }
}

/// Only keys already present in `config` are replaced.
fn overlay(config: &mut ConnectorConfig, secret: &ConnectorConfig) -> usize {
    let mut n = 0;
    for (k, slot) in config.iter_mut() {
        if let Some(v) = secret.get(k) {
            *slot = v.clone();
            n += 1;
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use abt_model::Source;
    use serde_json::json;

    fn cfg(v: serde_json::Value) -> ConnectorConfig {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn overlay_never_injects_new_keys() {
        let mut config = cfg(json!({"access_token": "***", "repository": "a/b"}));
        let secret = cfg(json!({"access_token": "tok", "client_secret": "nope"}));

        assert_eq!(overlay(&mut config, &secret), 1);
        assert_eq!(config["access_token"], json!("tok"));
        assert!(!config.contains_key("client_secret"));
        assert_eq!(config["repository"], json!("a/b"));
    }

    #[test]
    fn debug_redacts_values() {
        let store = load_secrets_from_str("sources:\n  GitHub:\n    access_token: tok-secret-value\n")
            .unwrap();
        let dbg = format!("{store:?}");
        assert!(dbg.contains("GitHub"));
        assert!(dbg.contains("access_token"));
        assert!(!dbg.contains("tok-secret-value"));
    }

    #[test]
    fn absent_store_is_a_noop() {
        let mut declared = EntityCollection::new();
        let mut s = Source::new("repo", "GitHub");
        s.config = cfg(json!({"access_token": "***"}));
        declared.sources.push(s);

        let stats = merge_secrets(None, &mut declared);
        assert_eq!(stats, MergeStats::default());
        assert_eq!(
            declared.sources.find_by_name("repo").unwrap().config["access_token"],
            json!("***")
        );
    }

    #[test]
    fn empty_secrets_document() {
        assert!(load_secrets_from_str("").unwrap().is_empty());
        assert!(load_secrets_from_str("- a\n- b\n").is_err());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yml");
        assert!(load_secrets(&path).unwrap().is_none());
    }
}
