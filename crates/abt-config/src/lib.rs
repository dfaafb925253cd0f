//! abt-config
//!
//! Everything that turns operator-authored files into declared entities:
//! - layered YAML loading + canonical hashing ([`load_layered_yaml`])
//! - field-presence validation ([`validate_document`])
//! - the declared-config builder ([`DeclaredConfigBuilder`])
//! - the secrets merger ([`merge_secrets`])
//! - dumping a snapshot back into document shape ([`dump_yaml`])

mod builder;
mod document;
mod dump;
mod secrets;
mod validate;

pub use builder::{DeclaredConfigBuilder, TypeCatalog};
pub use document::{ConnectionEntry, DeclaredDocument, LinkGroupRecord};
pub use dump::{dump_yaml, write_yaml};
pub use secrets::{load_secrets, load_secrets_from_str, merge_secrets, MergeStats, SecretsStore};
pub use validate::{validate_document, ValidationIssue, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Well-known credential prefixes. A declared document must carry
/// placeholders only; real values come from the secrets document.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // Stripe / OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "github_pat_",
    "glpat-", // GitLab PAT
    "xoxb-",  // Slack bot token
    "xoxp-",  // Slack user token
];

/// Top-level keys whose lists are concatenated (not replaced) across layers.
const ENTITY_LIST_KEYS: &[&str] = &["sources", "destinations", "connections"];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view of the merged document.
    pub fn document(&self) -> Result<DeclaredDocument> {
        serde_json::from_value(self.config_json.clone()).context("invalid declarative document")
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML documents in order.
///
/// - `sources` / `destinations` / `connections` lists are concatenated, so
///   entities can be split across files.
/// - Every other key is deep-merged: later documents override earlier ones.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        let v_json = match v_json {
            // An empty file parses as null.
            Value::Null => serde_json::json!({}),
            Value::Object(map) => Value::Object(map),
            _ => bail!("declarative document must be a mapping at the top level"),
        };
        merged = layer(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn layer(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (k, o_val) in overlay_map {
                let b_val = base_map.remove(&k).unwrap_or(Value::Null);
                let merged = match (ENTITY_LIST_KEYS.contains(&k.as_str()), b_val, o_val) {
                    (true, Value::Array(mut items), Value::Array(more)) => {
                        items.extend(more);
                        Value::Array(items)
                    }
                    (_, b, o) => deep_merge(b, o),
                };
                base_map.insert(k, merged);
            }
            Value::Object(base_map)
        }
        (_, o) => o,
    }
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut hits = Vec::new();
    collect_secret_pointers(v, "", &mut hits);
    if let Some(ptr) = hits.first() {
        bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
    }
    Ok(())
}

fn collect_secret_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map {
                let next = format!("{}/{}", prefix, k.replace('~', "~0").replace('/', "~1"));
                collect_secret_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                collect_secret_pointers(vv, &format!("{prefix}/{i}"), out);
            }
        }
        Value::String(s) if looks_like_secret(s) => out.push(prefix.to_string()),
        _ => {}
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
