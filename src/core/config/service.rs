//! YAML configuration with a secrets overlay.
//!
//! Public settings live in `config.yml`; anything with a sensitive key name
//! (api keys, tokens, credentials) is kept in a separate secrets file and
//! merged in at load time. Reads served to clients are redacted; writes that
//! carry the redaction placeholder restore the stored value.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "access_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 4] = ["max_tokens", "total_tokens", "token_count", "tokens"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("DOCBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn config_write_path(&self) -> PathBuf {
        if let Ok(path) = env::var("DOCBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        self.paths.user_data_dir.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config merged with the secrets overlay.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        Ok(deep_merge(&public_config, &secrets_config))
    }

    /// Replace (`merge == false`) or deep-merge (`merge == true`) the stored
    /// configuration. Placeholder values coming back from a redacted read are
    /// restored from the current config before saving.
    pub fn update_config(&self, config_data: Value, merge: bool) -> Result<(), ApiError> {
        let current = self.load_config()?;
        let restored = restore_redacted_values(&config_data, &current);
        let to_save = if merge {
            deep_merge(&current, &restored)
        } else {
            restored
        };

        validate_config(&to_save)?;
        self.save_config_files(&to_save)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }

    fn save_config_files(&self, config: &Value) -> Result<(), ApiError> {
        let (public_config, secrets_config) = split_config(config);

        write_yaml_file(&self.config_write_path(), &public_config)?;
        write_yaml_file(&self.secrets_path(), &secrets_config)?;
        Ok(())
    }
}

fn load_yaml_file(path: &Path) -> Value {
    let Ok(contents) = fs::read_to_string(path) else {
        return Value::Object(Map::new());
    };

    match serde_yaml::from_str::<Value>(&contents) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::Object(Map::new()),
    }
}

fn write_yaml_file(path: &Path, value: &Value) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let yaml = serde_yaml::to_string(value).map_err(ApiError::internal)?;
    fs::write(path, yaml).map_err(ApiError::internal)
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

/// Split a config tree into (public, secret) halves by key name.
fn split_config(config: &Value) -> (Value, Value) {
    let Value::Object(map) = config else {
        return (config.clone(), Value::Object(Map::new()));
    };

    let mut public_map = Map::new();
    let mut secret_map = Map::new();

    for (key, value) in map {
        match value {
            Value::Object(_) => {
                let (public_sub, secret_sub) = split_config(value);
                if !is_empty_object(&public_sub) {
                    public_map.insert(key.clone(), public_sub);
                }
                if !is_empty_object(&secret_sub) {
                    secret_map.insert(key.clone(), secret_sub);
                }
            }
            _ => {
                if is_sensitive_key(key) && !value.is_null() {
                    secret_map.insert(key.clone(), value.clone());
                } else {
                    public_map.insert(key.clone(), value.clone());
                }
            }
        }
    }

    (Value::Object(public_map), Value::Object(secret_map))
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn restore_redacted_values(new_value: &Value, original: &Value) -> Value {
    match new_value {
        Value::Object(map) => {
            let original_map = original.as_object();
            let mut restored = Map::new();

            for (key, value) in map {
                let orig_val = original_map.and_then(|m| m.get(key));
                if value.as_str() == Some(REDACT_PLACEHOLDER) {
                    if let Some(orig) = orig_val {
                        restored.insert(key.clone(), orig.clone());
                    }
                    continue;
                }

                if value.is_object() || value.is_array() {
                    let merged = restore_redacted_values(value, orig_val.unwrap_or(&Value::Null));
                    restored.insert(key.clone(), merged);
                } else {
                    restored.insert(key.clone(), value.clone());
                }
            }

            Value::Object(restored)
        }
        Value::Array(items) => {
            let original_items = original.as_array();
            let restored_items = items
                .iter()
                .enumerate()
                .filter_map(|(idx, item)| {
                    let orig = original_items.and_then(|list| list.get(idx));
                    if item.as_str() == Some(REDACT_PLACEHOLDER) {
                        return orig.cloned();
                    }
                    Some(restore_redacted_values(item, orig.unwrap_or(&Value::Null)))
                })
                .collect();
            Value::Array(restored_items)
        }
        _ => new_value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "base_url": "https://api.openai.com", "chat_model": "gpt-4o-mini" },
            "rag": { "top_k": 4 }
        });
        let override_value = json!({
            "llm": { "chat_model": "gpt-4o" },
            "google_drive": { "folder_id": "root" }
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "llm": { "base_url": "https://api.openai.com", "chat_model": "gpt-4o" },
                "rag": { "top_k": 4 },
                "google_drive": { "folder_id": "root" }
            })
        );
    }

    #[test]
    fn split_config_separates_sensitive_values() {
        let input = json!({
            "llm": {
                "api_key": "sk-secret",
                "max_tokens": 512
            },
            "google_drive": {
                "access_token": "ya29.token",
                "folder_id": "abc"
            }
        });

        let (public_config, secret_config) = split_config(&input);

        assert_eq!(
            public_config,
            json!({
                "llm": { "max_tokens": 512 },
                "google_drive": { "folder_id": "abc" }
            })
        );
        assert_eq!(
            secret_config,
            json!({
                "llm": { "api_key": "sk-secret" },
                "google_drive": { "access_token": "ya29.token" }
            })
        );
    }

    #[test]
    fn redact_then_restore_round_trips_secrets() {
        let stored = json!({
            "llm": { "api_key": "sk-secret", "chat_model": "gpt-4o-mini" }
        });

        let redacted = redact_sensitive_values(&stored);
        assert_eq!(
            redacted,
            json!({ "llm": { "api_key": "****", "chat_model": "gpt-4o-mini" } })
        );

        // A client edits the model but sends the placeholder back untouched.
        let submitted = json!({
            "llm": { "api_key": "****", "chat_model": "gpt-4o" }
        });
        let restored = restore_redacted_values(&submitted, &stored);
        assert_eq!(
            restored,
            json!({ "llm": { "api_key": "sk-secret", "chat_model": "gpt-4o" } })
        );
    }
}
