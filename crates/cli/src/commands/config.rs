use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use stockroom_core::config::{AppConfig, ConfigOverrides};
use toml::Value as TomlValue;

use crate::commands::CommandResult;

/// Effective settings with the layer each value came from
/// (precedence: cli > env > file > default).
pub fn run(
    config: &AppConfig,
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> CommandResult {
    let config_file_path = detect_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = Sources { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let mut entries = Map::new();
    entries.insert(
        "storage.data_dir".to_string(),
        entry(
            &config.storage.data_dir.display().to_string(),
            sources.of(
                "storage.data_dir",
                &["STOCKROOM_STORAGE_DATA_DIR"],
                overrides.data_dir.is_some().then_some("cli (--data-dir)"),
            ),
        ),
    );
    entries.insert(
        "storage.products_file".to_string(),
        entry(
            &config.storage.products_file,
            sources.of(
                "storage.products_file",
                &["STOCKROOM_STORAGE_PRODUCTS_FILE"],
                overrides.products_file.is_some().then_some("override"),
            ),
        ),
    );
    entries.insert(
        "storage.products_path".to_string(),
        entry(&config.products_path().display().to_string(), "derived".to_string()),
    );
    entries.insert(
        "logging.level".to_string(),
        entry(
            &config.logging.level,
            sources.of(
                "logging.level",
                &["STOCKROOM_LOGGING_LEVEL", "STOCKROOM_LOG_LEVEL"],
                overrides.log_level.is_some().then_some("override"),
            ),
        ),
    );
    entries.insert(
        "logging.format".to_string(),
        entry(
            config.logging.format.as_str(),
            sources.of(
                "logging.format",
                &["STOCKROOM_LOGGING_FORMAT", "STOCKROOM_LOG_FORMAT"],
                overrides.log_format.is_some().then_some("override"),
            ),
        ),
    );

    CommandResult::success(
        "config",
        "effective config (source precedence: cli > env > file > default)",
        Some(Value::Object(entries)),
    )
}

struct Sources<'a> {
    doc: Option<&'a TomlValue>,
    path: Option<&'a Path>,
}

impl Sources<'_> {
    fn of(&self, key_path: &str, env_keys: &[&str], overridden_by: Option<&str>) -> String {
        if let Some(label) = overridden_by {
            return label.to_string();
        }

        // blank values are skipped by the loader, so they never win here either
        if let Some(env_key) = env_keys.iter().find(|key| env_is_set(key)) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn env_is_set(key: &str) -> bool {
    env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false)
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    ["stockroom.toml", "config/stockroom.toml"].into_iter().map(PathBuf::from).find(|p| p.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<TomlValue> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<TomlValue>().ok()
}

fn contains_path(root: &TomlValue, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn entry(value: &str, source: String) -> Value {
    json!({ "value": value, "source": source })
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: toml::Value = "[storage]\ndata_dir = \"/srv\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "storage.data_dir"));
        assert!(!contains_path(&doc, "storage.products_file"));
        assert!(!contains_path(&doc, "logging.level"));
    }
}
