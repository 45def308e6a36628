use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub api_url: String,
    pub api_token: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub cache_max_age_secs: u64,
    pub search_debounce_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api".into(),
            api_token: None,
            cache_dir: None,
            cache_max_age_secs: 300,
            search_debounce_ms: 300,
            request_timeout_secs: 30,
        }
    }
}

impl ClientSettings {
    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Overrides fields from `PM_*` variables found through `lookup`.
    /// Unparseable numbers are logged and ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("PM_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("PM_API_TOKEN") {
            self.api_token = Some(v).filter(|token| !token.is_empty());
        }
        if let Some(v) = lookup("PM_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(v));
        }
        read_number(&lookup, "PM_CACHE_MAX_AGE_SECS", &mut self.cache_max_age_secs);
        read_number(&lookup, "PM_SEARCH_DEBOUNCE_MS", &mut self.search_debounce_ms);
        read_number(&lookup, "PM_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs);
    }
}

fn read_number(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut u64) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => warn!(key, value = %raw, "config: ignoring non-numeric override"),
    }
}

/// Settings from `client.toml` in the working directory (if present) with
/// environment overrides applied.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    let path = Path::new(SETTINGS_FILE);
    let mut settings = if path.exists() {
        load_settings_from(path)?
    } else {
        ClientSettings::default()
    };
    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<ClientSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn file_values_fill_only_what_they_name() {
        let settings: ClientSettings =
            toml::from_str("api_url = \"https://pm.example.com/api\"\nsearch_debounce_ms = 150\n")
                .expect("parse");
        assert_eq!(settings.api_url, "https://pm.example.com/api");
        assert_eq!(settings.search_debounce(), Duration::from_millis(150));
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn env_overrides_win_and_bad_numbers_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PM_API_URL", "http://127.0.0.1:9000"),
            ("PM_API_TOKEN", "tok"),
            ("PM_CACHE_MAX_AGE_SECS", "10"),
            ("PM_REQUEST_TIMEOUT_SECS", "soon"),
        ]);
        let mut settings = ClientSettings::default();
        settings.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(settings.api_url, "http://127.0.0.1:9000");
        assert_eq!(settings.api_token.as_deref(), Some("tok"));
        assert_eq!(settings.cache_max_age(), Duration::from_secs(10));
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn empty_token_means_none() {
        let mut settings = ClientSettings::default();
        settings.apply_env(|key| (key == "PM_API_TOKEN").then(String::new));
        assert_eq!(settings.api_token, None);
    }

    #[test]
    fn missing_file_is_an_error_with_context() {
        let err = load_settings_from(Path::new("/nonexistent/client.toml")).expect_err("missing");
        assert!(err.to_string().contains("failed to read"));
    }
}
