use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::Backend;
use crate::languages;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub deepl_api_key: String,
    pub source_lang: String,
    pub target_lang: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::GoogleTrans,
            deepl_api_key: String::new(),
            source_lang: languages::DEFAULT_SOURCE.to_string(),
            target_lang: languages::DEFAULT_TARGET.to_string(),
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
        let dir = exe.parent().unwrap_or(Path::new("."));
        dir.join("config.json")
    }

    /// Loads `config.json` next to the executable, then applies env overrides.
    pub fn load() -> Self {
        let mut cfg = Self::load_from(&Self::path());
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg
    }

    pub fn load_from(path: &Path) -> Self {
        let cfg = match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str::<Config>(&s).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        cfg.sanitized()
    }

    /// `TRANSLATOR_BACKEND`, `DEEPL_API_KEY`, `SOURCE_LANG` and `TARGET_LANG`
    /// win over the file when set and non-empty.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = var("TRANSLATOR_BACKEND") {
            match v.parse::<Backend>() {
                Ok(b) => self.backend = b,
                Err(e) => log::warn!("{e}; keeping {}", self.backend),
            }
        }
        if let Some(v) = var("DEEPL_API_KEY") {
            self.deepl_api_key = v;
        }
        if let Some(v) = var("SOURCE_LANG") {
            self.source_lang = v;
        }
        if let Some(v) = var("TARGET_LANG") {
            self.target_lang = v;
        }
        *self = std::mem::take(self).sanitized();
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let s = serde_json::to_string_pretty(self)?;
        fs::write(path, s).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        let key = self.deepl_api_key.trim();
        (!key.is_empty()).then_some(key)
    }

    fn sanitized(mut self) -> Self {
        if !languages::is_known(&self.source_lang) {
            self.source_lang = languages::DEFAULT_SOURCE.to_string();
        }
        if !languages::is_known(&self.target_lang) {
            self.target_lang = languages::DEFAULT_TARGET.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("config.json"));
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.api_key(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let cfg = Config {
            backend: Backend::DeepL,
            deepl_api_key: "secret:fx".into(),
            source_lang: "German".into(),
            target_lang: "Japanese".into(),
        };
        cfg.save_to(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"backend\": \"deepl\""));
        assert_eq!(Config::load_from(&path), cfg);
    }

    #[test]
    fn partial_and_unknown_values_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"target_lang": "Elvish", "deepl_api_key": "k"}"#).unwrap();
        let cfg = Config::load_from(&path);
        assert_eq!(cfg.backend, Backend::GoogleTrans);
        assert_eq!(cfg.target_lang, "Spanish");
        assert_eq!(cfg.api_key(), Some("k"));

        fs::write(&path, r#"{"backend": "bing"}"#).unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TRANSLATOR_BACKEND", "deep-translator"),
            ("DEEPL_API_KEY", "abc"),
            ("TARGET_LANG", "French"),
            ("SOURCE_LANG", "  "),
        ]);
        let mut cfg = Config::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.backend, Backend::DeepTranslator);
        assert_eq!(cfg.deepl_api_key, "abc");
        assert_eq!(cfg.target_lang, "French");
        assert_eq!(cfg.source_lang, "English");
    }

    #[test]
    fn unknown_backend_override_is_ignored() {
        let mut cfg = Config { backend: Backend::DeepL, ..Config::default() };
        cfg.apply_overrides(|k| (k == "TRANSLATOR_BACKEND").then(|| "yandex".to_string()));
        assert_eq!(cfg.backend, Backend::DeepL);
    }
}
