use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

mod deep_translator;
mod deepl;
mod googletrans;

pub use deep_translator::DeepTranslator;
pub use deepl::DeepL;
pub use googletrans::GoogleTrans;

static CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("translator-pro/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// A translation provider that turns one chunk into the target language.
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn translate(&self, chunk: &str, target_lang: &str) -> Result<String, TranslateError>;
}

/// The closed set of selectable providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Backend {
    #[default]
    #[serde(rename = "googletrans")]
    GoogleTrans,
    #[serde(rename = "deep-translator")]
    DeepTranslator,
    #[serde(rename = "deepl")]
    DeepL,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::GoogleTrans, Backend::DeepTranslator, Backend::DeepL];

    pub fn id(self) -> &'static str {
        match self {
            Backend::GoogleTrans => "googletrans",
            Backend::DeepTranslator => "deep-translator",
            Backend::DeepL => "deepl",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Backend::GoogleTrans => "Google Translate (googletrans)",
            Backend::DeepTranslator => "Deep Translator (Google backend)",
            Backend::DeepL => "DeepL API",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Backend::GoogleTrans => "Free, unlimited, no API key required",
            Backend::DeepTranslator => "Free, more reliable, no API key required",
            Backend::DeepL => "Best quality, requires free API key (500k chars/month)",
        }
    }

    pub fn needs_api_key(self) -> bool {
        matches!(self, Backend::DeepL)
    }

    /// Build the adapter for this backend. Credentials are validated on first use.
    pub fn translator(self, api_key: Option<&str>) -> Box<dyn Translator> {
        match self {
            Backend::GoogleTrans => Box::new(GoogleTrans::new(&CLIENT)),
            Backend::DeepTranslator => Box::new(DeepTranslator::new(&CLIENT)),
            Backend::DeepL => Box::new(DeepL::new(&CLIENT, api_key.unwrap_or_default())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Backend {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|b| b.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TranslateError::UnknownBackend(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_selectors() {
        assert_eq!("googletrans".parse::<Backend>().unwrap(), Backend::GoogleTrans);
        assert_eq!("Deep-Translator".parse::<Backend>().unwrap(), Backend::DeepTranslator);
        assert_eq!(" deepl ".parse::<Backend>().unwrap(), Backend::DeepL);
    }

    #[test]
    fn unknown_selector_is_rejected() {
        let err = "bing".parse::<Backend>().unwrap_err();
        assert!(matches!(err, TranslateError::UnknownBackend(ref s) if s == "bing"));
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Unknown translation backend: bing");
    }

    #[test]
    fn serde_uses_selector_ids() {
        let json = serde_json::to_string(&Backend::DeepTranslator).unwrap();
        assert_eq!(json, "\"deep-translator\"");
        let back: Backend = serde_json::from_str("\"deepl\"").unwrap();
        assert_eq!(back, Backend::DeepL);
    }

    #[test]
    fn adapters_match_selection() {
        assert_eq!(Backend::GoogleTrans.translator(None).name(), "googletrans");
        assert_eq!(Backend::DeepTranslator.translator(None).name(), "deep-translator");
        assert_eq!(Backend::DeepL.translator(Some("k")).name(), "deepl");
        assert!(Backend::DeepL.needs_api_key());
        assert!(!Backend::GoogleTrans.needs_api_key());
    }
}
