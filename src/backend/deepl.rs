use async_trait::async_trait;
use serde::Deserialize;

use super::Translator;
use crate::error::TranslateError;

const FREE_ENDPOINT: &str = "https://api-free.deepl.com/v2/translate";
const PRO_ENDPOINT: &str = "https://api.deepl.com/v2/translate";

/// Two-letter codes DeepL spells differently. Anything else is upper-cased.
const DEEPL_CODES: &[(&str, &str)] = &[
    ("en", "EN-US"),
    ("es", "ES"),
    ("fr", "FR"),
    ("de", "DE"),
    ("it", "IT"),
    ("pt", "PT-PT"),
    ("pl", "PL"),
    ("ru", "RU"),
    ("ja", "JA"),
    ("zh", "ZH"),
    ("nl", "NL"),
    ("sv", "SV"),
    ("da", "DA"),
    ("fi", "FI"),
    ("el", "EL"),
    ("cs", "CS"),
    ("ro", "RO"),
    ("hu", "HU"),
    ("sk", "SK"),
    ("bg", "BG"),
    ("et", "ET"),
    ("lv", "LV"),
    ("lt", "LT"),
    ("sl", "SL"),
    ("tr", "TR"),
    ("id", "ID"),
    ("uk", "UK"),
    ("ko", "KO"),
    ("no", "NB"),
];

pub fn deepl_target_code(code: &str) -> String {
    DEEPL_CODES
        .iter()
        .find(|(from, _)| *from == code)
        .map(|(_, to)| to.to_string())
        .unwrap_or_else(|| code.to_uppercase())
}

fn endpoint_for(api_key: &str) -> &'static str {
    if api_key.ends_with(":fx") {
        FREE_ENDPOINT
    } else {
        PRO_ENDPOINT
    }
}

#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// Paid DeepL REST API.
pub struct DeepL {
    client: reqwest::Client,
    api_key: String,
}

impl DeepL {
    pub fn new(client: &reqwest::Client, api_key: &str) -> Self {
        Self { client: client.clone(), api_key: api_key.trim().to_string() }
    }
}

#[async_trait]
impl Translator for DeepL {
    fn name(&self) -> &'static str {
        "deepl"
    }

    async fn translate(&self, chunk: &str, target_lang: &str) -> Result<String, TranslateError> {
        if self.api_key.is_empty() {
            return Err(TranslateError::MissingCredentials);
        }

        let target = deepl_target_code(target_lang);
        let resp = self
            .client
            .post(endpoint_for(&self.api_key))
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&[("text", chunk), ("target_lang", target.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TranslateError::Provider { provider: "DeepL", status, body });
        }

        let parsed: DeepLResponse = resp.json().await?;
        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| TranslateError::UnexpectedResponse("empty translation list".into()))
    }
}
