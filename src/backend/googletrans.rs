use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::Translator;
use crate::error::TranslateError;

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Free Google web endpoint, the same one the `googletrans` community library talks to.
pub struct GoogleTrans {
    client: reqwest::Client,
}

impl GoogleTrans {
    pub fn new(client: &reqwest::Client) -> Self {
        Self { client: client.clone() }
    }
}

#[async_trait]
impl Translator for GoogleTrans {
    fn name(&self) -> &'static str {
        "googletrans"
    }

    async fn translate(&self, chunk: &str, target_lang: &str) -> Result<String, TranslateError> {
        let resp = self
            .client
            .post(ENDPOINT)
            .timeout(REQUEST_TIMEOUT)
            .query(&[("client", "gtx"), ("sl", "auto"), ("tl", target_lang), ("dt", "t")])
            .form(&[("q", chunk)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TranslateError::Provider { provider: "Google", status, body });
        }

        let body: Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Joins the translated sentence fragments of a `translate_a/single` payload.
///
/// The payload looks like `[[["Hola ", "Hello ", ...], ["mundo", "world", ...]], null, "en", ...]`.
pub(crate) fn parse_response(body: &Value) -> Result<String, TranslateError> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::UnexpectedResponse("missing sentence list".into()))?;

    let out: String = sentences
        .iter()
        .filter_map(|s| s.get(0).and_then(Value::as_str))
        .collect();

    if out.is_empty() && !sentences.is_empty() {
        return Err(TranslateError::UnexpectedResponse("empty translation".into()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_sentence_fragments() {
        let body = json!([
            [["Hola ", "Hello ", null, null, 10], ["mundo", "world", null, null, 10]],
            null,
            "en"
        ]);
        assert_eq!(parse_response(&body).unwrap(), "Hola mundo");
    }

    #[test]
    fn skips_transliteration_rows() {
        let body = json!([[["Привет", "Hello"], [null, null, "Privet"]], null, "en"]);
        assert_eq!(parse_response(&body).unwrap(), "Привет");
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(matches!(
            parse_response(&json!({"error": "nope"})),
            Err(TranslateError::UnexpectedResponse(_))
        ));
        assert!(matches!(
            parse_response(&json!([[[null, "x"]]])),
            Err(TranslateError::UnexpectedResponse(_))
        ));
    }
}
