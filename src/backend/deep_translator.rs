use async_trait::async_trait;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::Translator;
use crate::error::TranslateError;

const ENDPOINT: &str = "https://translate.google.com/m";
const RESULT_CLASS: &str = "result-container";

/// Google's mobile page, scraped the way the `deep-translator` library does.
pub struct DeepTranslator {
    client: reqwest::Client,
}

impl DeepTranslator {
    pub fn new(client: &reqwest::Client) -> Self {
        Self { client: client.clone() }
    }
}

#[async_trait]
impl Translator for DeepTranslator {
    fn name(&self) -> &'static str {
        "deep-translator"
    }

    async fn translate(&self, chunk: &str, target_lang: &str) -> Result<String, TranslateError> {
        let resp = self
            .client
            .get(ENDPOINT)
            .query(&[("tl", target_lang), ("sl", "auto"), ("q", chunk)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TranslateError::Provider { provider: "Google", status, body });
        }

        let html = resp.text().await?;
        extract_translation(&html)
    }
}

pub(crate) fn extract_translation(html: &str) -> Result<String, TranslateError> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| TranslateError::UnexpectedResponse(format!("unreadable page: {e}")))?;
    let container = find_by_class(&dom.document, RESULT_CLASS)
        .ok_or_else(|| TranslateError::UnexpectedResponse("no result-container in page".into()))?;
    let mut text = String::new();
    collect_text(&container, &mut text);
    Ok(text.trim().to_string())
}

fn has_class(node: &Handle, class: &str) -> bool {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .any(|attr| &*attr.name.local == "class" && attr.value.split_whitespace().any(|c| c == class)),
        _ => false,
    }
}

fn find_by_class(node: &Handle, class: &str) -> Option<Handle> {
    if has_class(node, class) {
        return Some(node.clone());
    }
    node.children.borrow().iter().find_map(|child| find_by_class(child, class))
}

// Entities are already decoded by the tokenizer.
fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_result_container() {
        let html = r#"<html><body><div class="result-container">Hola mundo</div>
            <div class="other">ignored</div></body></html>"#;
        assert_eq!(extract_translation(html).unwrap(), "Hola mundo");
    }

    #[test]
    fn decodes_html_entities() {
        let html = r#"<div class="result-container">Tom &amp; Jerry &#39;s &lt;show&gt; &#x263A;</div>"#;
        assert_eq!(extract_translation(html).unwrap(), "Tom & Jerry 's <show> \u{263A}");
    }

    #[test]
    fn decodes_named_entities() {
        let html = r#"<div class="result-container">caf&eacute; &hellip; &ndash;</div>"#;
        assert_eq!(extract_translation(html).unwrap(), "caf\u{e9} \u{2026} \u{2013}");
    }

    #[test]
    fn matches_class_among_several() {
        let html = r#"<div class="t0 result-container big"><span>Bonjour</span> le monde</div>"#;
        assert_eq!(extract_translation(html).unwrap(), "Bonjour le monde");
    }

    #[test]
    fn missing_container_is_an_error() {
        let err = extract_translation("<html>captcha</html>").unwrap_err();
        assert!(err.is_retryable());
    }
}
