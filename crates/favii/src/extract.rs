//! `<meta>` and `<link>` extraction from a token stream

use crate::error::TokenizeError;
use crate::tokenizer::{Tag, Token};
use crate::types::{Link, Meta};
use tracing::debug;

/// Records collected from one document, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub metas: Vec<Meta>,
    pub links: Vec<Link>,
}

/// Collect every `meta` and `link` tag from `tokens`
///
/// Consumes the stream in a single pass. The first error from the stream
/// aborts extraction and is returned; records gathered so far are dropped.
pub fn extract<I>(tokens: I) -> Result<Extraction, TokenizeError>
where
    I: IntoIterator<Item = Result<Token, TokenizeError>>,
{
    let extraction = tokens
        .into_iter()
        .try_fold(Extraction::default(), |mut acc, token| {
            match token? {
                Token::StartTag(tag) | Token::SelfClosingTag(tag) => acc.push_tag(&tag),
                _ => {}
            }
            Ok::<_, TokenizeError>(acc)
        })?;

    debug!(
        metas = extraction.metas.len(),
        links = extraction.links.len(),
        "Extracted page tags"
    );
    Ok(extraction)
}

impl Extraction {
    fn push_tag(&mut self, tag: &Tag) {
        match tag.name.as_str() {
            "meta" => self.metas.push(meta_from(tag)),
            "link" => self.links.push(link_from(tag)),
            _ => {}
        }
    }
}

fn meta_from(tag: &Tag) -> Meta {
    let mut meta = Meta::default();
    for (key, value) in tag.attributes() {
        match key {
            "name" => meta.name = value.to_string(),
            "content" => meta.content = value.to_string(),
            _ => {}
        }
    }
    meta
}

fn link_from(tag: &Tag) -> Link {
    let mut link = Link::default();
    for (key, value) in tag.attributes() {
        match key {
            "rel" => link.rel = value.to_string(),
            "href" => link.href = value.to_string(),
            _ => {}
        }
    }
    link
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Tokenizer;

    fn extract_html(html: &str) -> Extraction {
        extract(Tokenizer::new(html.as_bytes())).unwrap()
    }

    #[test]
    fn test_meta_order_preserved() {
        let html = r#"<meta name="a" content="1"><meta name="b" content="2"><meta name="c" content="3">"#;
        let names: Vec<_> = extract_html(html)
            .metas
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicates_retained() {
        let html = r#"<meta name="x" content="1"><meta name="x" content="2">"#;
        let extraction = extract_html(html);
        assert_eq!(
            extraction.metas,
            vec![Meta::new("x", "1"), Meta::new("x", "2")]
        );
    }

    #[test]
    fn test_missing_fields_empty() {
        let html = r#"<meta charset="utf-8"><meta property="og:title" content="T"><link><link href="/a.css">"#;
        let extraction = extract_html(html);
        assert_eq!(
            extraction.metas,
            vec![Meta::default(), Meta::new("", "T")]
        );
        assert_eq!(
            extraction.links,
            vec![Link::default(), Link::new("", "/a.css")]
        );
    }

    #[test]
    fn test_last_duplicate_attribute_wins() {
        let html = r#"<link rel="stylesheet" href="/a" rel="icon">"#;
        assert_eq!(extract_html(html).links, vec![Link::new("icon", "/a")]);
    }

    #[test]
    fn test_attribute_order_irrelevant() {
        let html = r#"<link href="/i.png" rel="icon"/>"#;
        assert_eq!(extract_html(html).links, vec![Link::new("icon", "/i.png")]);
    }

    #[test]
    fn test_other_tags_ignored() {
        let html = r#"<!DOCTYPE html>
<html><head>
<title>Title</title>
<script>document.write('<link rel="icon" href="/fake.png">');</script>
<!-- <meta name="hidden" content="x"> -->
<link rel="icon" href="/real.png">
</head><body><a href="/x" rel="icon">x</a><meta name="late" content="y"></body></html>"#;
        let extraction = extract_html(html);
        assert_eq!(extraction.links, vec![Link::new("icon", "/real.png")]);
        assert_eq!(extraction.metas, vec![Meta::new("late", "y")]);
    }

    #[test]
    fn test_error_discards_records() {
        let tokens = vec![
            Ok(Token::StartTag(Tag::new("meta").with_attribute("name", "a"))),
            Err(TokenizeError::TokenTooLarge { limit: 1 }),
            Ok(Token::StartTag(Tag::new("link").with_attribute("rel", "icon"))),
        ];
        assert!(matches!(
            extract(tokens),
            Err(TokenizeError::TokenTooLarge { limit: 1 })
        ));
    }

    #[test]
    fn test_end_tags_and_text_skipped() {
        let tokens = vec![
            Ok(Token::Text("meta".to_string())),
            Ok(Token::EndTag("link".to_string())),
            Ok(Token::SelfClosingTag(Tag::new("link"))),
        ];
        let extraction = extract(tokens).unwrap();
        assert!(extraction.metas.is_empty());
        assert_eq!(extraction.links, vec![Link::default()]);
    }
}
