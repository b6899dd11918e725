//! HTML text extraction.
//!
//! Produces the ordered body token stream plus the structural (title and
//! meta description/keywords) tokens used for tag-frequency weighting.

use crate::tokenizer::raw_tokens;
use scraper::{Html, Node};

/// Text pulled out of one HTML page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    /// Visible document text in document order, title included.
    pub text: String,
}

/// Raw (not yet normalized) tokens of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDocument {
    pub body: Vec<String>,
    pub title: Vec<String>,
    /// Capped description tokens followed by capped keywords tokens.
    pub meta: Vec<String>,
}

impl ExtractedDocument {
    pub fn from_page(page: &ParsedPage, meta_token_cap: usize) -> Self {
        let capped = |field: &Option<String>| -> Vec<String> {
            field
                .as_deref()
                .map(|s| raw_tokens(s).into_iter().take(meta_token_cap).collect())
                .unwrap_or_default()
        };
        let mut meta = capped(&page.description);
        meta.extend(capped(&page.keywords));
        Self {
            body: raw_tokens(&page.text),
            title: page.title.as_deref().map(raw_tokens).unwrap_or_default(),
            meta,
        }
    }

    /// Title tokens then meta tokens.
    pub fn structural_tokens(&self) -> impl Iterator<Item = &str> {
        self.title.iter().chain(self.meta.iter()).map(String::as_str)
    }
}

const IGNORED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements whose boundaries separate words. Text inside inline markup is
/// joined to its neighbours as written.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "head",
    "header", "hr", "html", "li", "main", "nav", "ol", "option", "p", "pre", "section", "summary", "table",
    "td", "th", "title", "tr", "ul",
];

/// Append `text` with whitespace runs collapsed to one space.
fn push_collapsed(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch.is_whitespace() {
            soft_break(out);
        } else {
            out.push(ch);
        }
    }
}

fn soft_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}

pub fn parse_page(source: &str) -> ParsedPage {
    let html = Html::parse_document(source);
    let mut page = ParsedPage::default();
    let mut title_text = String::new();
    let mut titles_seen = 0usize;
    let mut last_block = None;

    for node in html.tree.root().descendants() {
        match node.value() {
            Node::Text(text) => {
                let parent = node.parent().and_then(|p| p.value().as_element()).map(|e| e.name());
                match parent {
                    Some(name) if IGNORED_ELEMENTS.contains(&name) => continue,
                    Some("title") if titles_seen == 1 => title_text.push_str(text),
                    _ => {}
                }
                let block = node
                    .ancestors()
                    .find(|a| a.value().as_element().is_some_and(|e| BLOCK_ELEMENTS.contains(&e.name())))
                    .map(|a| a.id());
                if block != last_block {
                    soft_break(&mut page.text);
                    last_block = block;
                }
                push_collapsed(&mut page.text, text);
            }
            Node::Element(el) => match el.name() {
                "br" => soft_break(&mut page.text),
                "title" => titles_seen += 1,
                "meta" => {
                    let name = el.attr("name").or_else(|| el.attr("http-equiv")).map(str::to_ascii_lowercase);
                    let content = el.attr("content").map(str::to_string);
                    match name.as_deref() {
                        Some("description") if page.description.is_none() => page.description = content,
                        Some("keywords") if page.keywords.is_none() => page.keywords = content,
                        _ => {}
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    page.text.truncate(page.text.trim_end().len());
    let title = title_text.trim();
    if !title.is_empty() {
        page.title = Some(title.to_string());
    }
    page
}

/// Parse an HTML page and split it into raw token streams.
pub fn extract(source: &str, meta_token_cap: usize) -> ExtractedDocument {
    ExtractedDocument::from_page(&parse_page(source), meta_token_cap)
}
