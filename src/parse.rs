use crate::error::{CardError, Result};
use encoding_rs::{Encoding, SHIFT_JIS};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Longest description we put in a card, counted in characters
pub const MAX_RES_BODY_CHARS: usize = 200;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid CSS selector"));

/// Post body as laid out on read.cgi pages
static MESSAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.message > span.escaped").expect("valid CSS selector"));

/// What goes on the preview card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    pub thread_title: String,
    pub res_body: String,
}

/// Resolve a charset label, falling back to Shift_JIS for unknown labels
pub fn encoding_for_label(label: &str) -> &'static Encoding {
    Encoding::for_label(label.trim().as_bytes()).unwrap_or(SHIFT_JIS)
}

/// Decode the page bytes.
///
/// The declared charset wins over the fallback, and a byte order mark wins
/// over both. Malformed sequences become U+FFFD instead of failing.
pub fn decode_body(body: &[u8], declared: Option<&str>, fallback: &'static Encoding) -> String {
    let encoding = declared
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(fallback);

    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::debug!(encoding = used.name(), "page contained malformed byte sequences");
    }
    text.into_owned()
}

/// Pull the thread title and the target post's text out of a read.cgi page
pub fn extract_card(html: &str) -> Result<CardInfo> {
    let document = Html::parse_document(html);

    // Same as a browser's document.title: whitespace collapsed, empty if absent
    let thread_title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|title| collapse_whitespace(&text_of(title)))
        .unwrap_or_default();

    let message = document.select(&MESSAGE_SELECTOR).next().ok_or_else(|| {
        CardError::UpstreamParse(format!(
            "no element matching div.message > span.escaped (title: {:?})",
            thread_title
        ))
    })?;

    Ok(CardInfo {
        thread_title,
        res_body: truncate_chars(&text_of(message), MAX_RES_BODY_CHARS),
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep the first `max` characters. Cuts mid-word on purpose.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
