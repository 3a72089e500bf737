//! HTML documents sent back to the caller.
//!
//! Every value that came from the upstream page or from the request path goes
//! through `html_escape` before it is written into the markup.

use crate::parse::CardInfo;
use html_escape::{encode_double_quoted_attribute, encode_text};

/// Suffix appended to the thread title on the card
pub const TITLE_SUFFIX: &str = "5ちゃんねる";

/// Static image shown on every card
pub const CARD_IMAGE_URL: &str = "https://i.imgur.com/i1sq3No.jpg";

/// Human-readable label shown in the page body
pub const SERVICE_LABEL: &str = "2chツイッター表示くん";

/// Page with `error: {message}` in the body and no card metadata
pub fn render_error_page(message: &str) -> String {
    let body = format!("error: {}", encode_text(message));
    create_html("", &body)
}

/// Twitter card page for a thread.
///
/// `thread_url` is the original thread on the board service. It is always
/// linked from the body; with `redirect` set the browser is also sent there.
pub fn render_card_page(card: &CardInfo, thread_url: &str, redirect: bool) -> String {
    let url_attr = encode_double_quoted_attribute(thread_url);

    let mut head = twitter_card_meta(card);
    if redirect {
        head.push_str(&format!(
            r#"<meta http-equiv="refresh" content="0; url={}" />"#,
            url_attr
        ));
    }

    let body = format!(
        r#"<p>{}</p><p><a href="{}">{}</a></p>"#,
        encode_text(SERVICE_LABEL),
        url_attr,
        encode_text(thread_url)
    );

    create_html(&head, &body)
}

fn twitter_card_meta(card: &CardInfo) -> String {
    let title = format!("{} {}", card.thread_title, TITLE_SUFFIX);

    format!(
        r#"
    <meta name="twitter:card" content="summary" />
    <meta name="twitter:title" content="{}" />
    <meta name="twitter:description" content="{}" />
    <meta name="twitter:image" content="{}" />
    "#,
        encode_double_quoted_attribute(&title),
        encode_double_quoted_attribute(&card.res_body),
        CARD_IMAGE_URL
    )
}

fn create_html(head: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        {head}
    </head>
    <body>{body}</body>
</html>
"#
    )
}
