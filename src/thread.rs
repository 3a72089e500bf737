use crate::error::{CardError, Result};
use url::Url;

/// Root domain every thread host lives under
pub const SERVICE_APEX: &str = "5ch.net";

/// Fixed path segments between the host and the board name
const READ_CGI_SEGMENTS: [&str; 2] = ["test", "read.cgi"];

const THREAD_ID_DIGITS: usize = 10;
const MAX_COMMENT_ID_DIGITS: usize = 4;

/// Post number used when the link does not point at a specific reply
const FIRST_POST: &str = "1";

/// Where a thread (and optionally one post in it) lives on the board service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadCoordinates {
    pub sub_domain_name: String,
    pub board_name: String,
    pub thread_id: String,
    pub comment_id: Option<String>,
}

impl ThreadCoordinates {
    /// Extract coordinates from an inbound request path.
    ///
    /// Accepts `/{subdomain}.5ch.net/test/read.cgi/{board}/{threadId}/{commentId?}`
    /// with an optional trailing slash and an optional pasted `http://` or
    /// `https://` prefix. Anything else is rejected as a whole.
    pub fn from_path(path: &str) -> Result<Self> {
        let path = path.strip_prefix('/').ok_or(CardError::MalformedRequestUrl)?;
        let path = strip_scheme(path);
        let path = path.strip_suffix('/').unwrap_or(path);

        let mut segments = path.split('/');

        // Hostnames are case-insensitive
        let host = segments
            .next()
            .ok_or(CardError::MalformedRequestUrl)?
            .to_ascii_lowercase();
        let sub_domain_name = host
            .strip_suffix(SERVICE_APEX)
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|sub| is_sub_domain(sub))
            .ok_or(CardError::MalformedRequestUrl)?;

        for expected in READ_CGI_SEGMENTS {
            if segments.next() != Some(expected) {
                return Err(CardError::MalformedRequestUrl);
            }
        }

        let board_name = segments
            .next()
            .filter(|board| is_board_name(board))
            .ok_or(CardError::MalformedRequestUrl)?;

        let thread_id = segments
            .next()
            .filter(|id| id.len() == THREAD_ID_DIGITS && is_digits(id))
            .ok_or(CardError::MalformedRequestUrl)?;

        let comment_id = match segments.next() {
            None => None,
            Some(id) if (1..=MAX_COMMENT_ID_DIGITS).contains(&id.len()) && is_digits(id) => {
                Some(id.to_string())
            }
            Some(_) => return Err(CardError::MalformedRequestUrl),
        };

        if segments.next().is_some() {
            return Err(CardError::MalformedRequestUrl);
        }

        Ok(Self {
            sub_domain_name: sub_domain_name.to_string(),
            board_name: board_name.to_string(),
            thread_id: thread_id.to_string(),
            comment_id,
        })
    }

    /// Post number the target URL points at
    pub fn post_number(&self) -> &str {
        self.comment_id.as_deref().unwrap_or(FIRST_POST)
    }

    /// Canonical read.cgi URL on the board service for these coordinates
    pub fn target_url(&self) -> Result<Url> {
        let raw = format!(
            "http://{}.{}/test/read.cgi/{}/{}/{}",
            self.sub_domain_name,
            SERVICE_APEX,
            self.board_name,
            self.thread_id,
            self.post_number()
        );

        // Segments are already restricted to URL-safe characters, so this only
        // fails on hosts the url crate itself refuses (e.g. a leading hyphen).
        Url::parse(&raw).map_err(|_| CardError::MalformedRequestUrl)
    }
}

/// Drop a pasted `http://` / `https://` in front of the host
fn strip_scheme(path: &str) -> &str {
    ["http://", "https://", "http:/", "https:/"]
        .iter()
        .find_map(|scheme| path.strip_prefix(scheme))
        .unwrap_or(path)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_sub_domain(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn is_board_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(path: &str) -> ThreadCoordinates {
        ThreadCoordinates::from_path(path).unwrap()
    }

    #[test]
    fn test_from_path_with_comment() {
        let c = coords("/may.5ch.net/test/read.cgi/news/1234567890/5");
        assert_eq!(c.sub_domain_name, "may");
        assert_eq!(c.board_name, "news");
        assert_eq!(c.thread_id, "1234567890");
        assert_eq!(c.comment_id.as_deref(), Some("5"));
        assert_eq!(
            c.target_url().unwrap().as_str(),
            "http://may.5ch.net/test/read.cgi/news/1234567890/5"
        );
    }

    #[test]
    fn test_from_path_without_comment_defaults_to_first_post() {
        for path in [
            "/hayabusa9.5ch.net/test/read.cgi/news/1600000000",
            "/hayabusa9.5ch.net/test/read.cgi/news/1600000000/",
        ] {
            let c = coords(path);
            assert_eq!(c.comment_id, None);
            assert_eq!(c.post_number(), "1");
            assert_eq!(
                c.target_url().unwrap().as_str(),
                "http://hayabusa9.5ch.net/test/read.cgi/news/1600000000/1"
            );
        }
    }

    #[test]
    fn test_from_path_comment_widths() {
        assert_eq!(
            coords("/may.5ch.net/test/read.cgi/news/1234567890/1000").post_number(),
            "1000"
        );
        assert_eq!(
            coords("/may.5ch.net/test/read.cgi/news/1234567890/42/").post_number(),
            "42"
        );
    }

    #[test]
    fn test_from_path_pasted_scheme() {
        for path in [
            "/http://may.5ch.net/test/read.cgi/news/1234567890/5",
            "/https://may.5ch.net/test/read.cgi/news/1234567890/5",
            "/https:/may.5ch.net/test/read.cgi/news/1234567890/5",
        ] {
            assert_eq!(coords(path), coords("/may.5ch.net/test/read.cgi/news/1234567890/5"));
        }
    }

    #[test]
    fn test_from_path_host_is_case_insensitive() {
        let c = coords("/MAY.5CH.NET/test/read.cgi/news/1234567890/5");
        assert_eq!(c.sub_domain_name, "may");
        assert_eq!(
            c.target_url().unwrap().as_str(),
            "http://may.5ch.net/test/read.cgi/news/1234567890/5"
        );

        let pasted = coords("/https://May.5ch.Net/test/read.cgi/news/1234567890");
        assert_eq!(pasted.sub_domain_name, "may");
        assert_eq!(pasted.post_number(), "1");
    }

    #[test]
    fn test_from_path_rejects_bad_digit_counts() {
        for path in [
            "/may.5ch.net/test/read.cgi/news/123456789/5",
            "/may.5ch.net/test/read.cgi/news/12345678901/5",
            "/may.5ch.net/test/read.cgi/news/12345abcde/5",
            "/may.5ch.net/test/read.cgi/news/1234567890/12345",
            "/may.5ch.net/test/read.cgi/news/1234567890/l50",
        ] {
            assert!(
                matches!(
                    ThreadCoordinates::from_path(path),
                    Err(CardError::MalformedRequestUrl)
                ),
                "should reject {path}"
            );
        }
    }

    #[test]
    fn test_from_path_rejects_missing_or_extra_segments() {
        for path in [
            "",
            "/",
            "/may.5ch.net",
            "/may.5ch.net/test/read.cgi/news",
            "/may.5ch.net/test/read.cgi/1234567890/5",
            "/may.5ch.net/read.cgi/news/1234567890/5",
            "/may.5ch.net/test/read.cgi/news/1234567890/5/6",
            "/5ch/may/news/1234567890/5",
            "/5ch.net/test/read.cgi/news/1234567890/5",
            "/may.2ch.net/test/read.cgi/news/1234567890/5",
        ] {
            assert!(ThreadCoordinates::from_path(path).is_err(), "should reject {path:?}");
        }
    }

    #[test]
    fn test_from_path_rejects_injection() {
        for path in [
            "/evil.com#.5ch.net/test/read.cgi/news/1234567890/5",
            "/a@evil.5ch.net/test/read.cgi/news/1234567890/5",
            "/may.5ch.net/test/read.cgi/ne..ws/1234567890/5",
            "/may.5ch.net/test/read.cgi/new%2Fs/1234567890/5",
        ] {
            assert!(ThreadCoordinates::from_path(path).is_err(), "should reject {path:?}");
        }
    }
}
