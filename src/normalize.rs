// src/normalize.rs
//! Text normalization for the sentiment consumer: decode entities, strip
//! URLs and everything non-alphanumeric, collapse whitespace, lowercase.
//! Idempotent by construction (every pass is a no-op on its own output).

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize raw post text into the form the sentiment scorer consumes.
pub fn normalize_text(s: &str) -> String {
    // Scraped markup often arrives entity-encoded.
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_URL: OnceCell<Regex> = OnceCell::new();
    let re_url = RE_URL.get_or_init(|| Regex::new(r"https?://\S+").unwrap());
    out = re_url.replace_all(&out, "").to_string();

    static RE_NON_ALNUM: OnceCell<Regex> = OnceCell::new();
    let re_non_alnum = RE_NON_ALNUM.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\s]").unwrap());
    out = re_non_alnum.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_urls_and_punctuation() {
        let s = "Stock Market Rally!! https://t.co/abc123 #bullish";
        assert_eq!(normalize_text(s), "stock market rally bullish");
    }

    #[test]
    fn collapses_whitespace_and_lowercases() {
        let s = "  BIG\t\nNews   here ";
        assert_eq!(normalize_text(s), "big news here");
    }

    #[test]
    fn decodes_entities_before_stripping() {
        let s = "Fed &amp; markets";
        assert_eq!(normalize_text(s), "fed markets");
    }

    #[test]
    fn empty_is_ok() {
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn idempotent() {
        for s in ["", "Hello, WORLD!", "a  b\tc", "https://x.test only"] {
            let once = normalize_text(s);
            assert_eq!(normalize_text(&once), once);
        }
    }
}
