// src/acquire/providers/browser.rs
//! Primary provider: drives a headless-browser render endpoint
//! (browserless-style `POST {base}/content {"url": ...}` returning fully
//! rendered HTML) and extracts posts from the markup. Richest results,
//! least reliable, so it sits first in the chain.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::acquire::types::{Provider, RawItem, SourceKind};

const RENDER_TIMEOUT: Duration = Duration::from_secs(60);
const SEARCH_URL: &str = "https://twitter.com/search";

pub struct BrowserProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        // None means the browser engine is not wired up on this host; that
        // is a per-call capability failure, never a startup crash.
        endpoint: Option<String>,
        client: reqwest::Client,
    },
}

impl BrowserProvider {
    pub fn from_endpoint(endpoint: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(RENDER_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            mode: Mode::Http {
                endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
                client,
            },
        }
    }

    /// Parse pre-rendered HTML directly; used by tests.
    pub fn from_fixture(html: &str) -> Self {
        Self {
            mode: Mode::Fixture(html.to_string()),
        }
    }

    /// Extract post items from rendered search markup: one `<article>` per
    /// post carrying a `/user/status/<id>` permalink, an author handle and
    /// a text block.
    pub fn parse_rendered(html: &str, limit: usize) -> Result<Vec<RawItem>> {
        static RE_STATUS: OnceCell<Regex> = OnceCell::new();
        let re_status = RE_STATUS
            .get_or_init(|| Regex::new(r#"href="[^"]*?/([A-Za-z0-9_]+)/status/(\d+)"#).unwrap());

        static RE_TEXT: OnceCell<Regex> = OnceCell::new();
        let re_text = RE_TEXT.get_or_init(|| {
            Regex::new(r#"(?is)(?:data-testid="tweetText"|class="tweet-content[^"]*")[^>]*>(.*?)</(?:div|span|p)>"#)
                .unwrap()
        });

        static RE_DATE: OnceCell<Regex> = OnceCell::new();
        let re_date = RE_DATE.get_or_init(|| Regex::new(r#"datetime="([^"]+)""#).unwrap());

        static RE_TAGS: OnceCell<Regex> = OnceCell::new();
        let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());

        let mut out = Vec::new();
        for chunk in html.split("<article").skip(1) {
            if out.len() >= limit {
                break;
            }
            let Some(link) = re_status.captures(chunk) else {
                continue;
            };
            let username = link[1].to_string();
            let id = link[2].to_string();

            let Some(text_cap) = re_text.captures(chunk) else {
                continue;
            };
            let text_html = &text_cap[1];
            let text = html_escape::decode_html_entities(
                re_tags.replace_all(text_html, "").trim(),
            )
            .to_string();
            if text.is_empty() {
                continue;
            }

            let date = re_date
                .captures(chunk)
                .map(|c| c[1].to_string())
                .unwrap_or_default();

            out.push(
                RawItem::new(SourceKind::Browser, id.clone(), text)
                    .with_attr("username", username.clone())
                    .with_attr("date", date)
                    .with_attr("url", format!("https://twitter.com/{username}/status/{id}")),
            );
        }

        if out.is_empty() {
            bail!("no posts found in rendered markup");
        }
        counter!("acquire_items_parsed_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl Provider for BrowserProvider {
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(html) => Self::parse_rendered(html, limit),
            Mode::Http { endpoint, client } => {
                let endpoint = endpoint
                    .as_deref()
                    .ok_or_else(|| anyhow!("browser render endpoint not configured"))?;

                let search_url =
                    reqwest::Url::parse_with_params(SEARCH_URL, &[("q", query), ("f", "live")])
                        .context("building search url")?;

                let resp = client
                    .post(format!("{endpoint}/content"))
                    .json(&serde_json::json!({ "url": search_url.as_str() }))
                    .send()
                    .await
                    .context("browser render request")?;

                let status = resp.status();
                if !status.is_success() {
                    bail!("browser render endpoint returned {status}");
                }
                let html = resp.text().await.context("browser render body")?;
                Self::parse_rendered(&html, limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        "browser"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Browser
    }
}
