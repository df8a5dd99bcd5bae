// src/acquire/providers/mirror.rs
//! Tertiary provider: community mirror API speaking JSON. Mirrors disagree
//! on payload shape, so parsing is deliberately tolerant: the item array may
//! live under `results`, `tweets`, or at the root, and per-item fields have
//! two accepted spellings each.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;

use crate::acquire::types::{Provider, RawItem, SourceKind};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct MirrorProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: Option<String>,
        client: reqwest::Client,
    },
}

impl MirrorProvider {
    pub fn from_base_url(base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            mode: Mode::Http {
                base_url: base_url.map(|b| b.trim_end_matches('/').to_string()),
                client,
            },
        }
    }

    /// Parse a canned JSON body directly; used by tests.
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn parse_payload(body: &str, limit: usize) -> Result<Vec<RawItem>> {
        let v: Value = serde_json::from_str(body).context("parsing mirror json")?;

        let array = v["results"]
            .as_array()
            .or_else(|| v["tweets"].as_array())
            .or_else(|| v.as_array())
            .ok_or_else(|| anyhow!("mirror payload has no item array"))?;

        let mut out = Vec::new();
        for item in array {
            if out.len() >= limit {
                break;
            }
            let text = item["text"]
                .as_str()
                .or_else(|| item["tweet"]["text"].as_str())
                .unwrap_or_default();
            let id = string_or_number(&item["id"])
                .or_else(|| string_or_number(&item["tweetId"]))
                .unwrap_or_default();
            if id.is_empty() || text.is_empty() {
                continue;
            }

            let username = item["username"]
                .as_str()
                .or_else(|| item["user"]["username"].as_str())
                .unwrap_or_default();
            let date = item["date"]
                .as_str()
                .or_else(|| item["created_at"].as_str())
                .unwrap_or_default();

            out.push(
                RawItem::new(SourceKind::Mirror, id, text)
                    .with_attr("username", username)
                    .with_attr("date", date),
            );
        }

        if out.is_empty() {
            bail!("mirror payload contained no usable items");
        }
        counter!("acquire_items_parsed_total").increment(out.len() as u64);
        Ok(out)
    }
}

fn string_or_number(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Provider for MirrorProvider {
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse_payload(body, limit),
            Mode::Http { base_url, client } => {
                let base = base_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("mirror base url not configured"))?;

                let url = reqwest::Url::parse_with_params(
                    &format!("{base}/api/search"),
                    &[("q", query), ("limit", &limit.to_string())],
                )
                .context("building mirror search url")?;

                let resp = client.get(url).send().await.context("mirror http get")?;
                let status = resp.status();
                if !status.is_success() {
                    bail!("mirror returned {status}");
                }
                let body = resp.text().await.context("mirror http body")?;
                Self::parse_payload(&body, limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        "mirror"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Mirror
    }
}
