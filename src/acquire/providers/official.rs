// src/acquire/providers/official.rs
//! Quaternary provider: the official forum search API. Least rich, most
//! reliable, so it anchors the end of the chain. Auth is an OAuth
//! client-credentials handshake: `POST` the token endpoint with basic auth,
//! then `GET` the search endpoint with the bearer token. Credentials are
//! passed through as given; missing ones are a capability failure at call
//! time.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;

use crate::acquire::types::{Provider, RawItem, SourceKind};
use crate::config::OfficialCredentials;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const SEARCH_URL: &str = "https://oauth.reddit.com/search";
const USER_AGENT: &str = concat!("sentiment-harvester/", env!("CARGO_PKG_VERSION"));

pub struct OfficialProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        credentials: OfficialCredentials,
        client: reqwest::Client,
    },
}

impl OfficialProvider {
    pub fn from_credentials(credentials: OfficialCredentials) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            mode: Mode::Http {
                credentials,
                client,
            },
        }
    }

    /// Parse a canned search response directly; used by tests.
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn parse_payload(body: &str, limit: usize) -> Result<Vec<RawItem>> {
        let v: Value = serde_json::from_str(body).context("parsing official api json")?;
        let children = v["data"]["children"]
            .as_array()
            .ok_or_else(|| anyhow!("official payload missing data.children"))?;

        let mut out = Vec::new();
        for child in children {
            if out.len() >= limit {
                break;
            }
            let post = &child["data"];
            let title = post["title"].as_str().unwrap_or_default();
            let selftext = post["selftext"].as_str().unwrap_or_default();
            let content = format!("{title} {selftext}").trim().to_string();

            let url = post["url"].as_str().unwrap_or_default();
            let key = post["name"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| url.to_string());
            if key.is_empty() || content.is_empty() {
                continue;
            }

            out.push(
                RawItem::new(SourceKind::Official, key, content)
                    .with_attr("title", title)
                    .with_attr("score", post["score"].as_i64().unwrap_or(0).to_string())
                    .with_attr(
                        "num_comments",
                        post["num_comments"].as_i64().unwrap_or(0).to_string(),
                    )
                    .with_attr("url", url),
            );
        }

        if out.is_empty() {
            bail!("official payload contained no usable items");
        }
        counter!("acquire_items_parsed_total").increment(out.len() as u64);
        Ok(out)
    }

    async fn obtain_token(client: &reqwest::Client, creds: &OfficialCredentials) -> Result<String> {
        let (Some(id), Some(secret)) = (&creds.client_id, &creds.client_secret) else {
            bail!("official api credentials not configured");
        };

        let resp = client
            .post(TOKEN_URL)
            .basic_auth(id, Some(secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("official token request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("official token endpoint returned {status}");
        }
        let body: Value = resp.json().await.context("official token body")?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("official token response missing access_token"))
    }
}

#[async_trait]
impl Provider for OfficialProvider {
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse_payload(body, limit),
            Mode::Http {
                credentials,
                client,
            } => {
                let token = Self::obtain_token(client, credentials).await?;

                let url = reqwest::Url::parse_with_params(
                    SEARCH_URL,
                    &[("q", query), ("limit", &limit.to_string())],
                )
                .context("building official search url")?;

                let resp = client
                    .get(url)
                    .bearer_auth(token)
                    .send()
                    .await
                    .context("official search request")?;

                let status = resp.status();
                if !status.is_success() {
                    bail!("official search endpoint returned {status}");
                }
                let body = resp.text().await.context("official search body")?;
                Self::parse_payload(&body, limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        "official"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Official
    }
}
