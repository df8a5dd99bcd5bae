// src/acquire/providers/scraper.rs
//! Secondary provider: shells out to an external scraper tool that emits one
//! JSON object per line (`snscrape --jsonl`). The binary is an optional
//! runtime dependency; its absence is an ordinary failure so the chain can
//! fall through.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use tokio::process::Command;

use crate::acquire::types::{Provider, RawItem, SourceKind};

const SCRAPE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ScraperProvider {
    command: String,
}

impl ScraperProvider {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Map scraper JSONL output into items. Tolerates both `rawContent` and
    /// `content` text fields; items without a post id are skipped.
    pub fn parse_jsonl(stdout: &str, limit: usize) -> Result<Vec<RawItem>> {
        let mut out = Vec::new();
        for line in stdout.lines() {
            if out.len() >= limit {
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let v: serde_json::Value =
                serde_json::from_str(line).context("parsing scraper jsonl line")?;

            let content = v["rawContent"]
                .as_str()
                .or_else(|| v["content"].as_str())
                .unwrap_or_default();
            let id = match &v["id"] {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => String::new(),
            };
            if id.is_empty() || content.is_empty() {
                continue;
            }

            let username = v["user"]["username"].as_str().unwrap_or_default();
            let date = v["date"].as_str().unwrap_or_default();

            out.push(
                RawItem::new(SourceKind::Scraper, id, content)
                    .with_attr("username", username)
                    .with_attr("date", date),
            );
        }
        if out.is_empty() {
            bail!("scraper produced no usable items");
        }
        counter!("acquire_items_parsed_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl Provider for ScraperProvider {
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawItem>> {
        let child = Command::new(&self.command)
            .arg("--jsonl")
            .arg("--max-results")
            .arg(limit.to_string())
            .arg("twitter-search")
            .arg(query)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("scraper binary `{}` not available", self.command))?;

        let output = tokio::time::timeout(SCRAPE_TIMEOUT, child.wait_with_output())
            .await
            .context("scraper timed out")?
            .context("waiting for scraper")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "scraper exited with {}: {}",
                output.status,
                stderr.lines().next().unwrap_or_default()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_jsonl(&stdout, limit)
    }

    fn name(&self) -> &'static str {
        "scraper"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Scraper
    }
}
