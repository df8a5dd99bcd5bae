// src/acquire/store.rs
//! Append-only, deduplicated persistence: one delimited-text table per
//! (keyword, source) pair, natural-key uniqueness enforced on load.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use metrics::counter;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::acquire::types::{RawItem, SourceKind};

const KEY_COLUMN: &str = "natural_key";
const CONTENT_COLUMN: &str = "content";

/// Persistent record store rooted at a cache directory.
///
/// Writers of the same store serialize on a per-store async mutex, so the
/// "load existing keys, append unseen" sequence is atomic with respect to
/// other writers. Different stores proceed independently.
pub struct DeduplicatedStore {
    root: PathBuf,
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DeduplicatedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    fn store_path(&self, keyword: &str, kind: SourceKind) -> PathBuf {
        self.root.join(format!("{}_{}.csv", slug(keyword), kind.as_str()))
    }

    fn lock_for(&self, store_file: &str) -> Arc<Mutex<()>> {
        let mut map = self.locks.lock().expect("store lock map poisoned");
        map.entry(store_file.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Append `items` whose natural key is not already present. Returns the
    /// number of newly written records. Records, once written, are never
    /// mutated; there is no expiry.
    ///
    /// The column set is fixed by the first batch ever written to a store:
    /// a later item carrying an attribute key absent from that header has
    /// that value dropped. Providers emit a stable attribute set per source
    /// kind, so in practice nothing is lost.
    pub async fn append(
        &self,
        keyword: &str,
        kind: SourceKind,
        items: &[RawItem],
    ) -> Result<usize> {
        let path = self.store_path(keyword, kind);
        let lock = self.lock_for(&path.to_string_lossy());
        let _guard = lock.lock().await;

        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating cache dir {}", self.root.display()))?;

        let (mut header, existing_keys) = match load_table(&path).await? {
            Some((header, rows)) => {
                let key_idx = column_index(&header, KEY_COLUMN)?;
                let keys: BTreeSet<String> =
                    rows.into_iter().filter_map(|r| r.get(key_idx).cloned()).collect();
                (header, keys)
            }
            None => (Vec::new(), BTreeSet::new()),
        };

        let fresh: Vec<&RawItem> = items
            .iter()
            .filter(|it| !existing_keys.contains(&it.natural_key))
            .collect();
        // Same key may repeat within one batch; keep the first occurrence.
        let mut batch_keys: BTreeSet<&str> = BTreeSet::new();
        let fresh: Vec<&RawItem> = fresh
            .into_iter()
            .filter(|it| batch_keys.insert(it.natural_key.as_str()))
            .collect();

        if fresh.is_empty() {
            return Ok(0);
        }

        let mut buf = String::new();
        if header.is_empty() {
            header = header_for_batch(&fresh);
            buf.push_str(&encode_row(&header));
            buf.push('\n');
        }
        for item in &fresh {
            let row: Vec<String> = header
                .iter()
                .map(|col| match col.as_str() {
                    KEY_COLUMN => item.natural_key.clone(),
                    CONTENT_COLUMN => item.content.clone(),
                    other => item.attributes.get(other).cloned().unwrap_or_default(),
                })
                .collect();
            buf.push_str(&encode_row(&row));
            buf.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("opening store {}", path.display()))?;
        file.write_all(buf.as_bytes())
            .await
            .with_context(|| format!("appending to {}", path.display()))?;

        counter!("store_records_written_total").increment(fresh.len() as u64);
        Ok(fresh.len())
    }

    /// Read every record of one (keyword, source) table. Missing table reads
    /// as empty.
    pub async fn read_all(&self, keyword: &str, kind: SourceKind) -> Result<Vec<RawItem>> {
        let path = self.store_path(keyword, kind);
        let lock = self.lock_for(&path.to_string_lossy());
        let _guard = lock.lock().await;

        let Some((header, rows)) = load_table(&path).await? else {
            return Ok(Vec::new());
        };
        let key_idx = column_index(&header, KEY_COLUMN)?;
        let content_idx = column_index(&header, CONTENT_COLUMN)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut item = RawItem::new(
                kind,
                row.get(key_idx).cloned().unwrap_or_default(),
                row.get(content_idx).cloned().unwrap_or_default(),
            );
            for (i, col) in header.iter().enumerate() {
                if i == key_idx || i == content_idx {
                    continue;
                }
                if let Some(v) = row.get(i) {
                    if !v.is_empty() {
                        item.attributes.insert(col.clone(), v.clone());
                    }
                }
            }
            out.push(item);
        }
        Ok(out)
    }

    /// Cached history for one keyword across every source, in fallback
    /// priority order. Used when the live chain is exhausted.
    pub async fn read_all_for_keyword(&self, keyword: &str) -> Result<Vec<RawItem>> {
        let mut out = Vec::new();
        for kind in SourceKind::all() {
            out.extend(self.read_all(keyword, kind).await?);
        }
        Ok(out)
    }
}

/// File-name slug for a keyword: alphanumerics kept, everything else `_`.
fn slug(keyword: &str) -> String {
    keyword
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

fn header_for_batch(items: &[&RawItem]) -> Vec<String> {
    let mut attr_cols: BTreeSet<String> = BTreeSet::new();
    for item in items {
        attr_cols.extend(item.attributes.keys().cloned());
    }
    let mut header = vec![KEY_COLUMN.to_string(), CONTENT_COLUMN.to_string()];
    header.extend(attr_cols);
    header
}

fn column_index(header: &[String], name: &str) -> Result<usize> {
    header
        .iter()
        .position(|c| c == name)
        .with_context(|| format!("store header missing `{name}` column"))
}

async fn load_table(path: &Path) -> Result<Option<(Vec<String>, Vec<Vec<String>>)>> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("reading store {}", path.display()));
        }
    };
    let mut lines = raw.lines();
    let Some(header_line) = lines.next() else {
        return Ok(None);
    };
    let header = decode_row(header_line);
    let rows = lines
        .filter(|l| !l.is_empty())
        .map(decode_row)
        .collect();
    Ok(Some((header, rows)))
}

/// Encode one comma-delimited row. Embedded newlines are flattened to spaces
/// so the table stays strictly line-oriented; commas and quotes get standard
/// double-quote escaping.
fn encode_row(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| encode_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

fn encode_field(field: &str) -> String {
    let flat = field.replace(['\n', '\r'], " ");
    if flat.contains(',') || flat.contains('"') {
        format!("\"{}\"", flat.replace('"', "\"\""))
    } else {
        flat
    }
}

fn decode_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    cur.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                cur.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut cur)),
                _ => cur.push(c),
            }
        }
    }
    fields.push(cur);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_roundtrip_with_commas_and_quotes() {
        let fields = vec![
            "1234".to_string(),
            "he said \"buy, now\"".to_string(),
            "plain".to_string(),
        ];
        let line = encode_row(&fields);
        assert_eq!(decode_row(&line), fields);
    }

    #[test]
    fn newlines_are_flattened_on_write() {
        let line = encode_field("two\nlines");
        assert_eq!(line, "two lines");
    }

    #[test]
    fn slug_is_filesystem_safe() {
        assert_eq!(slug("stock market"), "stock_market");
        assert_eq!(slug("S&P 500"), "s_p_500");
    }
}
