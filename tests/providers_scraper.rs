// tests/providers_scraper.rs
use sentiment_harvester::acquire::providers::scraper::ScraperProvider;
use sentiment_harvester::{Provider, SourceKind};

const JSONL: &str = r#"{"id": 1780000000000000001, "rawContent": "Dow futures up 0.8% premarket", "date": "2024-05-01T09:00:00Z", "user": {"username": "premkt"}}
{"id": "1780000000000000002", "content": "CPI print tomorrow", "date": "2024-05-01T09:05:00Z", "user": {"username": "macro_sam"}}
{"date": "2024-05-01T09:06:00Z", "user": {"username": "no_id_here"}}
"#;

#[test]
fn jsonl_lines_map_to_items() {
    let items = ScraperProvider::parse_jsonl(JSONL, 10).unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].source_kind, SourceKind::Scraper);
    assert_eq!(items[0].natural_key, "1780000000000000001");
    assert_eq!(items[0].content, "Dow futures up 0.8% premarket");
    assert_eq!(
        items[0].attributes.get("username").map(String::as_str),
        Some("premkt")
    );

    // String ids and the `content` spelling are accepted too.
    assert_eq!(items[1].natural_key, "1780000000000000002");
    assert_eq!(items[1].content, "CPI print tomorrow");
}

#[test]
fn limit_caps_parsed_lines() {
    let items = ScraperProvider::parse_jsonl(JSONL, 1).unwrap();
    assert_eq!(items.len(), 1);
}

#[test]
fn garbage_line_is_an_error() {
    assert!(ScraperProvider::parse_jsonl("this is not json\n", 10).is_err());
}

#[test]
fn empty_output_is_an_error() {
    assert!(ScraperProvider::parse_jsonl("", 10).is_err());
}

#[tokio::test]
async fn missing_binary_is_a_capability_failure() {
    // The scraper tool is an optional runtime dependency; its absence must
    // surface as an ordinary failure so the chain can fall through.
    let provider = ScraperProvider::new("definitely-not-installed-scraper-tool");
    let err = provider.fetch("stocks", 5).await.unwrap_err();
    assert!(err.to_string().contains("not available"));
}
