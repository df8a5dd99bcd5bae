// tests/providers_browser.rs
use sentiment_harvester::acquire::providers::browser::BrowserProvider;
use sentiment_harvester::{Provider, SourceKind};

const RENDERED: &str = r#"
<html><body>
<article data-testid="tweet">
  <a href="/trader_jane/status/1780000000000000001"><time datetime="2024-05-01T10:00:00Z">May 1</time></a>
  <div data-testid="tweetText">Dow &amp; S&amp;P both <b>green</b> today</div>
</article>
<article data-testid="tweet">
  <a href="/fedwatch/status/1780000000000000002"><time datetime="2024-05-01T10:05:00Z">May 1</time></a>
  <div class="tweet-content media-body">Minutes drop at 2pm</div>
</article>
<article data-testid="tweet">
  <a href="/ghost/status/1780000000000000003"></a>
  <div data-testid="tweetText"></div>
</article>
</body></html>
"#;

#[tokio::test]
async fn rendered_markup_maps_to_items() {
    let provider = BrowserProvider::from_fixture(RENDERED);
    let items = provider.fetch("stocks", 10).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].source_kind, SourceKind::Browser);
    assert_eq!(items[0].natural_key, "1780000000000000001");
    assert_eq!(items[0].content, "Dow & S&P both green today");
    assert_eq!(
        items[0].attributes.get("username").map(String::as_str),
        Some("trader_jane")
    );
    assert_eq!(
        items[0].attributes.get("date").map(String::as_str),
        Some("2024-05-01T10:00:00Z")
    );
    assert_eq!(
        items[0].attributes.get("url").map(String::as_str),
        Some("https://twitter.com/trader_jane/status/1780000000000000001")
    );

    assert_eq!(items[1].natural_key, "1780000000000000002");
    assert_eq!(items[1].content, "Minutes drop at 2pm");
}

#[tokio::test]
async fn limit_caps_extracted_items() {
    let provider = BrowserProvider::from_fixture(RENDERED);
    let items = provider.fetch("stocks", 1).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn markup_without_posts_is_an_error() {
    let provider = BrowserProvider::from_fixture("<html><body>rate limited</body></html>");
    assert!(provider.fetch("stocks", 10).await.is_err());
}

#[tokio::test]
async fn unconfigured_endpoint_is_a_capability_failure() {
    // No browser engine wired up: a normal failure outcome, not a crash.
    let provider = BrowserProvider::from_endpoint(None);
    let err = provider.fetch("stocks", 10).await.unwrap_err();
    assert!(err.to_string().contains("not configured"));
}
