use std::collections::HashMap;
use std::sync::Mutex;

use rs_fullfeed::{Error, Extractor, FetchError, FetchedPage, Fetcher, MatchMode, RuleStore};

/// Serves pages from memory and records every requested URL.
#[derive(Default)]
struct MemoryFetcher {
    pages: HashMap<String, FetchedPage>,
    requested: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    fn with_page(mut self, url: &str, body: &[u8], content_type: Option<&str>) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                body: body.to_vec(),
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("lock").clone()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.requested.lock().expect("lock").push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

fn fixture() -> String {
    format!("{}/tests/fixtures/items.json", env!("CARGO_MANIFEST_DIR"))
}

fn extractor(fetcher: MemoryFetcher) -> Extractor<MemoryFetcher> {
    let store = RuleStore::from_path(fixture(), MatchMode::Linear).expect("fixture loads");
    Extractor::new(store, fetcher)
}

#[test]
fn unmatched_url_returns_none_without_fetching() {
    let extractor = extractor(MemoryFetcher::default());
    let content = extractor.extract_url("http://unknown.org/page").expect("no error");
    assert!(content.is_none());
    assert!(extractor.fetcher().requested().is_empty());
}

#[test]
fn matched_url_is_fetched_decoded_and_extracted() {
    let url = "http://in.news.yahoo.com/article/1";
    // windows-1252 body declared through a <meta> tag only
    let body = b"<html><head><meta charset=\"windows-1252\"></head>\
        <body><div id=\"storybody\"> Caf\xE9 news </div></body></html>";
    let extractor = extractor(MemoryFetcher::default().with_page(url, body, Some("text/html")));

    let content = extractor.extract_url(url).expect("extracts").expect("rule matches");
    assert_eq!(content.text, "Café news");
    assert_eq!(extractor.fetcher().requested(), [url]);
}

#[test]
fn fetch_failure_is_propagated() {
    let extractor = extractor(MemoryFetcher::default());
    let err = extractor
        .extract_url("https://blog.example.com/missing")
        .expect_err("404");
    assert!(matches!(err, Error::Fetch(FetchError::Status { status: 404, .. })));
}

#[test]
fn extract_html_uses_the_matching_rule() {
    let extractor = extractor(MemoryFetcher::default());
    let html = r#"<div class="entry-body"><p>One</p><p>Two</p></div><article>All</article>"#;

    let blog = extractor.extract_html(html, "https://blog.example.com/post").expect("extracts");
    assert_eq!(blog.map(|c| c.text).as_deref(), Some("OneTwo"));

    let other = extractor.extract_html(html, "https://www.example.com/post").expect("extracts");
    assert_eq!(other.map(|c| c.text).as_deref(), Some("All"));

    let none = extractor.extract_html(html, "https://example.org/").expect("no error");
    assert!(none.is_none());
}

#[test]
fn extract_reader_does_not_read_when_nothing_matches() {
    let extractor = extractor(MemoryFetcher::default());
    // Invalid UTF-8 would fail if it were read.
    let bytes: &[u8] = b"\xFF\xFF";
    assert!(extractor.extract_reader(bytes, "https://example.org/").expect("no error").is_none());
}

#[test]
fn reload_swaps_the_table_and_failed_reload_keeps_it() {
    let extractor = extractor(MemoryFetcher::default());
    assert!(extractor.matches("http://in.news.yahoo.com/").is_some());

    let dir = std::env::temp_dir().join(format!("rs-fullfeed-reload-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("items.json");
    std::fs::write(&path, r#"[{"name": "only", "data": {"url": "example\\.org", "xpath": "//p"}}]"#)
        .expect("write rules");

    let report = extractor.reload(&path).expect("reloads");
    assert_eq!(report.installed, 1);
    assert!(extractor.matches("http://in.news.yahoo.com/").is_none());
    assert_eq!(extractor.matches("http://example.org/").map(|r| r.name().to_string()).as_deref(), Some("only"));

    assert!(extractor.reload(dir.join("missing.json")).is_err());
    assert_eq!(extractor.store().len(), 1);

    std::fs::remove_dir_all(&dir).ok();
}
