//! Performance benchmarks for rs-fullfeed.
//!
//! Run with: `cargo bench`
//!
//! Benchmarks include:
//! - Rule lookup over a large synthetic table, linear scan against `RegexSet`
//! - Body extraction from a ~1KB page with a few typical rule queries

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rs_fullfeed::{dom, extract_document, extract_html, MatchMode, Rule, RuleData, RuleRecord, RuleStore};

const SAMPLE_HTML: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Sample Article</title>
</head>
<body>
    <nav>
        <a href="/">Home</a>
        <a href="/about">About</a>
    </nav>
    <div id="main">
        <div class="entry">
            <h1>Sample Article Title</h1>
            <div class="entry-body">
                <p>This is the first paragraph of the article. It contains some meaningful
                content that a site rule should pull out.</p>
                <p>Here is a second paragraph with more content.</p>
                <p>A third paragraph ensures we have enough content for meaningful
                benchmarking of the extraction performance.</p>
            </div>
        </div>
    </div>
    <footer>
        <p>Copyright 2024</p>
    </footer>
</body>
</html>
"#;

/// Rule table shaped like the public LDRFullFeed dump: many host-anchored
/// patterns, the interesting one near the end.
fn rule_table(size: usize) -> String {
    let mut records: Vec<String> = (0..size)
        .map(|i| {
            format!(
                r#"{{"name": "site {i}", "data": {{"url": "^https?://(www\\.)?site{i}\\.example\\.com/(news|blog)/", "xpath": "//div[@id='body{i}']"}}}}"#
            )
        })
        .collect();
    records.push(
        r#"{"name": "target", "data": {"url": "^https?://target\\.example\\.org/", "xpath": "//div[@class='entry-body']"}}"#
            .to_string(),
    );
    format!("[{}]", records.join(","))
}

fn rule(xpath: &str) -> Rule {
    Rule::compile(RuleRecord {
        data: RuleData {
            url: "example".to_string(),
            xpath: xpath.to_string(),
            ..RuleData::default()
        },
        ..RuleRecord::default()
    })
    .expect("valid rule")
}

fn bench_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("match");

    for size in [100, 1000] {
        let json = rule_table(size);
        for mode in [MatchMode::Linear, MatchMode::Indexed] {
            let store = RuleStore::from_json(&json, mode).expect("rules load");
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}"), size),
                &store,
                |b, store| {
                    b.iter(|| store.find(black_box("https://target.example.org/2024/01/post")));
                },
            );
        }
    }

    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let json = rule_table(1000);
    c.bench_function("load_1000_rules", |b| {
        b.iter(|| RuleStore::from_json(black_box(&json), MatchMode::Linear));
    });
}

fn bench_extract(c: &mut Criterion) {
    let queries = [
        "//div[@class='entry-body']",
        "//div[@id='main']//p",
        "id('main')/div[contains(concat(' ', normalize-space(@class), ' '), ' entry ')]//p[position() < 3]",
    ];

    let mut group = c.benchmark_group("extract");
    group.throughput(Throughput::Bytes(SAMPLE_HTML.len() as u64));

    for query in queries {
        let rule = rule(query);
        group.bench_with_input(BenchmarkId::new("parse+query", query), &rule, |b, rule| {
            b.iter(|| extract_html(black_box(SAMPLE_HTML), rule));
        });

        let document = dom::parse(SAMPLE_HTML);
        group.bench_with_input(BenchmarkId::new("query", query), &rule, |b, rule| {
            b.iter(|| extract_document(black_box(&document), rule));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_match, bench_load, bench_extract);
criterion_main!(benches);
