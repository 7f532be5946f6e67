mod support;

use std::collections::HashSet;

use chorus::cache::PageCacheConfig;
use metrics_util::debugging::DebuggingRecorder;
use support::TestApp;

#[tokio::test]
async fn page_cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let app = TestApp::with_cache(PageCacheConfig::default());
    app.get("/", None).await;
    app.get("/", None).await;
    app.admin_post("/cache/flush").await;
    app.get("/about/tech/", None).await;

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "chorus_page_cache_hit_total",
        "chorus_page_cache_miss_total",
        "chorus_page_cache_flush_total",
        "chorus_http_request_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
