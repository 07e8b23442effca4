//! Fetch cache directive diagnostics through the runtime.

use std::sync::Arc;

use edge_sdk::prelude::*;

const URL: &str = "https://api.example.com/products";

const FORCE_CACHE_ZERO: &str =
    r#"Specified "cache: force-cache" and "revalidate: 0", only one should be specified."#;

fn runtime(mode: RuntimeMode) -> (EdgeRuntime, Arc<MemorySink>, MemoryFetcher) {
    let sink = Arc::new(MemorySink::new());
    let fetcher = MemoryFetcher::new().route(URL, FetchResponse::new(200, "[]"));
    let runtime = EdgeRuntime::new(RuntimeConfig::default().with_mode(mode), Arc::new(fetcher.clone()))
        .with_log_sink(sink.clone());
    (runtime, sink, fetcher)
}

fn request(render_mode: RouteRenderMode) -> RequestContext {
    RequestContext::new(Method::GET, "/products").with_render_mode(render_mode)
}

#[tokio::test]
async fn test_force_cache_zero_warns_once_per_url_in_development() {
    let (runtime, sink, _) = runtime(RuntimeMode::Development);
    let scope = runtime.begin(request(RouteRenderMode::Static));
    let options = FetchOptions::new().cache(CacheMode::ForceCache).revalidate(0);

    scope.fetch(FetchInput::url_with(URL, options.clone())).await.unwrap();
    scope.fetch(FetchInput::url_with(URL, options.clone())).await.unwrap();
    scope
        .fetch(FetchInput::url_with("https://api.example.com/other", options))
        .await
        .unwrap();

    assert_eq!(sink.count(FORCE_CACHE_ZERO), 2);
    assert!(sink.contains(&format!(" │ GET {}\n │ │ ⚠ {}", URL, FORCE_CACHE_ZERO)));
    assert!(sink.contains(" │ │ ⚠ "));
}

#[tokio::test]
async fn test_force_cache_zero_is_silent_in_production() {
    let (runtime, sink, fetcher) = runtime(RuntimeMode::Production);
    let scope = runtime.begin(request(RouteRenderMode::Static));

    scope
        .fetch(FetchInput::url_with(
            URL,
            FetchOptions::new().cache(CacheMode::ForceCache).revalidate(0),
        ))
        .await
        .unwrap();

    assert!(!sink.contains(FORCE_CACHE_ZERO));
    assert!(!sink.contains("⚠"));
    assert!(!sink.contains(" │ GET"));

    // The conflict is still resolved the same way.
    let calls = fetcher.calls();
    assert!(calls[0].plan.cached);
    assert_eq!(calls[0].plan.ttl_seconds, None);
}

#[tokio::test]
async fn test_no_store_message_interpolates_revalidate() {
    let (runtime, sink, _) = runtime(RuntimeMode::Development);
    let scope = runtime.begin(request(RouteRenderMode::Static));

    scope
        .fetch(FetchInput::url_with(
            URL,
            FetchOptions::new().cache(CacheMode::NoStore).revalidate(3),
        ))
        .await
        .unwrap();

    assert!(sink.contains(
        r#"Specified "cache: no-store" and "revalidate: 3", only one should be specified."#
    ));
    assert_eq!(sink.count("⚠"), 1);
}

#[tokio::test]
async fn test_revalidate_on_force_dynamic_route_warns() {
    let (runtime, sink, fetcher) = runtime(RuntimeMode::Development);
    let scope = runtime.begin(request(RouteRenderMode::ForceDynamic));

    scope
        .fetch(FetchInput::url_with(URL, FetchOptions::new().revalidate(3)))
        .await
        .unwrap();

    assert!(sink.contains(
        r#"Specified "dynamic: 'force-dynamic'" and "revalidate: 3" without explicitly caching the fetch. This fetch will be treated as an uncached fetch."#
    ));
    assert!(!fetcher.calls()[0].plan.cached);
}

#[tokio::test]
async fn test_revalidate_on_static_route_is_silent() {
    let (runtime, sink, fetcher) = runtime(RuntimeMode::Development);
    let scope = runtime.begin(request(RouteRenderMode::Static));

    scope
        .fetch(FetchInput::url_with(URL, FetchOptions::new().revalidate(3)))
        .await
        .unwrap();

    assert!(!sink.contains("⚠"));
    assert_eq!(fetcher.calls()[0].plan, EffectiveCachePlan::for_seconds(3));
}

#[tokio::test]
async fn test_revalidate_only_never_warns() {
    for render_mode in [RouteRenderMode::Static, RouteRenderMode::Dynamic] {
        let (runtime, sink, _) = runtime(RuntimeMode::Development);
        let scope = runtime.begin(request(render_mode));

        scope
            .fetch(FetchInput::url_with(URL, FetchOptions::new().revalidate(60)))
            .await
            .unwrap();

        assert!(!sink.contains("⚠"), "warned on {} route", render_mode);
    }
}

#[tokio::test]
async fn test_request_like_messages_match_plain_input() {
    let (plain_runtime, plain_sink, _) = runtime(RuntimeMode::Development);
    let scope = plain_runtime.begin(request(RouteRenderMode::Static));
    scope
        .fetch(FetchInput::url_with(
            URL,
            FetchOptions::new().cache(CacheMode::NoStore).revalidate(3),
        ))
        .await
        .unwrap();

    let (wrapped_runtime, wrapped_sink, _) = runtime(RuntimeMode::Development);
    let scope = wrapped_runtime.begin(request(RouteRenderMode::Static));
    scope
        .fetch(FetchInput::request_with(
            RequestLike::new(URL).with_cache(CacheMode::NoStore),
            FetchOptions::new().revalidate(3),
        ))
        .await
        .unwrap();

    let warnings = |sink: &MemorySink| -> Vec<String> {
        sink.lines()
            .into_iter()
            .filter(|line| line.starts_with(" │"))
            .collect()
    };
    assert!(!warnings(&plain_sink).is_empty());
    assert_eq!(warnings(&plain_sink), warnings(&wrapped_sink));
}

#[tokio::test]
async fn test_dedup_is_per_request() {
    let (runtime, sink, _) = runtime(RuntimeMode::Development);
    let options = FetchOptions::new().cache(CacheMode::ForceCache).revalidate(0);

    for _ in 0..2 {
        let scope = runtime.begin(request(RouteRenderMode::Static));
        scope.fetch(FetchInput::url_with(URL, options.clone())).await.unwrap();
        scope.fetch(FetchInput::url_with(URL, options.clone())).await.unwrap();
    }

    assert_eq!(sink.count(FORCE_CACHE_ZERO), 2);
}

#[tokio::test]
async fn test_malformed_input_fails_only_that_call() {
    let (runtime, sink, _) = runtime(RuntimeMode::Development);
    let scope = runtime.begin(request(RouteRenderMode::Static));

    let err = scope.fetch("not a url").await.unwrap_err();
    assert!(matches!(err, FetchError::Input(DirectiveError::InvalidUrl { .. })));

    scope
        .fetch(FetchInput::url_with(
            URL,
            FetchOptions::new().cache(CacheMode::ForceCache).revalidate(0),
        ))
        .await
        .unwrap();
    assert!(sink.contains(FORCE_CACHE_ZERO));
}
