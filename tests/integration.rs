use httpmock::{Method::GET, MockServer};
use marketplace_access::{
    ApiClient, Config, Credential, ErrorKind, Quota, RequestSpec, RetryPolicy, ServiceFamily,
};
use std::time::{Duration, Instant};

/// Every family on the mock server with token `t`, roomy quotas and short backoff.
fn config_for(server: &MockServer) -> Config {
    let mut cfg = Config::with_base_url(&server.base_url(), "t").unwrap();
    for family in ServiceFamily::ALL {
        cfg.family_mut(family).quota = Quota::new(100, Duration::from_secs(1));
    }
    cfg.backoff_base_ms = 20;
    cfg.backoff_max_ms = 200;
    cfg.max_attempts = 3;
    cfg.timeout_secs = 5;
    cfg
}

fn client_for(cfg: &Config) -> ApiClient {
    ApiClient::from_config(cfg).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn signed_token_is_sent_as_bearer() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/feedbacks/count-unanswered")
                .header("authorization", "Bearer t");
            then.status(200)
                .json_body(serde_json::json!({"data": {"countUnanswered": 2, "countUnansweredToday": 0, "valuation": "4.9"}}));
        })
        .await;
    let client = client_for(&config_for(&server));
    let count = client.feedbacks().unanswered_count().await.unwrap();
    assert_eq!(count.count_unanswered, 2);
    m.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn legacy_token_is_sent_verbatim() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/supplier/stocks")
                .header("authorization", "legacy-abc");
            then.status(200).json_body(serde_json::json!([]));
        })
        .await;
    let mut cfg = config_for(&server);
    cfg.family_mut(ServiceFamily::Statistics).credential = Some(Credential::legacy("legacy-abc"));
    let stocks = client_for(&cfg)
        .statistics()
        .stocks(chrono::Utc::now())
        .await
        .unwrap();
    assert!(stocks.is_empty());
    m.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_token_fails_before_any_request() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.any_request();
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;
    let mut cfg = config_for(&server);
    cfg.family_mut(ServiceFamily::Ads).credential = None;
    let err = client_for(&cfg)
        .ads()
        .create_campaign("x", &[1])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthConfig);
    assert_eq!(m.hits_async().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn validation_error_is_returned_after_one_hit() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/supplier/orders");
            then.status(400).json_body(serde_json::json!({
                "error": true,
                "errorText": "Invalid dateFrom",
                "additionalErrors": null,
                "requestId": "req-17"
            }));
        })
        .await;
    let err = client_for(&config_for(&server))
        .statistics()
        .orders(chrono::Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.message, "Invalid dateFrom");
    assert_eq!(err.request_id.as_deref(), Some("req-17"));
    assert_eq!(m.hits_async().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_retry_up_to_the_ceiling() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/orders/new");
            then.status(503).body("upstream unavailable");
        })
        .await;
    let err = client_for(&config_for(&server))
        .marketplace()
        .new_orders()
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServerTransient);
    assert_eq!(err.http_status, Some(503));
    assert_eq!(err.message, "upstream unavailable");
    assert_eq!(m.hits_async().await, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_after_is_honoured_between_calls() {
    let server = MockServer::start_async().await;
    let limited = server
        .mock_async(|when, then| {
            when.method(GET).path("/adv/v1/promotion/count");
            then.status(429)
                .header("retry-after", "2")
                .json_body(serde_json::json!({"error": true, "errorText": "too many requests"}));
        })
        .await;

    let client = client_for(&config_for(&server));
    let started = Instant::now();
    let call = tokio::spawn(async move {
        client
            .perform_json::<serde_json::Value>(&RequestSpec::get(
                ServiceFamily::Ads,
                "/adv/v1/promotion/count",
            ))
            .await
    });

    while limited.hits_async().await == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    limited.delete_async().await;
    let ok = server
        .mock_async(|when, then| {
            when.method(GET).path("/adv/v1/promotion/count");
            then.status(200).json_body(serde_json::json!({"all": 3}));
        })
        .await;

    let value = call.await.unwrap().unwrap();
    assert_eq!(value["all"], 3);
    assert!(started.elapsed() >= Duration::from_secs(2), "{:?}", started.elapsed());
    assert_eq!(ok.hits_async().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_success_is_a_decode_error() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/feedbacks/count-unanswered");
            then.status(200)
                .header("x-request-id", "dec-1")
                .body("<html>maintenance</html>");
        })
        .await;
    let err = client_for(&config_for(&server))
        .feedbacks()
        .unanswered_count()
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Decode);
    assert_eq!(err.request_id.as_deref(), Some("dec-1"));
    assert_eq!(m.hits_async().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn feedbacks_page_over_http() {
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/feedbacks")
                .query_param("skip", "0")
                .query_param("take", "2");
            then.status(200).json_body(serde_json::json!({
                "data": {"feedbacks": [{"id": "a"}, {"id": "b"}]}, "error": false, "errorText": ""
            }));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/feedbacks").query_param("skip", "2");
            then.status(200).json_body(serde_json::json!({
                "data": {"feedbacks": [{"id": "c"}]}, "error": false, "errorText": ""
            }));
        })
        .await;
    let items = client_for(&config_for(&server))
        .feedbacks()
        .list_feedbacks(false, 2)
        .collect_all()
        .await
        .unwrap();
    let ids: Vec<&str> = items.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(first.hits_async().await, 1);
    assert_eq!(second.hits_async().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn custom_policy_limits_attempts() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/supplier/stocks");
            then.status(502);
        })
        .await;
    let client = client_for(&config_for(&server)).with_policy(
        RetryPolicy::default()
            .with_max_attempts(2)
            .with_base_delay(Duration::from_millis(5)),
    );
    let err = client.statistics().stocks(chrono::Utc::now()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServerTransient);
    assert_eq!(m.hits_async().await, 2);
}
