// tests/dispatcher_tests.rs
mod common;

use common::{count, ScriptedClient};
use serde_json::json;
use hyper::header::{HeaderName, HeaderValue};
use std::sync::Arc;
use turdus::config::LoadBalancerAlgorithm;
use turdus::load_balancer::SchedulingMode;
use turdus::metrics::MetricsRegistry;
use turdus::proxy::{Dispatcher, EndpointList, EndpointRecord, Registry, ReqwestClient, RequestSpec};
use turdus::DispatchError;

fn registry(algorithm: LoadBalancerAlgorithm) -> Registry {
    Registry::from_value(
        algorithm,
        &json!({
            "pigeon": [
                { "server": "10.0.0.1", "weight": 2 },
                { "server": "10.0.0.2", "weight": 1 },
            ],
            "sparrow": [
                { "server": "10.0.1.1", "weight": 1 },
                { "server": "10.0.1.2", "weight": 3 },
            ],
        }),
    )
    .unwrap()
}

#[tokio::test]
async fn test_fallback_answers_failed_request() {
    let client = ScriptedClient::new().reply("/x", 400, "bad request").into_arc();
    let dispatcher = Dispatcher::new(registry(LoadBalancerAlgorithm::WeightedRoundRobin), client);
    dispatcher.fake_positive_res("pigeon", [("/x", "fallback-body")]);

    let response = dispatcher.request("pigeon", RequestSpec::get("/x")).await.unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "fallback-body");
    assert_eq!(response.host, None);
}

#[tokio::test]
async fn test_failure_without_fallback_carries_upstream_body() {
    let client = ScriptedClient::new()
        .reply("/x", 400, "bad request")
        .reply("/y", 400, "upstream says no")
        .into_arc();
    let dispatcher = Dispatcher::new(registry(LoadBalancerAlgorithm::WeightedRoundRobin), client);
    dispatcher.fake_positive_res("pigeon", [("/x", "fallback-body")]);

    let err = dispatcher
        .request("pigeon", RequestSpec::get("/y"))
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::RequestFailed("upstream says no".into()));
    assert_eq!(err.to_string(), "Error occured during request: upstream says no");
}

#[tokio::test]
async fn test_fallbacks_are_per_application() {
    let client = ScriptedClient::new().reply("/x", 500, "boom").into_arc();
    let dispatcher = Dispatcher::new(registry(LoadBalancerAlgorithm::WeightedRoundRobin), client);
    dispatcher.register_fallback("pigeon", "/x", "pigeon-fallback");

    assert!(dispatcher.request("pigeon", RequestSpec::get("/x")).await.is_ok());
    assert!(matches!(
        dispatcher.request("sparrow", RequestSpec::get("/x")).await,
        Err(DispatchError::RequestFailed(_))
    ));
}

#[tokio::test]
async fn test_any_status_above_200_is_a_failure() {
    let client = ScriptedClient::new()
        .reply("/created", 201, "created")
        .reply("/moved", 301, "moved")
        .into_arc();
    let dispatcher = Dispatcher::new(registry(LoadBalancerAlgorithm::WeightedRoundRobin), client);
    dispatcher.register_fallback("pigeon", "/created", "substitute");

    let response = dispatcher
        .request("pigeon", RequestSpec::get("/created"))
        .await
        .unwrap();
    assert_eq!(response.body, "substitute");

    assert_eq!(
        dispatcher.request("pigeon", RequestSpec::get("/moved")).await,
        Err(DispatchError::RequestFailed("moved".into()))
    );
}

#[tokio::test]
async fn test_transport_error_uses_fallback_or_surfaces_cause() {
    let client = ScriptedClient::new().unreachable("/down").into_arc();
    let dispatcher = Dispatcher::new(registry(LoadBalancerAlgorithm::WeightedRoundRobin), client);

    match dispatcher.request("pigeon", RequestSpec::get("/down")).await {
        Err(DispatchError::RequestFailed(cause)) => assert!(cause.contains("ECONNREFUSED")),
        other => panic!("expected RequestFailed, got {:?}", other),
    }

    dispatcher.register_fallback("pigeon", "/down", "cached");
    let response = dispatcher.request("pigeon", RequestSpec::get("/down")).await.unwrap();
    assert_eq!(response.body, "cached");
}

#[tokio::test]
async fn test_fallback_registration_overwrites() {
    let client = ScriptedClient::new().reply("/x", 503, "").into_arc();
    let dispatcher = Dispatcher::new(registry(LoadBalancerAlgorithm::WeightedRoundRobin), client);
    dispatcher.register_fallback("pigeon", "/x", "first");
    dispatcher.fake_positive_res("pigeon", [("/x", "second")]);
    assert_eq!(
        dispatcher.fallbacks().lookup("pigeon", "/x").as_deref(),
        Some("second")
    );

    let response = dispatcher.request("pigeon", RequestSpec::get("/x")).await.unwrap();
    assert_eq!(response.body, "second");
}

#[tokio::test]
async fn test_unknown_application() {
    let client = ScriptedClient::new().into_arc();
    let dispatcher = Dispatcher::new(
        registry(LoadBalancerAlgorithm::WeightedRoundRobin),
        client.clone(),
    );
    dispatcher.register_fallback("crow", "/x", "never served");

    assert_eq!(
        dispatcher.request("crow", RequestSpec::get("/x")).await,
        Err(DispatchError::UnknownApplication("crow".into()))
    );
    assert!(client.sent().is_empty());
}

#[tokio::test]
async fn test_request_is_forwarded_unchanged() {
    let client = ScriptedClient::new().into_arc();
    let dispatcher = Dispatcher::new(
        registry(LoadBalancerAlgorithm::WeightedRoundRobin),
        client.clone(),
    );

    let spec = RequestSpec::post("/cat-birds?k=v")
        .with_json(&json!({ "yy": 6 }))
        .with_header(
            HeaderName::from_static("x-request-source"),
            HeaderValue::from_static("test"),
        );
    dispatcher.request("pigeon", spec).await.unwrap();

    let sent = client.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url.as_str(), "http://10.0.0.1/cat-birds?k=v");
    assert_eq!(sent[0].method, hyper::Method::POST);
    assert_eq!(sent[0].body.as_deref(), Some(&br#"{"yy":6}"#[..]));
    assert!(sent[0].json);
    assert_eq!(sent[0].headers["x-request-source"], "test");
}

#[tokio::test]
async fn test_upsert_resets_one_app_and_leaves_others() {
    let dispatcher = Dispatcher::new(
        registry(LoadBalancerAlgorithm::SmoothWeightedRoundRobin),
        ScriptedClient::new().into_arc(),
    );

    // Move both apps off their initial state.
    let mut sparrow = Vec::new();
    for _ in 0..2 {
        dispatcher.request("pigeon", RequestSpec::get("/")).await.unwrap();
        sparrow.push(dispatcher.request("sparrow", RequestSpec::get("/")).await.unwrap().host.unwrap());
    }

    dispatcher
        .upsert_endpoints(&json!({
            "pigeon": [
                { "server": "10.0.2.1", "weight": 1 },
                { "server": "10.0.2.2", "weight": 1 },
            ]
        }))
        .unwrap();

    // A fresh smooth pool with equal weights starts at the first endpoint.
    let mut pigeon = Vec::new();
    for _ in 0..4 {
        pigeon.push(dispatcher.request("pigeon", RequestSpec::get("/")).await.unwrap().host.unwrap());
    }
    assert_eq!(pigeon, vec!["10.0.2.1", "10.0.2.2", "10.0.2.1", "10.0.2.2"]);

    // sparrow carries on from where it was: one full cycle of 4 in total.
    for _ in 0..2 {
        sparrow.push(dispatcher.request("sparrow", RequestSpec::get("/")).await.unwrap().host.unwrap());
    }
    assert_eq!(count(&sparrow, "10.0.1.1"), 1);
    assert_eq!(count(&sparrow, "10.0.1.2"), 3);
}

#[tokio::test]
async fn test_upsert_can_add_and_change_mode() {
    let dispatcher = Dispatcher::new(
        registry(LoadBalancerAlgorithm::WeightedRoundRobin),
        ScriptedClient::new().into_arc(),
    );

    dispatcher
        .upsert([
            (
                "pigeon".to_string(),
                EndpointList::from_servers(["10.0.3.1", "10.0.3.2"]).unwrap(),
            ),
            (
                "crow".to_string(),
                EndpointList::from_weighted(vec![EndpointRecord::new("10.0.4.1", 4)]).unwrap(),
            ),
        ])
        .unwrap();

    let registry = dispatcher.registry();
    assert_eq!(registry.applications(), vec!["crow", "pigeon", "sparrow"]);
    assert_eq!(registry.mode("pigeon").await.unwrap(), SchedulingMode::Raw);
    assert_eq!(registry.mode("crow").await.unwrap(), SchedulingMode::ClassicWeighted);
    assert_eq!(registry.mode("sparrow").await.unwrap(), SchedulingMode::ClassicWeighted);
}

#[test]
fn test_construction_rejects_bad_input() {
    for value in [json!([]), json!([42]), json!([null]), json!({ "pigeon": [] })] {
        assert!(matches!(
            Registry::from_value(LoadBalancerAlgorithm::WeightedRoundRobin, &value),
            Err(DispatchError::InvalidInput(_))
        ));
    }
}

#[tokio::test]
async fn test_metrics_record_outcomes() {
    let metrics_registry = MetricsRegistry::new().unwrap();
    let metrics = metrics_registry.collector();
    let client = ScriptedClient::new()
        .reply("/x", 400, "nope")
        .reply("/y", 400, "nope")
        .into_arc();
    let dispatcher = Dispatcher::new(registry(LoadBalancerAlgorithm::WeightedRoundRobin), client)
        .with_metrics(metrics.clone());
    dispatcher.register_fallback("pigeon", "/x", "ok");

    dispatcher.request("pigeon", RequestSpec::get("/")).await.unwrap();
    dispatcher.request("pigeon", RequestSpec::get("/x")).await.unwrap();
    assert!(dispatcher.request("pigeon", RequestSpec::get("/y")).await.is_err());

    for outcome in ["success", "fallback", "failure"] {
        assert_eq!(
            metrics.requests_total.with_label_values(&["pigeon", outcome]).get(),
            1
        );
    }
    assert_eq!(
        metrics.fallback_responses_total.with_label_values(&["pigeon", "/x"]).get(),
        1
    );
    assert_eq!(
        metrics.endpoint_picks_total.with_label_values(&["pigeon", "10.0.0.1"]).get(),
        2
    );
}

#[tokio::test]
async fn test_reqwest_client_against_live_server() {
    let mut server = mockito::Server::new_async().await;
    let ok = server
        .mock("POST", "/cat-birds")
        .match_header("content-type", "application/json")
        .match_body(mockito::Matcher::Json(json!({ "yy": 6 })))
        .with_status(200)
        .with_body("hello world")
        .create_async()
        .await;
    let rejected = server
        .mock("GET", "/y")
        .with_status(400)
        .with_body("upstream body")
        .create_async()
        .await;

    let host = server.host_with_port();
    let registry = Registry::new(
        LoadBalancerAlgorithm::WeightedRoundRobin,
        [("pigeon".to_string(), EndpointList::from_servers([host.clone()]).unwrap())],
    )
    .unwrap();
    let client = Arc::new(ReqwestClient::new(std::time::Duration::from_secs(5)).unwrap());
    let dispatcher = Dispatcher::new(registry, client);

    let response = dispatcher
        .request(
            "pigeon",
            RequestSpec::post("/cat-birds").with_json(&json!({ "yy": 6 })),
        )
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "hello world");
    assert_eq!(response.host.as_deref(), Some(host.as_str()));

    let err = dispatcher
        .request("pigeon", RequestSpec::get("/y"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Error occured during request: upstream body");

    ok.assert_async().await;
    rejected.assert_async().await;
}
