mod common;

use axum::http::StatusCode;
use common::{build_test_context, request_json, request_no_body, BASE_CONFIG, TEST_API_KEY};
use serde_json::json;
use std::time::Duration;

const KEY: Option<&str> = Some(TEST_API_KEY);

#[tokio::test]
async fn health_is_public_and_reports_counts() {
    let ctx = build_test_context(Some(TEST_API_KEY)).expect("context should build");

    let (status, body, trace_id) = request_no_body(&ctx.app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["err_code"], 0);
    assert_eq!(body["data"]["channel_monitors"], 0);
    assert_eq!(body["data"]["tuner_monitors"], 0);
    assert!(body["data"]["version"].is_string());
    let trace_id = trace_id.expect("trace id header should be set");
    assert_eq!(body["trace_id"], trace_id.as_str());
}

#[tokio::test]
async fn protected_routes_require_api_key() {
    let ctx = build_test_context(Some(TEST_API_KEY)).expect("context should build");

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/api/monitors/channel", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["err_code"], 1002);

    let (status, _, _) =
        request_no_body(&ctx.app, "GET", "/api/monitors/channel", Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/api/monitors/channel", KEY).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 0);
    assert_eq!(body["data"]["limit"], 2);
}

#[tokio::test]
async fn routes_are_open_without_configured_key() {
    let ctx = build_test_context(None).expect("context should build");
    let (status, _, _) = request_no_body(&ctx.app, "GET", "/api/monitors/tuner", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_kind_is_bad_request() {
    let ctx = build_test_context(None).expect("context should build");
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/api/monitors/radio", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_code"], 1001);
}

#[tokio::test]
async fn channel_create_ingest_snapshot_flow() {
    let ctx = build_test_context(Some(TEST_API_KEY)).expect("context should build");

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/channel",
        KEY,
        Some(json!({"name": "news-hd", "rate": 0.05})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "news-hd");
    assert_eq!(body["data"]["state"], "running");
    assert!(body["data"]["analyzer"].is_u64());
    assert_eq!(body["data"]["config"]["rate"], 0.05);
    assert_eq!(body["data"]["config"]["method_comparison"], 3);

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", "/api/monitors/channel/news-hd", KEY).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["snapshot"].is_null());

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/api/ingest/channel/news-hd",
        KEY,
        Some(json!({"type": "total", "total": {"bitrate": 4200}, "on_air": true})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", "/api/monitors/channel/news-hd", KEY).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot = &body["data"]["snapshot"];
    assert_eq!(snapshot["channel"], "news-hd");
    assert_eq!(snapshot["ready"], true);
    assert_eq!(snapshot["bitrate"], 4200);
    assert_eq!(snapshot["format"], "udp");
    assert_eq!(snapshot["source"], "239.255.1.1:1234");

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/api/monitors/channel", KEY).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["monitors"][0]["name"], "news-hd");
}

#[tokio::test]
async fn psi_samples_are_cached_per_table() {
    let ctx = build_test_context(None).expect("context should build");
    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/channel",
        None,
        Some(json!({"name": "news-hd"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/api/ingest/channel/news-hd",
        None,
        Some(json!({"type": "psi", "psi": "pmt", "data": {"pnr": 101}})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", "/api/monitors/channel/news-hd/psi", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pmt"]["pnr"], 101);
}

#[tokio::test]
async fn ingest_without_monitor_is_not_found() {
    let ctx = build_test_context(None).expect("context should build");
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/api/ingest/channel/news-hd",
        None,
        Some(json!({"type": "error", "message": "no signal"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["err_code"], 1004);
}

#[tokio::test]
async fn create_errors_map_to_status_codes() {
    let ctx = build_test_context(None).expect("context should build");

    let create = |name: &'static str, extra: serde_json::Value| {
        let mut body = json!({"name": name});
        if let (Some(obj), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            obj.extend(extra.clone());
        }
        body
    };

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/channel",
        None,
        Some(create("news-hd", json!({"rate": 5.0}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_code"], 1007);

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/channel",
        None,
        Some(create("bad name!", json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/channel",
        None,
        Some(create("unknown-hd", json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["err_code"], 1502);

    for name in ["news-hd", "sport-hd"] {
        let (status, _, _) = request_json(
            &ctx.app,
            "POST",
            "/api/monitors/channel",
            None,
            Some(create(name, json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/channel",
        None,
        Some(create("news-hd", json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["err_code"], 1005);

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/channel",
        None,
        Some(create("movies-hd", json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["err_code"], 1006);
    assert_eq!(ctx.state.channels.len(), 2);
    assert_eq!(ctx.state.host.input_count(), 2);
}

#[tokio::test]
async fn tuner_kind_accepts_dvb_alias() {
    let ctx = build_test_context(None).expect("context should build");
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/dvb",
        None,
        Some(json!({"name": "dvb-a0"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["kind"], "tuner");
    assert_eq!(body["data"]["config"]["time_check"], 10);
    assert_eq!(ctx.state.tuners.len(), 1);
}

#[tokio::test]
async fn patch_updates_parameters_atomically() {
    let ctx = build_test_context(None).expect("context should build");
    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/channel",
        None,
        Some(json!({"name": "news-hd"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body, _) = request_json(
        &ctx.app,
        "PATCH",
        "/api/monitors/channel/news-hd",
        None,
        Some(json!({"time_check": 5, "method_comparison": 2, "colour": "blue"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["config"]["time_check"], 5);
    assert_eq!(body["data"]["config"]["method_comparison"], 2);

    let (status, _, _) = request_json(
        &ctx.app,
        "PATCH",
        "/api/monitors/channel/news-hd",
        None,
        Some(json!({"time_check": 1, "rate": "fast"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let view = ctx.state.channels.get("news-hd").expect("monitor exists");
    assert_eq!(view.config.time_check, 5);

    let (status, _, _) = request_json(
        &ctx.app,
        "PATCH",
        "/api/monitors/channel/sport-hd",
        None,
        Some(json!({"time_check": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_and_reboot_monitor() {
    let ctx = build_test_context(None).expect("context should build");
    for name in ["news-hd", "sport-hd"] {
        let (status, _, _) = request_json(
            &ctx.app,
            "POST",
            "/api/monitors/channel",
            None,
            Some(json!({"name": name})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _, _) =
        request_no_body(&ctx.app, "DELETE", "/api/monitors/channel/sport-hd", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctx.state.channels.get("sport-hd").is_none());
    assert_eq!(ctx.state.host.input_count(), 1);

    let (status, _, _) =
        request_no_body(&ctx.app, "DELETE", "/api/monitors/channel/sport-hd", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = request_no_body(
        &ctx.app,
        "POST",
        "/api/monitors/channel/news-hd/reboot",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let view = ctx.state.channels.get("news-hd").expect("monitor is back");
    assert_eq!(view.config.name, "news-hd");
    assert_eq!(ctx.state.host.input_count(), 1);
}

#[tokio::test]
async fn delayed_delete_is_scheduled() {
    let ctx = build_test_context(None).expect("context should build");
    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/channel",
        None,
        Some(json!({"name": "news-hd"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, _) = request_no_body(
        &ctx.app,
        "DELETE",
        "/api/monitors/channel/news-hd?delay=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(ctx.state.channels.get("news-hd").is_some());

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(ctx.state.channels.get("news-hd").is_none());
}

#[tokio::test]
async fn sampler_routes() {
    let ctx = build_test_context(None).expect("context should build");

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/api/system", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["usage_percent"], 0.0);
    assert_eq!(body["data"]["cores"], 4);
    assert_eq!(body["data"]["memory"]["usage_percent"], 25.0);
    assert_eq!(body["data"]["disks"][0]["usage_percent"], 75.0);

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/api/process", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pid"], 4242);
    assert_eq!(body["data"]["memory_percent"], 0.78125);

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/api/sampler/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["collections"], 2);
    assert_eq!(body["data"]["cache_interval_secs"], 2);

    let (status, body, _) = request_json(
        &ctx.app,
        "PUT",
        "/api/sampler/interval",
        None,
        Some(json!({"secs": 30})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cache_interval_secs"], 30);

    let (status, _, _) = request_json(
        &ctx.app,
        "PUT",
        "/api/sampler/interval",
        None,
        Some(json!({"secs": 7200})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body, _) = request_no_body(&ctx.app, "POST", "/api/sampler/clear", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["collections"], 0);
    assert_eq!(body["data"]["cache_interval_secs"], 30);
}

#[tokio::test]
async fn reload_picks_up_new_targets() {
    let ctx = build_test_context(None).expect("context should build");

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/channel",
        None,
        Some(json!({"name": "kids-hd"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let updated = format!("{BASE_CONFIG}kids-hd = \"udp://239.255.1.9:1234\"\n");
    std::fs::write(&ctx.config_path, updated).expect("config should write");

    let (status, _, _) = request_no_body(&ctx.app, "POST", "/api/control/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctx.state.host.targets().contains_key("kids-hd"));

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/api/monitors/channel",
        None,
        Some(json!({"name": "kids-hd"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn broken_config_reload_keeps_targets() {
    let ctx = build_test_context(None).expect("context should build");
    std::fs::write(&ctx.config_path, "http_port = \"eighty\"").expect("config should write");

    let (status, body, _) = request_no_body(&ctx.app, "POST", "/api/control/reload", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_code"], 1001);
    assert!(ctx.state.host.targets().contains_key("news-hd"));
}

#[tokio::test]
async fn exit_signals_shutdown() {
    let ctx = build_test_context(None).expect("context should build");
    let signal = ctx.state.host.shutdown_signal();

    let (status, _, _) = request_no_body(&ctx.app, "POST", "/api/control/exit", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    tokio::time::timeout(Duration::from_secs(1), signal.notified())
        .await
        .expect("exit should notify the shutdown signal");
}
