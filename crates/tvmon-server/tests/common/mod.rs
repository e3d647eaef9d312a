#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::util::ServiceExt;
use tvmon_collector::cpu::CpuTicks;
use tvmon_collector::disk::DiskUsage;
use tvmon_collector::network::InterfaceBytes;
use tvmon_collector::{CounterSource, ProcessCounters, SystemCounters};
use tvmon_server::app;
use tvmon_server::config::ServerConfig;
use tvmon_server::state::AppState;

pub const TEST_API_KEY: &str = "test-key";

pub const BASE_CONFIG: &str = r#"
http_port = 8000
channel_limit = 2
tuner_limit = 1

[targets]
news-hd = "udp://239.255.1.1:1234"
sport-hd = "udp://239.255.1.2:1234"
movies-hd = "udp://239.255.1.3:1234"
dvb-a0 = "dvb://adapter0"
"#;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
    pub state: AppState,
    pub app: axum::Router,
}

/// Counters that never move; enough to exercise the sampler routes.
pub struct FixedSource;

impl CounterSource for FixedSource {
    fn name(&self) -> &str {
        "fixed"
    }

    fn read_system(&mut self) -> tvmon_collector::Result<SystemCounters> {
        let mut interfaces = BTreeMap::new();
        interfaces.insert(
            "eth0".to_string(),
            InterfaceBytes {
                received: 1_000,
                transmitted: 2_000,
            },
        );
        Ok(SystemCounters {
            cpu: CpuTicks {
                total: 10_000,
                active: 2_500,
            },
            cores: 4,
            memory_total: 8 * 1024 * 1024 * 1024,
            memory_used: 2 * 1024 * 1024 * 1024,
            disks: vec![DiskUsage::new("/", 100, 25)],
            interfaces,
            uptime_secs: 3_600,
        })
    }

    fn read_process(&mut self) -> tvmon_collector::Result<ProcessCounters> {
        Ok(ProcessCounters {
            pid: 4242,
            ticks: 100,
            system_total: 10_000,
            cores: 4,
            rss_bytes: 64 * 1024 * 1024,
        })
    }
}

pub fn build_test_context(api_key: Option<&str>) -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let config_path = temp_dir.path().join("tvmon.toml");
    std::fs::write(&config_path, BASE_CONFIG)?;

    let mut config = ServerConfig::load(&config_path)?;
    config.api_key = api_key.map(str::to_string);

    let state = AppState::new(config, Some(config_path.clone()), Box::new(FixedSource))?;
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        config_path,
        state,
        app,
    })
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder = builder.header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");

    send(app, req).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
    api_key: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }

    let req = builder.body(Body::empty()).expect("request should build");
    send(app, req).await
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}
