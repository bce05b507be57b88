use std::time::Duration;

use rama::{
    http::{BodyExtractExt as _, StatusCode, service::client::HttpClientExt as _},
    net::tls::server::SelfSignedData,
    rt::Executor,
    tls::boring::server::utils::self_signed_server_ca,
};
use tokio::time::Instant;

use loadpair_lib::{
    client::HttpTransport,
    driver::{self, DriverConfig},
};

use crate::test::e2e::runtime::{self, Runtime};

fn driver_config(runtime: &Runtime, transport: HttpTransport) -> DriverConfig {
    DriverConfig {
        base_url: runtime.target_url(),
        request_count: 20,
        transport,
        concurrency: 4,
        request_timeout: Some(Duration::from_secs(30)),
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_target_responds_after_configured_latency() {
    let runtime = runtime::spawn_target(&["--duration", "10", "--response", "ok"]).await;
    let client = runtime.client(HttpTransport::Http1);

    for index in 0..5 {
        let start = Instant::now();
        let resp = client
            .get(format!("{}/{index}", runtime.target_url()))
            .send()
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(10));
        assert_eq!(StatusCode::OK, resp.status());
        assert_eq!("ok", resp.try_into_string().await.unwrap());
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_driver_against_target() {
    let runtime = runtime::spawn_target(&["--duration", "10", "--response", "ok"]).await;

    for transport in [HttpTransport::Http1, HttpTransport::Http2] {
        let report = driver::run(
            Executor::default(),
            driver_config(&runtime, transport),
            (),
        )
        .await
        .unwrap();

        assert_eq!(20, report.counters.total, "{transport:?}");
        assert_eq!(20, report.counters.ok, "{transport:?}");
        // 20 requests over 4 workers, each taking at least 10ms
        assert!(
            report.elapsed >= Duration::from_millis(50),
            "{transport:?}: elapsed = {:?}",
            report.elapsed
        );
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_driver_against_secure_target() {
    let runtime =
        runtime::spawn_target(&["--secure", "--duration", "10", "--response", "ok"]).await;
    assert!(runtime.target_url().starts_with("https://"));

    let resp = runtime
        .client(HttpTransport::Http1)
        .get(runtime.target_url())
        .send()
        .await
        .unwrap();
    assert_eq!("ok", resp.try_into_string().await.unwrap());

    for transport in [HttpTransport::Http1, HttpTransport::Http2] {
        let report = driver::run(
            Executor::default(),
            driver_config(&runtime, transport),
            (),
        )
        .await
        .unwrap();

        assert_eq!(20, report.counters.ok, "{transport:?}");
        assert!(report.elapsed >= Duration::from_millis(50), "{transport:?}");
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_driver_observes_reconfigured_latency() {
    let runtime = runtime::spawn_target(&["--duration", "0", "--response", "ok"]).await;
    let client = runtime.client(HttpTransport::Http1);

    let resp = client
        .post(runtime.admin_config_url())
        .json(&serde_json::json!({"duration": 40, "response": "slow"}))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::SEE_OTHER, resp.status());

    let report = driver::run(
        Executor::default(),
        DriverConfig {
            request_count: 4,
            concurrency: 2,
            ..driver_config(&runtime, HttpTransport::Http1)
        },
        (),
    )
    .await
    .unwrap();

    assert_eq!(4, report.counters.ok);
    // 4 requests over 2 workers, each taking at least 40ms
    assert!(report.elapsed >= Duration::from_millis(80));
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_secure_target_with_pem_files() {
    let tls_dir = crate::test::tmp_dir::try_new("loadpair_target_pem_e2e").unwrap();
    let (crt, key) = self_signed_server_ca(&SelfSignedData {
        organisation_name: Some("loadpair e2e".to_owned()),
        ..Default::default()
    })
    .unwrap();

    let cert_path = tls_dir.join("server.crt");
    let key_path = tls_dir.join("server.key");
    std::fs::write(&cert_path, crt.to_pem().unwrap()).unwrap();
    std::fs::write(&key_path, key.private_key_to_pem_pkcs8().unwrap()).unwrap();

    let runtime = runtime::spawn_target(&[
        "--secure",
        "--ssl-cert",
        cert_path.to_str().unwrap(),
        "--ssl-key",
        key_path.to_str().unwrap(),
        "--duration",
        "0",
        "--response",
        "pem",
    ])
    .await;
    assert!(runtime.target_url().starts_with("https://"));

    for transport in [HttpTransport::Http1, HttpTransport::Http2] {
        let resp = runtime
            .client(transport)
            .get(runtime.target_url())
            .send()
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, resp.status(), "{transport:?}");
        assert_eq!("pem", resp.try_into_string().await.unwrap(), "{transport:?}");
    }
}

async fn reconfigure_latency(runtime: &Runtime, duration_ms: u64) {
    let resp = runtime
        .client(HttpTransport::Http1)
        .post(runtime.admin_config_url())
        .json(&serde_json::json!({"duration": duration_ms, "response": "slow"}))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::SEE_OTHER, resp.status());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_keep_alive_connection_outlives_slow_responses() {
    let runtime = runtime::spawn_target(&["--duration", "0", "--response", "fast"]).await;
    let client = runtime.client(HttpTransport::Http1);

    let resp = client.get(runtime.target_url()).send().await.unwrap();
    assert_eq!("fast", resp.try_into_string().await.unwrap());

    // the pooled connection is reused for slow responses back to back
    reconfigure_latency(&runtime, 400).await;
    let start = Instant::now();
    for index in 0..3 {
        let resp = client
            .get(format!("{}/{index}", runtime.target_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, resp.status());
        assert_eq!("slow", resp.try_into_string().await.unwrap());
    }
    assert!(start.elapsed() >= Duration::from_millis(1200));
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_connection_timeout_cuts_slow_responses() {
    let runtime = runtime::spawn_target(&[
        "--connection-timeout",
        "0.2",
        "--duration",
        "0",
        "--response",
        "fast",
    ])
    .await;
    let client = runtime.client(HttpTransport::Http1);

    let resp = client.get(runtime.target_url()).send().await.unwrap();
    assert_eq!("fast", resp.try_into_string().await.unwrap());

    reconfigure_latency(&runtime, 1000).await;
    let start = Instant::now();
    let result = client.get(runtime.target_url()).send().await;
    assert!(result.is_err(), "response despite connection timeout");
    assert!(start.elapsed() < Duration::from_millis(1000));
}
