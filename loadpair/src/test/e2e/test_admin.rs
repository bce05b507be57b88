use rama::http::{
    BodyExtractExt as _, StatusCode,
    header::{CONNECTION, CONTENT_TYPE, LOCATION, SERVER},
    service::client::HttpClientExt as _,
};

use loadpair_lib::{
    client::{HttpTransport, WebClient},
    target::ResponderConfig,
    utils::env::network_service_identifier,
};

use crate::test::e2e::runtime::{self, Runtime};

async fn get_config(runtime: &Runtime, client: &WebClient) -> ResponderConfig {
    let resp = client
        .get(runtime.admin_config_url())
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, resp.status());
    assert_eq!(
        "application/json",
        resp.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap()
    );
    resp.try_into_json().await.unwrap()
}

async fn post_config(
    runtime: &Runtime,
    client: &WebClient,
    content_type: &'static str,
    body: &'static str,
) -> (StatusCode, String) {
    let resp = client
        .post(runtime.admin_config_url())
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .send()
        .await
        .unwrap();
    let status = resp.status();
    if status == StatusCode::SEE_OTHER {
        assert_eq!(
            "/config",
            resp.headers().get(LOCATION).unwrap().to_str().unwrap()
        );
    }
    (status, resp.try_into_string().await.unwrap())
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_admin_get_initial_config() {
    let runtime = runtime::spawn_target(&["--duration", "10", "--response", "ok"]).await;
    let client = runtime.client(HttpTransport::Http1);

    assert_eq!(
        ResponderConfig::new(10, "ok"),
        get_config(&runtime, &client).await
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_admin_post_then_get() {
    let runtime = runtime::spawn_target(&["--duration", "10", "--response", "ok"]).await;
    let client = runtime.client(HttpTransport::Http1);

    let (status, _) = post_config(
        &runtime,
        &client,
        "application/json",
        r#"{"duration":0,"response":"x"}"#,
    )
    .await;
    assert_eq!(StatusCode::SEE_OTHER, status);

    assert_eq!(
        ResponderConfig::new(0, "x"),
        get_config(&runtime, &client).await
    );

    let resp = client.get(runtime.target_url()).send().await.unwrap();
    assert_eq!("x", resp.try_into_string().await.unwrap());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_admin_rejections_leave_config_untouched() {
    let runtime = runtime::spawn_target(&["--duration", "10", "--response", "ok"]).await;
    let client = runtime.client(HttpTransport::Http1);

    let (status, body) = post_config(
        &runtime,
        &client,
        "text/plain",
        r#"{"duration":1,"response":"y"}"#,
    )
    .await;
    assert_eq!(StatusCode::METHOD_NOT_ALLOWED, status);
    assert_eq!("Invalid content type", body);

    let (status, body) = post_config(&runtime, &client, "application/json", "{").await;
    assert_eq!(StatusCode::METHOD_NOT_ALLOWED, status);
    assert_eq!("Invalid content", body);

    let resp = client
        .delete(runtime.admin_config_url())
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::METHOD_NOT_ALLOWED, resp.status());
    assert_eq!(
        "Invalid request method",
        resp.try_into_string().await.unwrap()
    );

    assert_eq!(
        ResponderConfig::new(10, "ok"),
        get_config(&runtime, &client).await
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_admin_unknown_path() {
    let runtime = runtime::spawn_target(&[]).await;
    let client = runtime.client(HttpTransport::Http1);

    let resp = client
        .get(format!("http://{}/other", runtime.admin_socket_addr()))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, resp.status());
    assert_eq!(
        network_service_identifier(),
        resp.headers().get(SERVER).unwrap().to_str().unwrap()
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_disable_keep_alive_closes_connections() {
    let runtime = runtime::spawn_target(&["--disable-keep-alive", "--duration", "0"]).await;
    let client = runtime.client(HttpTransport::Http1);

    for url in [runtime.target_url(), runtime.admin_config_url()] {
        let resp = client.get(url.as_str()).send().await.unwrap();
        assert_eq!(StatusCode::OK, resp.status(), "{url}");
        assert_eq!(
            "close",
            resp.headers().get(CONNECTION).unwrap().to_str().unwrap(),
            "{url}"
        );
    }
}
