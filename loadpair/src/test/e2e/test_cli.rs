use clap::Parser as _;

use crate::{Args, test::e2e::runtime};

#[tokio::test]
#[tracing_test::traced_test]
async fn test_drive_command_completes() {
    let runtime = runtime::spawn_target(&["--duration", "1", "--response", "ok"]).await;
    let data_dir = crate::test::tmp_dir::try_new("loadpair_drive_e2e")
        .unwrap()
        .join("data");

    let url = runtime.target_url();
    let args = Args::try_parse_from([
        "loadpair",
        "--data",
        data_dir.to_str().unwrap(),
        "drive",
        "--url",
        url.as_str(),
        "--requests",
        "10",
        "--concurrency",
        "3",
        "--json",
    ])
    .unwrap();

    crate::run_with_args(std::future::pending::<()>(), args)
        .await
        .unwrap();

    // only the target publishes files in the data directory
    assert!(!data_dir.exists());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_drive_command_rejects_missing_url() {
    let data_dir = crate::test::tmp_dir::try_new("loadpair_drive_e2e").unwrap();

    let args = Args::try_parse_from([
        "loadpair",
        "--data",
        data_dir.to_str().unwrap(),
        "drive",
        "--requests",
        "10",
    ])
    .unwrap();

    assert!(
        crate::run_with_args(std::future::pending::<()>(), args)
            .await
            .is_err()
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_target_command_fails_on_bind_conflict() {
    let runtime = runtime::spawn_target(&[]).await;
    let data_dir = crate::test::tmp_dir::try_new("loadpair_target_conflict_e2e").unwrap();

    let taken = runtime.target_socket_addr().to_string();
    let args = Args::try_parse_from([
        "loadpair",
        "--data",
        data_dir.to_str().unwrap(),
        "target",
        "--bind",
        taken.as_str(),
        "--admin-bind",
        "127.0.0.1:0",
    ])
    .unwrap();

    assert!(
        crate::run_with_args(std::future::pending::<()>(), args)
            .await
            .is_err()
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_target_command_fails_on_incomplete_tls_files() {
    let data_dir = crate::test::tmp_dir::try_new("loadpair_target_tls_e2e").unwrap();

    let args = Args::try_parse_from([
        "loadpair",
        "--data",
        data_dir.to_str().unwrap(),
        "target",
        "--bind",
        "127.0.0.1:0",
        "--admin-bind",
        "127.0.0.1:0",
        "--secure",
        "--ssl-cert",
        "missing.crt",
    ])
    .unwrap();

    assert!(
        crate::run_with_args(std::future::pending::<()>(), args)
            .await
            .is_err()
    );
}
