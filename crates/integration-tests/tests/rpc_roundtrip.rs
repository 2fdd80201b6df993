//! JSON-RPC surface over HTTP: upload, status, errors and processed pages

use jsonrpsee::core::client::{ClientT, Error as ClientError};
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::server::ServerHandle;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tabula_api_rpc::error::code;
use tabula_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use tabula_core::application::{
    ingestion_channel, shutdown_channel, IngestionPipeline, IngestionWorker, JobStatusService,
    RetryPolicy, ShutdownSender, UploadService,
};
use tabula_core::port::id_provider::UuidProvider;
use tabula_core::port::time_provider::SystemTimeProvider;
use tabula_core::port::JobStore;
use tabula_infra_sqlite::{create_pool, run_migrations, SqliteJobStore};

struct Daemon {
    client: HttpClient,
    server: ServerHandle,
    shutdown: ShutdownSender,
}

async fn start_daemon() -> Daemon {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(pool));
    let time_provider = Arc::new(SystemTimeProvider);
    let service = Arc::new(JobStatusService::new(
        store.clone(),
        Arc::new(UuidProvider),
        time_provider.clone(),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(
        store,
        time_provider,
        RetryPolicy::default(),
    ));
    let (queue, rx) = ingestion_channel(8);
    let (shutdown, token) = shutdown_channel();
    tokio::spawn(IngestionWorker::new(rx, pipeline, 2).run(token));

    let handler = Arc::new(RpcHandler::new(
        Arc::new(UploadService::new(service.clone(), queue)),
        service,
    ));
    let config = RpcServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let (addr, server) = RpcServer::new(config, handler).start().await.unwrap();

    let client = HttpClientBuilder::default()
        .build(format!("http://{}", addr))
        .unwrap();

    Daemon {
        client,
        server,
        shutdown,
    }
}

fn params(value: Value) -> ObjectParams {
    let mut params = ObjectParams::new();
    if let Value::Object(map) = value {
        for (key, value) in map {
            params.insert(&key, value).unwrap();
        }
    }
    params
}

fn error_code(err: ClientError) -> i32 {
    match err {
        ClientError::Call(obj) => obj.code(),
        other => panic!("unexpected client error: {:?}", other),
    }
}

async fn wait_done(client: &HttpClient, id: &str) -> Value {
    for _ in 0..500 {
        let status: Value = client
            .request("files.status.v1", params(json!({ "id": id })))
            .await
            .unwrap();
        if status["status"] == "DONE" || status["status"] == "FAILED" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("file {} did not finish", id);
}

#[tokio::test]
async fn test_upload_and_page_through_results() {
    let daemon = start_daemon().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.csv");
    std::fs::write(&path, "A,B\nAlice,30\nBob,thirty\n").unwrap();

    let upload: Value = daemon
        .client
        .request(
            "files.upload.v1",
            params(json!({
                "file_path": path.display().to_string(),
                "expected_format": {
                    "A": {"name": "name", "type": "string"},
                    "B": {"name": "age", "type": "number"}
                }
            })),
        )
        .await
        .unwrap();
    let id = upload["id"].as_str().unwrap().to_string();

    let status = wait_done(&daemon.client, &id).await;
    assert_eq!(status["status"], "DONE");
    assert_eq!(status["processed"], 1);
    assert_eq!(status["errors"], 1);

    let processed: Value = daemon
        .client
        .request(
            "files.processed.v1",
            params(json!({ "id": id, "page": 0, "size": 10 })),
        )
        .await
        .unwrap();
    assert_eq!(
        processed,
        json!({"data": [{"name": "Alice", "age": 30}], "total": 1, "page": 0, "size": 10})
    );

    let errors: Value = daemon
        .client
        .request(
            "files.errors.v1",
            params(json!({ "id": id, "page": 0, "size": 10 })),
        )
        .await
        .unwrap();
    assert_eq!(errors["total"], 1);
    assert_eq!(errors["data"][0]["column"], "B");
    assert_eq!(errors["data"][0]["row"], 3);

    daemon.shutdown.shutdown();
    daemon.server.stop().unwrap();
}

#[tokio::test]
async fn test_error_codes() {
    let daemon = start_daemon().await;

    let not_found = daemon
        .client
        .request::<Value, _>(
            "files.errors.v1",
            params(json!({ "id": "nonexistent-id", "page": 0, "size": 10 })),
        )
        .await
        .unwrap_err();
    assert_eq!(error_code(not_found), code::NOT_FOUND);

    let bad_size = daemon
        .client
        .request::<Value, _>(
            "files.processed.v1",
            params(json!({ "id": "nonexistent-id", "page": 0, "size": 0 })),
        )
        .await
        .unwrap_err();
    assert_eq!(error_code(bad_size), code::VALIDATION_ERROR);

    let bad_format = daemon
        .client
        .request::<Value, _>(
            "files.upload.v1",
            params(json!({
                "file_path": "/tmp/people.csv",
                "expected_format": {"A": {"name": "a", "type": "date"}}
            })),
        )
        .await
        .unwrap_err();
    assert_eq!(error_code(bad_format), code::VALIDATION_ERROR);

    daemon.shutdown.shutdown();
    daemon.server.stop().unwrap();
}
