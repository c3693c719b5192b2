use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use dq_output::{NullRenderer, TaskOutput, TaskStatus};
use dq_requests::{ApiClient, Manifest, error::Error, prelude::*};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::mpsc};

#[derive(Clone, Default)]
struct Server {
    applied: Arc<Mutex<Vec<(String, String, Value)>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    waits: Arc<Mutex<Vec<(String, String)>>>,
}

async fn put_source(
    State(server): State<Server>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(spec): Json<Value>,
) -> Response {
    if name == "bad" {
        return (StatusCode::BAD_REQUEST, "invalid spec").into_response();
    }
    let version = headers
        .get("api-version")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    server.applied.lock().unwrap().push((name, version, spec));
    StatusCode::OK.into_response()
}

async fn get_source(Path(name): Path<String>) -> Response {
    if name == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({"id": name, "spec": {"kind": "PostgreSQL"}, "status": {"available": true}}))
        .into_response()
}

async fn delete_source(State(server): State<Server>, Path(name): Path<String>) -> StatusCode {
    server.deleted.lock().unwrap().push(name);
    StatusCode::NO_CONTENT
}

async fn list_sources() -> Json<Value> {
    Json(json!([{"id": "a", "spec": {}}, {"id": "b", "status": {"available": false}}]))
}

async fn ready_wait(
    State(server): State<Server>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    let timeout = params.get("timeout").cloned().unwrap_or_default();
    server.waits.lock().unwrap().push((name.clone(), timeout));
    if name == "slow" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

async fn watch(Path(name): Path<String>) -> Response {
    if name == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }
    let chunks = vec![
        "[{\"addedResults\":[{\"id\":1,\"name\":\"Ali".to_string(),
        "ce\"},{\"id\":2,\"name\":\"Bob\"}]},".to_string(),
        "{\"updatedResults\":[{\"before\":{\"id\":1,\"name\":\"Alice\"},".to_string(),
        "\"after\":{\"id\":1,\"name\":\"Alice Smith\"}}]}]".to_string(),
    ];
    let stream = futures_util::stream::iter(chunks.into_iter().map(Ok::<_, Infallible>));
    Body::from_stream(stream).into_response()
}

async fn serve() -> (ApiClient, Server) {
    let server = Server::default();
    let app = Router::new()
        .route("/v1/sources", get(list_sources))
        .route(
            "/v1/sources/{name}",
            put(put_source).get(get_source).delete(delete_source),
        )
        .route("/v1/continuousQueries/{name}/ready-wait", get(ready_wait))
        .route("/v1/continuousQueries/{name}/watch", get(watch))
        .with_state(server.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });

    (ApiClient::new(format!("http://{addr}/")), server)
}

fn manifest(kind: &str, name: &str, tag: Option<&str>) -> Manifest {
    Manifest {
        api_version: "v1".to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
        tag: tag.map(str::to_string),
        spec: json!({"kind": "PostgreSQL", "properties": {"host": "db"}}),
    }
}

#[tokio::test]
async fn apply_reports_each_manifest() -> Result<()> {
    let (client, server) = serve().await;
    let output = TaskOutput::interactive(NullRenderer);

    client
        .apply(
            &[manifest("Source", "db", None), manifest("Source", "cache", Some("2"))],
            &output,
        )
        .await?;
    output.close().await.unwrap();

    let applied = server.applied.lock().unwrap().clone();
    assert_eq!(applied.len(), 2);
    assert_eq!(applied[0].0, "db");
    assert_eq!(applied[0].1, "v1");
    assert_eq!(applied[0].2["properties"]["host"], json!("db"));
    assert_eq!(applied[1].0, "cache:2");

    let tree = output.snapshot().unwrap();
    let task = tree.get("Apply: Source/db").unwrap();
    assert_eq!(task.status(), TaskStatus::Succeeded);
    assert_eq!(task.message(), "Apply: Source/db: complete");
    Ok(())
}

#[tokio::test]
async fn apply_stops_at_first_failure() {
    let (client, server) = serve().await;
    let output = TaskOutput::interactive(NullRenderer);

    let err = client
        .apply(
            &[
                manifest("Source", "bad", None),
                manifest("Source", "never", None),
            ],
            &output,
        )
        .await
        .unwrap_err();
    output.close().await.unwrap();

    assert!(matches!(
        err,
        Error::Status { status, ref body } if status == reqwest::StatusCode::BAD_REQUEST && body == "invalid spec"
    ));
    assert!(server.applied.lock().unwrap().is_empty());

    let tree = output.snapshot().unwrap();
    let task = tree.get("Apply: Source/bad").unwrap();
    assert_eq!(task.status(), TaskStatus::Failed);
    assert_eq!(
        task.message(),
        "Error: Apply: Source/bad: 400 Bad Request: invalid spec"
    );
    assert!(tree.get("Apply: Source/never").is_none());
}

#[tokio::test]
async fn unknown_kind_fails_the_task() {
    let (client, _server) = serve().await;
    let output = TaskOutput::interactive(NullRenderer);

    let err = client
        .apply(&[manifest("Pod", "p", None)], &output)
        .await
        .unwrap_err();
    output.close().await.unwrap();

    assert!(matches!(err, Error::UnknownKind(ref kind) if kind == "Pod"));
    let tree = output.snapshot().unwrap();
    assert_eq!(
        tree.get("Apply: Pod/p").map(|task| task.status()),
        Some(TaskStatus::Failed)
    );
}

#[tokio::test]
async fn delete_expects_no_content() -> Result<()> {
    let (client, server) = serve().await;
    let output = TaskOutput::interactive(NullRenderer);

    client
        .delete(&[manifest("source", "db", Some("1"))], &output)
        .await?;
    output.close().await.unwrap();

    assert_eq!(*server.deleted.lock().unwrap(), vec!["db:1".to_string()]);
    let tree = output.snapshot().unwrap();
    assert_eq!(
        tree.get("Delete: source/db").map(|task| task.message()),
        Some("Delete: source/db: complete")
    );
    Ok(())
}

#[tokio::test]
async fn ready_wait_passes_timeout() {
    let (client, server) = serve().await;
    let output = TaskOutput::interactive(NullRenderer);

    let err = client
        .ready_wait(
            &[
                manifest("ContinuousQuery", "people", None),
                manifest("ContinuousQuery", "slow", None),
            ],
            5,
            &output,
        )
        .await
        .unwrap_err();
    output.close().await.unwrap();

    assert!(matches!(err, Error::Status { status, .. } if status == reqwest::StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(
        *server.waits.lock().unwrap(),
        vec![
            ("people".to_string(), "5".to_string()),
            ("slow".to_string(), "5".to_string()),
        ]
    );

    let tree = output.snapshot().unwrap();
    assert_eq!(
        tree.get("Wait ContinuousQuery/people").map(|task| task.message()),
        Some("Wait ContinuousQuery/people online")
    );
    assert_eq!(
        tree.get("Wait ContinuousQuery/slow").map(|task| task.status()),
        Some(TaskStatus::Failed)
    );
}

#[tokio::test]
async fn get_and_list_resources() -> Result<()> {
    let (client, _server) = serve().await;

    let resource = client.get_resource("Source", "db").await?;
    assert_eq!(resource.id, "db");
    assert_eq!(resource.status["available"], json!(true));

    let resources = client.list_resources("source").await?;
    let ids: Vec<&str> = resources.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);

    let missing = client.get_resource("Source", "missing").await;
    assert!(matches!(missing, Err(Error::Status { status, .. }) if status == reqwest::StatusCode::NOT_FOUND));
    Ok(())
}

#[tokio::test]
async fn watch_streams_change_batches() -> Result<()> {
    let (client, _server) = serve().await;
    let (tx, mut rx) = mpsc::channel(4);

    let watcher = tokio::spawn(async move { client.watch("query", "people", tx).await });

    let mut batches = Vec::new();
    while let Some(batch) = rx.recv().await {
        batches.push(batch);
    }
    watcher.await.unwrap()?;

    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].added_results.len(), 2);
    assert_eq!(batches[0].added_results[0]["name"], json!("Alice"));
    assert_eq!(
        batches[1].updated_results[0].after["name"],
        json!("Alice Smith")
    );
    Ok(())
}

#[tokio::test]
async fn watch_of_missing_query_fails() {
    let (client, _server) = serve().await;
    let (tx, _rx) = mpsc::channel(1);
    let err = client.watch("query", "missing", tx).await.unwrap_err();
    assert!(matches!(err, Error::Status { status, .. } if status == reqwest::StatusCode::NOT_FOUND));
}
