//! HTTP task store integration tests
//!
//! Runs a small axum server that mimics the remote store's JSON API and
//! records every request it receives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use hey_todo::tasks::{HttpTaskStore, TaskFilter, TaskId, TaskStore};
use hey_todo::{CommandHandler, Error, Feedback, Priority};

mod common;
use common::{RecordingDisplay, RecordingSynth, RecordingView};

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    path: String,
    query: Option<String>,
    body: Value,
}

#[derive(Default)]
struct FakeStore {
    tasks: Mutex<Vec<Value>>,
    requests: Mutex<Vec<Recorded>>,
    /// Fail mutations with a body that carries no `error` field
    broken: AtomicBool,
}

impl FakeStore {
    fn seed(&self, name: &str, done: bool, priority: u8) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.tasks.lock().unwrap().push(json!({
            "id": id,
            "name": name,
            "done": done,
            "priority": priority,
            "category": "general",
            "due_date": null,
            "created_at": "2025-02-20T09:15:42.123456",
        }));
        id
    }

    fn record(&self, path: &str, query: Option<String>, body: Value) {
        self.requests.lock().unwrap().push(Recorded {
            path: path.to_string(),
            query,
            body,
        });
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn last_request(&self) -> Recorded {
        self.requests().pop().expect("no request recorded")
    }
}

type Shared = Arc<FakeStore>;

fn message(text: String) -> Response {
    Json(json!({ "message": text })).into_response()
}

fn rejection(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "error": error }))).into_response()
}

async fn list(State(store): State<Shared>, RawQuery(query): RawQuery) -> Json<Vec<Value>> {
    store.record("/tasks", query.clone(), Value::Null);
    let done = match query.as_deref() {
        Some("done=true") => Some(true),
        Some("done=false") => Some(false),
        _ => None,
    };
    let tasks = store.tasks.lock().unwrap();
    Json(
        tasks
            .iter()
            .filter(|t| done.is_none_or(|d| t["done"] == d))
            .cloned()
            .collect(),
    )
}

async fn add(State(store): State<Shared>, Json(body): Json<Value>) -> Response {
    store.record("/add", None, body.clone());
    if store.broken.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let name = body["task"].as_str().unwrap_or_default().to_string();
    let exists = store
        .tasks
        .lock()
        .unwrap()
        .iter()
        .any(|t| t["name"].as_str().unwrap_or_default().eq_ignore_ascii_case(&name));
    if exists {
        return rejection(StatusCode::CONFLICT, "Task already exists");
    }
    store.seed(&name, false, 1);
    message(format!("Added {name}"))
}

fn update(store: &FakeStore, path: &str, body: &Value, f: impl FnOnce(&mut Value) -> String) -> Response {
    store.record(path, None, body.clone());
    let id = body["id"].as_str().unwrap_or_default();
    let mut tasks = store.tasks.lock().unwrap();
    match tasks.iter_mut().find(|t| t["id"] == id) {
        Some(task) => message(f(task)),
        None => rejection(StatusCode::NOT_FOUND, "Task not found"),
    }
}

async fn toggle(State(store): State<Shared>, Json(body): Json<Value>) -> Response {
    update(&store, "/toggle", &body, |task| {
        let done = !task["done"].as_bool().unwrap_or_default();
        task["done"] = json!(done);
        let state = if done { "done" } else { "undone" };
        format!("Marked {} as {state}", task["name"].as_str().unwrap_or_default())
    })
}

async fn mark(State(store): State<Shared>, Json(body): Json<Value>) -> Response {
    update(&store, "/mark", &body, |task| {
        task["done"] = json!(true);
        format!("Marked {} as done", task["name"].as_str().unwrap_or_default())
    })
}

async fn delete(State(store): State<Shared>, Json(body): Json<Value>) -> Response {
    store.record("/delete", None, body.clone());
    let id = body["id"].as_str().unwrap_or_default();
    let mut tasks = store.tasks.lock().unwrap();
    match tasks.iter().position(|t| t["id"] == id) {
        Some(index) => {
            let task = tasks.remove(index);
            message(format!("Deleted {}", task["name"].as_str().unwrap_or_default()))
        }
        None => rejection(StatusCode::NOT_FOUND, "Task not found"),
    }
}

async fn clear(State(store): State<Shared>, Json(body): Json<Value>) -> Response {
    store.record("/clear", None, body);
    store.tasks.lock().unwrap().clear();
    message("All tasks cleared".to_string())
}

/// Serve a fake store on an ephemeral port, returning its base URL
async fn serve(store: Shared) -> String {
    let app = Router::new()
        .route("/tasks", get(list))
        .route("/add", post(add))
        .route("/toggle", post(toggle))
        .route("/mark", post(mark))
        .route("/delete", post(delete))
        .route("/clear", post(clear))
        .with_state(store);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn client(store: &Shared) -> HttpTaskStore {
    let url = serve(Arc::clone(store)).await;
    HttpTaskStore::new(&url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_list_keeps_store_order() {
    let store = Shared::default();
    let milk = store.seed("buy milk", false, 3);
    store.seed("walk dog", true, 2);
    let http = client(&store).await;

    let tasks = http.list(TaskFilter::All).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, TaskId::new(milk));
    assert_eq!(tasks[0].priority, Priority::High);
    assert_eq!(tasks[1].name, "walk dog");
    assert!(tasks[1].done);
    assert!(tasks[1].created_at.is_some());

    assert_eq!(store.last_request().query, None);
}

#[tokio::test]
async fn test_list_sends_done_filter() {
    let store = Shared::default();
    store.seed("buy milk", false, 1);
    store.seed("walk dog", true, 1);
    let http = client(&store).await;

    let pending = http.list(TaskFilter::Pending).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].name, "buy milk");
    assert_eq!(store.last_request().query.as_deref(), Some("done=false"));

    let completed = http.list(TaskFilter::Completed).await.unwrap();
    assert_eq!(completed[0].name, "walk dog");
    assert_eq!(store.last_request().query.as_deref(), Some("done=true"));
}

#[tokio::test]
async fn test_add_sends_task_body() {
    let store = Shared::default();
    let http = client(&store).await;

    let reply = http.add("Buy Milk").await.unwrap();
    assert_eq!(reply.message.as_deref(), Some("Added Buy Milk"));

    let request = store.last_request();
    assert_eq!(request.path, "/add");
    assert_eq!(request.body, json!({ "task": "Buy Milk" }));
}

#[tokio::test]
async fn test_rejection_message_is_kept_verbatim() {
    let store = Shared::default();
    store.seed("buy milk", false, 1);
    let http = client(&store).await;

    let err = http.add("buy milk").await.unwrap_err();
    match &err {
        Error::StoreRejected { status, message } => {
            assert_eq!(*status, 409);
            assert_eq!(message, "Task already exists");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(err.spoken_message(), "Task already exists");
}

#[tokio::test]
async fn test_rejection_without_error_field() {
    let store = Shared::default();
    store.broken.store(true, Ordering::SeqCst);
    let http = client(&store).await;

    let err = http.add("buy milk").await.unwrap_err();
    assert_eq!(err.spoken_message(), "Unknown error");
}

#[tokio::test]
async fn test_id_commands_send_id_body() {
    let store = Shared::default();
    let milk = store.seed("buy milk", false, 1);
    let dog = store.seed("walk dog", false, 1);
    let http = client(&store).await;

    let reply = http.mark(&TaskId::new(milk.clone())).await.unwrap();
    assert_eq!(reply.message.as_deref(), Some("Marked buy milk as done"));
    assert_eq!(store.last_request().body, json!({ "id": milk }));

    let reply = http.toggle(&TaskId::new(milk.clone())).await.unwrap();
    assert_eq!(reply.message.as_deref(), Some("Marked buy milk as undone"));
    assert_eq!(store.last_request().path, "/toggle");

    let reply = http.delete(&TaskId::new(dog.clone())).await.unwrap();
    assert_eq!(reply.message.as_deref(), Some("Deleted walk dog"));
    assert_eq!(store.last_request().body, json!({ "id": dog }));

    let err = http.delete(&TaskId::new(dog)).await.unwrap_err();
    assert_eq!(err.spoken_message(), "Task not found");
}

#[tokio::test]
async fn test_clear() {
    let store = Shared::default();
    store.seed("buy milk", false, 1);
    let http = client(&store).await;

    let reply = http.clear().await.unwrap();
    assert_eq!(reply.message.as_deref(), Some("All tasks cleared"));
    assert_eq!(store.last_request().path, "/clear");
    assert!(http.list(TaskFilter::All).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_store_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let http = HttpTaskStore::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let err = http.clear().await.unwrap_err();
    assert!(matches!(err, Error::Http(_)), "got {err:?}");
    assert_eq!(err.spoken_message(), "Network error.");

    assert!(http.list(TaskFilter::All).await.is_err());
}

#[tokio::test]
async fn test_voice_commands_over_http() {
    let store = Shared::default();
    store.seed("Call mom", false, 1);
    let http = Arc::new(client(&store).await);

    let synth = RecordingSynth::new();
    let view = RecordingView::new();
    let feedback = Feedback::new(synth.clone(), RecordingDisplay::new());
    let handler = CommandHandler::new(http, feedback, view.clone());

    handler.handle_transcript("add Buy Milk").await;
    assert_eq!(synth.count("Added Buy Milk"), 1);
    assert_eq!(view.last().unwrap().len(), 2);

    handler.handle_transcript("mark call mom as done").await;
    assert_eq!(synth.count("Marked Call mom as done"), 1);

    handler.handle_transcript("list completed").await;
    assert_eq!(synth.count("You have 1 completed task: Call mom."), 1);

    let paths: Vec<String> = store.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec![
            "/add", "/tasks", // add, refresh
            "/tasks", "/mark", "/tasks", // resolve, mark, refresh
            "/tasks", // summary
        ]
    );
}

#[tokio::test]
async fn test_bad_timestamp_does_not_hide_the_list() {
    let store = Shared::default();
    store.seed("buy milk", false, 1);
    let odd = store.seed("walk dog", false, 1);
    store.tasks.lock().unwrap()[1]["created_at"] = json!("yesterday");
    let http = Arc::new(client(&store).await);

    let tasks = http.list(TaskFilter::All).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks[0].created_at.is_some());
    assert_eq!(tasks[1].id, TaskId::new(odd));
    assert_eq!(tasks[1].created_at, None);

    let synth = RecordingSynth::new();
    let feedback = Feedback::new(synth.clone(), RecordingDisplay::new());
    let handler = CommandHandler::new(http, feedback, RecordingView::new());
    handler.handle_transcript("mark walk dog as done").await;
    assert_eq!(synth.count("Marked walk dog as done"), 1);
}
