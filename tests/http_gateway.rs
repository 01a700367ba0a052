use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use campus_shelf::gateway::{build_client, check_health};
use campus_shelf::{
    Article, CatalogItem, CatalogLoader, CollectionGateway, Event, Exam, FilterState, GatewayConfig,
    GatewayError, HttpGateway, ItemId, Note, SortKey, SortOrder,
};

#[derive(Debug, Clone)]
struct Seen {
    query: HashMap<String, String>,
    auth: Option<String>,
    requested_with: Option<String>,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn record(log: &Log, query: HashMap<String, String>, headers: &HeaderMap) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    log.lock().unwrap().push(Seen {
        query,
        auth: header("authorization"),
        requested_with: header("x-requested-with"),
    });
}

async fn notes(
    State(log): State<Log>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let page: u64 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    record(&log, query, &headers);
    let first = page * 10;
    Json(json!({
        "status": true,
        "data": {
            "notes": [
                {"id": first, "title": format!("Calculus {first}"), "university": {"name": "METU"}},
                {"id": first + 1, "title": format!("Physics {}", first + 1), "likes": "4"}
            ],
            "pagination": {"current_page": page, "last_page": 2, "total": 4, "has_more": page < 2}
        }
    }))
}

async fn note_detail(Path(id): Path<String>) -> impl IntoResponse {
    if id == "404" {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Note not found"})));
    }
    (
        StatusCode::OK,
        Json(json!({"data": {"note": {"id": id, "title": "Thermodynamics", "content": "..."}}})),
    )
}

async fn exams(Query(query): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    let page: u64 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    Json(json!({
        "data": {
            "exams": [{"id": format!("e{page}"), "name": "Midterm", "total_marks": 100}],
            "meta": {"current_page": page, "last_page": 3}
        }
    }))
}

async fn articles() -> impl IntoResponse {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"error": "Invalid sort field"})))
}

async fn events() -> Json<serde_json::Value> {
    Json(json!([
        {"id": 1, "title": "Hackathon", "startDate": "2024-05-01", "isOnline": true},
        {"id": 2, "title": "Career fair", "type": "fair"}
    ]))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "OK"}))
}

async fn spawn_api() -> (String, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/api/public/notes", get(notes))
        .route("/api/public/notes/:id", get(note_detail))
        .route("/api/public/exams", get(exams))
        .route("/api/public/articles", get(articles))
        .route("/api/public/events", get(events))
        .route("/api/v1/health", get(health))
        .with_state(Arc::clone(&log));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    (format!("http://{addr}/api"), log)
}

fn config(base: &str, per_page: u32) -> GatewayConfig {
    GatewayConfig {
        per_page,
        ..GatewayConfig::new(base)
    }
}

#[tokio::test]
async fn filter_travels_as_query_parameters() {
    let (base, log) = spawn_api().await;
    let gateway = HttpGateway::<Note>::new(GatewayConfig {
        bearer_token: Some("secret".to_string()),
        ..config(&base, 2)
    })
    .unwrap();
    let filter = FilterState::new()
        .with_query("  calculus ")
        .with_university("METU")
        .with_year("2")
        .with_sort(SortKey::Likes)
        .with_order(SortOrder::Asc);

    let page = gateway.fetch_page(1, &filter).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.has_more);
    assert_eq!(page.items[0].university.as_deref(), Some("METU"));
    assert_eq!(page.items[1].likes, Some(4));

    let seen = log.lock().unwrap()[0].clone();
    assert_eq!(seen.query["page"], "1");
    assert_eq!(seen.query["per_page"], "2");
    assert_eq!(seen.query["search"], "calculus");
    assert_eq!(seen.query["university"], "METU");
    assert_eq!(seen.query["year"], "2");
    assert_eq!(seen.query["sort_by"], "likes");
    assert_eq!(seen.query["sort_order"], "asc");
    assert!(!seen.query.contains_key("department"));
    assert_eq!(seen.auth.as_deref(), Some("Bearer secret"));
    assert_eq!(seen.requested_with.as_deref(), Some("XMLHttpRequest"));
}

#[tokio::test]
async fn loader_pages_through_a_live_collection() {
    let (base, log) = spawn_api().await;
    let loader = CatalogLoader::new(HttpGateway::<Note>::new(config(&base, 2)).unwrap());

    assert!(loader.set_filter(FilterState::newest_first()).await.is_loaded());
    assert!(loader.request_next_page().await.is_loaded());
    assert!(!loader.request_next_page().await.is_loaded());

    let titles: Vec<String> = loader
        .items()
        .await
        .iter()
        .map(|n| n.title().to_string())
        .collect();
    assert_eq!(titles, vec!["Calculus 10", "Physics 11", "Calculus 20", "Physics 21"]);
    assert!(!loader.status().await.has_more);
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn meta_envelope_continues_until_last_page() {
    let (base, _) = spawn_api().await;
    let gateway = HttpGateway::<Exam>::new(config(&base, 9)).unwrap();

    let second = gateway.fetch_page(2, &FilterState::new()).await.unwrap();
    let third = gateway.fetch_page(3, &FilterState::new()).await.unwrap();

    assert!(second.has_more);
    assert!(!third.has_more);
    assert_eq!(third.items[0].item_id(), &ItemId::from("e3"));
    assert_eq!(third.items[0].title(), "Midterm");
}

#[tokio::test]
async fn bare_array_short_page_is_the_last() {
    let (base, _) = spawn_api().await;
    let gateway = HttpGateway::<Event>::new(config(&base, 9)).unwrap();

    let page = gateway.fetch_page(1, &FilterState::new()).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(!page.has_more);
    assert!(page.items[0].is_online);
    assert_eq!(page.items[1].event_type.as_deref(), Some("fair"));
}

#[tokio::test]
async fn server_error_message_is_surfaced() {
    let (base, _) = spawn_api().await;
    let gateway = HttpGateway::<Article>::new(config(&base, 9)).unwrap();

    match gateway.fetch_page(1, &FilterState::new()).await {
        Err(GatewayError::Status { status, message }) => {
            assert_eq!(status, 422);
            assert_eq!(message, "Invalid sort field");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn detail_record_is_unwrapped() {
    let (base, _) = spawn_api().await;
    let gateway = HttpGateway::<Note>::new(config(&base, 9)).unwrap();

    let note = gateway.fetch_item(&ItemId::from("31")).await.unwrap();
    assert_eq!(note.title(), "Thermodynamics");
    assert_eq!(note.item_id().as_str(), "31");

    let missing = gateway.fetch_item(&ItemId::from("404")).await;
    assert!(matches!(missing, Err(GatewayError::Status { status: 404, .. })));
}

#[tokio::test]
async fn health_reports_online_and_offline() {
    let (base, _) = spawn_api().await;
    let up = config(&base, 9);
    let client = build_client(&up).unwrap();
    let status = check_health(&client, &up).await;
    assert!(status.online);
    assert_eq!(status.status, "OK");

    // Nothing listens on the discard port.
    let down = config("http://127.0.0.1:9/api", 9);
    let status = check_health(&client, &down).await;
    assert!(!status.online);
    assert_eq!(status.status, "Error");
}
