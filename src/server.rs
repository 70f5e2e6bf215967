use crate::config::AppConfig;
use crate::data::Dataset;
use crate::processing::{evaluate, Outcome};
use crate::render::{map_view, render_page, MapView, PageState};
use crate::types::{PharmacyRecord, Selection};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub struct AppState {
    pub dataset: Dataset,
    pub config: AppConfig,
}

// Repeated `category=` pairs; selection re-sorts them into display order
type RawQuery = Query<Vec<(String, String)>>;

#[derive(Serialize)]
pub struct PharmacyResponse {
    selected: Vec<String>,
    warning: Option<String>,
    records: Vec<PharmacyRecord>,
    map: Option<MapView>,
}

/// Failure surfaced to the client as a 500.
pub struct ServerError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ServerError {
    fn from(err: E) -> Self {
        ServerError(err.into())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        error!("Request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", self.0)).into_response()
    }
}

fn requested_categories(params: Vec<(String, String)>) -> Vec<String> {
    params
        .into_iter()
        .filter(|(key, _)| key == "category")
        .map(|(_, value)| value)
        .collect()
}

fn run_cycle(state: &AppState, params: Vec<(String, String)>) -> Result<Outcome> {
    let records = state.dataset.load()?;
    let raw = requested_categories(params);
    Ok(evaluate(&records, &raw, state.config.selection.max_selected))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/api/categories", get(categories_handler))
        .route("/api/pharmacies", get(pharmacies_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState { dataset, config });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Serving pharmacy finder on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn page_handler(
    State(state): State<Arc<AppState>>,
    Query(params): RawQuery,
) -> Result<Html<String>, ServerError> {
    let outcome = run_cycle(&state, params)?;
    Ok(Html(render_page(&PageState {
        config: &state.config,
        categories: &outcome.categories,
        selection: &outcome.selection,
        matches: &outcome.matches,
    })))
}

async fn categories_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ServerError> {
    let outcome = run_cycle(&state, Vec::new())?;
    Ok(Json(outcome.categories))
}

async fn pharmacies_handler(
    State(state): State<Arc<AppState>>,
    Query(params): RawQuery,
) -> Result<Json<PharmacyResponse>, ServerError> {
    let Outcome { selection, matches, .. } = run_cycle(&state, params)?;
    let Selection { categories, warning } = selection;
    let map = map_view(&matches);
    Ok(Json(PharmacyResponse { selected: categories, warning, records: matches, map }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn record(name: &str, items: &str, coords: Option<(f64, f64)>) -> PharmacyRecord {
        PharmacyRecord {
            name: name.to_string(),
            address: format!("{} 주소", name),
            phone: "041-000-0000".to_string(),
            collected_items: Some(items.to_string()),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
        }
    }

    fn app(records: Vec<PharmacyRecord>) -> Router {
        let config = AppConfig::for_dataset(PathBuf::from("unused.csv"));
        let dataset = Dataset::from_records(config.input.clone(), records);
        router(Arc::new(AppState { dataset, config }))
    }

    fn sample() -> Vec<PharmacyRecord> {
        vec![
            record("가온약국", "혈압약, 진통제", Some((36.80, 127.10))),
            record("나래약국", "진통제", None),
            record("다솜약국", "연고, 시럽", Some((36.82, 127.14))),
            record("라온약국", "안약", Some((36.84, 127.12))),
        ]
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let (status, body) = get_body(app, uri).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_str(&body).unwrap()
    }

    fn encoded(category: &str) -> String {
        category
            .bytes()
            .map(|b| if b.is_ascii_alphanumeric() { (b as char).to_string() } else { format!("%{:02X}", b) })
            .collect()
    }

    #[tokio::test]
    async fn lists_sorted_categories() {
        let json = get_json(app(sample()), "/api/categories").await;
        assert_eq!(json, serde_json::json!(["시럽", "안약", "연고", "진통제", "혈압약"]));
    }

    #[tokio::test]
    async fn shared_category_returns_both_pharmacies() {
        let uri = format!("/api/pharmacies?category={}", encoded("진통제"));
        let json = get_json(app(sample()), &uri).await;

        assert_eq!(json["selected"], serde_json::json!(["진통제"]));
        assert!(json["warning"].is_null());
        assert_eq!(json["records"].as_array().unwrap().len(), 2);
        // Only the located pharmacy is plotted
        let markers = json["map"]["markers"].as_array().unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0]["label"], "가온약국");
    }

    #[tokio::test]
    async fn over_limit_selection_is_truncated_with_warning() {
        let uri = format!(
            "/api/pharmacies?category={}&category={}&category={}&category={}",
            encoded("시럽"),
            encoded("안약"),
            encoded("연고"),
            encoded("진통제")
        );
        let json = get_json(app(sample()), &uri).await;

        assert_eq!(json["selected"], serde_json::json!(["시럽", "안약", "연고"]));
        assert_eq!(json["warning"], "❗ 최대 3개까지만 선택할 수 있어요");
        let names: Vec<&str> = json["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["다솜약국", "라온약국"]);
    }

    #[tokio::test]
    async fn reversed_query_keeps_first_checkboxes() {
        let uri = format!(
            "/api/pharmacies?category={}&category={}&category={}&category={}",
            encoded("진통제"),
            encoded("연고"),
            encoded("안약"),
            encoded("시럽")
        );
        let json = get_json(app(sample()), &uri).await;
        assert_eq!(json["selected"], serde_json::json!(["시럽", "안약", "연고"]));
        assert!(json["warning"].is_string());
    }

    #[tokio::test]
    async fn unlocated_only_match_has_no_map() {
        let records = vec![record("나래약국", "진통제", None)];
        let uri = format!("/api/pharmacies?category={}", encoded("진통제"));
        let json = get_json(app(records), &uri).await;
        assert_eq!(json["records"].as_array().unwrap().len(), 1);
        assert!(json["map"].is_null());
    }

    #[tokio::test]
    async fn located_matches_center_on_mean() {
        let records = vec![
            record("1", "진통제", Some((36.0, 127.0))),
            record("2", "진통제", Some((37.0, 128.0))),
            record("3", "진통제", Some((38.0, 126.0))),
        ];
        let uri = format!("/api/pharmacies?category={}", encoded("진통제"));
        let json = get_json(app(records), &uri).await;

        let center = &json["map"]["center"];
        assert!((center[0].as_f64().unwrap() - 37.0).abs() < 1e-9);
        assert!((center[1].as_f64().unwrap() - 127.0).abs() < 1e-9);
        assert_eq!(json["map"]["bounds"], serde_json::json!([[36.0, 126.0], [38.0, 128.0]]));
    }

    #[tokio::test]
    async fn page_without_selection_prompts() {
        let (status, body) = get_body(app(sample()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(crate::render::NO_SELECTION_PROMPT));
        assert!(body.contains("name=\"category\" value=\"혈압약\""));
    }

    #[tokio::test]
    async fn page_renders_banner_table_and_map() {
        let (status, body) = get_body(app(sample()), &format!("/?category={}", encoded("진통제"))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("약국 2곳"));
        assert!(body.contains("<td>나래약국</td>"));
        assert!(body.contains("id=\"map\""));
    }

    #[tokio::test]
    async fn unknown_category_leaves_selection_empty() {
        let (_, body) = get_body(app(sample()), &format!("/?category={}", encoded("소화제"))).await;
        assert!(body.contains(crate::render::NO_SELECTION_PROMPT));
        assert!(!body.contains("<table"));
    }
}
