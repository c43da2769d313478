//! REST API server for the tax advisory engine
//!
//! Exposes the advisor via HTTP endpoints for the dashboard UI.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::advisor::TaxAdvisor;
use crate::error::AdvisoryError;
use crate::models::{TaxAnalysis, Transaction};
use crate::savings::SavingsInsights;
use crate::Result;

/// Transactions returned by the listing endpoint
pub const MAX_LISTED_TRANSACTIONS: usize = 100;

// =============================
// Request / Response Models
// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyzeTaxRequest {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataCheckResponse {
    #[serde(rename = "hasData")]
    pub has_data: bool,
}

// =============================
// API State
// =============================

#[derive(Clone)]
pub struct ApiState {
    pub advisor: Arc<TaxAdvisor>,
}

// =============================
// Health Endpoint
// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// =============================
// Tax Analysis Endpoint
// =============================

/// Unwrap the request body, turning extractor rejections into JSON errors.
fn required_user_id(
    payload: std::result::Result<Json<AnalyzeTaxRequest>, JsonRejection>,
) -> Result<String> {
    let Json(req) = payload.map_err(|rejection| {
        AdvisoryError::InvalidRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    req.user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AdvisoryError::InvalidRequest("User ID required".to_string()))
}

async fn analyze_tax(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<AnalyzeTaxRequest>, JsonRejection>,
) -> Result<Json<TaxAnalysis>> {
    let user_id = required_user_id(payload)?;

    info!("Analyzing tax for: {}", user_id);

    let analysis = state.advisor.analyze(&user_id).await?;
    Ok(Json(analysis))
}

// =============================
// Savings Endpoint
// =============================

async fn analyze_savings(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<AnalyzeTaxRequest>, JsonRejection>,
) -> Result<Json<SavingsInsights>> {
    let user_id = required_user_id(payload)?;

    info!("Analyzing savings for: {}", user_id);

    let insights = state.advisor.analyze_savings(&user_id).await?;
    Ok(Json(insights))
}

// =============================
// Transaction Endpoints
// =============================

async fn list_transactions(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Transaction>>> {
    let transactions = state
        .advisor
        .store()
        .recent_transactions(&user_id, MAX_LISTED_TRANSACTIONS)
        .await?;
    Ok(Json(transactions))
}

async fn check_data(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<DataCheckResponse>> {
    let count = state.advisor.store().count_transactions(&user_id).await?;
    Ok(Json(DataCheckResponse {
        has_data: count > 0,
    }))
}

// =============================
// Router
// =============================

pub fn create_router(advisor: Arc<TaxAdvisor>) -> Router {
    let state = ApiState { advisor };

    Router::new()
        .route("/health", get(health))
        .route("/analyze-tax", post(analyze_tax))
        .route("/api/analyze-tax", post(analyze_tax))
        .route("/api/analyze-savings", post(analyze_savings))
        .route("/api/transactions/:user_id", get(list_transactions))
        .route("/api/check-data/:user_id", get(check_data))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// =============================
// Server Startup
// =============================

pub async fn start_server(
    advisor: Arc<TaxAdvisor>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(advisor);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::tests::{test_invoker, ScriptedProvider};
    use crate::extraction::FactExtractor;
    use crate::store::InMemoryTransactionStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn router(store: InMemoryTransactionStore, replies: Vec<Result<String>>) -> Router {
        let provider = Arc::new(ScriptedProvider::new(replies));
        let advisor = TaxAdvisor::new(
            Arc::new(store),
            FactExtractor::new(provider, test_invoker()),
        );
        create_router(Arc::new(advisor))
    }

    fn seeded_store() -> InMemoryTransactionStore {
        InMemoryTransactionStore::with_transactions(
            "aditya@gmail.com",
            vec![
                Transaction::new("Salary credit", 900000.0),
                Transaction::new("PPF deposit", -150000.0),
            ],
        )
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        read(response).await
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        read(response).await
    }

    async fn read(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_analyze_tax_success() {
        let app = router(
            seeded_store(),
            vec![Ok(r#"{"total_income": 900000, "deductions_80c": 150000, "deductions_80d": 25000, "findings": ["PPF"]}"#.to_string())],
        );

        let (status, body) =
            post_json(app, "/analyze-tax", r#"{"userId": "aditya@gmail.com"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tax_comparison"]["old_regime_tax"], 47500);
        assert_eq!(body["tax_comparison"]["new_regime_tax"], 22500);
        assert_eq!(body["tax_comparison"]["recommendation"], "New Regime");
        assert_eq!(body["analysis"]["detected_deductions"]["80d"], 25000.0);
    }

    #[tokio::test]
    async fn test_unknown_user_is_404() {
        let app = router(seeded_store(), vec![]);
        let (status, body) = post_json(app, "/api/analyze-tax", r#"{"userId": "nobody"}"#).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No transactions found");
    }

    #[tokio::test]
    async fn test_missing_user_id_is_400() {
        let app = router(seeded_store(), vec![]);
        let (status, body) = post_json(app, "/analyze-tax", r#"{"userId": "  "}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User ID required");
    }

    #[tokio::test]
    async fn test_unparseable_body_is_json_400() {
        let app = router(seeded_store(), vec![]);
        let (status, body) = post_json(app, "/analyze-tax", "not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_json_400() {
        let app = router(seeded_store(), vec![]);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/analyze-tax")
                    .body(Body::from(r#"{"userId": "aditya@gmail.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_analyze_savings() {
        let app = router(
            seeded_store(),
            vec![Ok(r#"{"monthly_income": 75000, "monthly_expense": 50000, "potential_savings": 6000, "wasteful_spends": [], "ai_advice": "Keep investing in PPF"}"#.to_string())],
        );

        let (status, body) =
            post_json(app, "/api/analyze-savings", r#"{"userId": "aditya@gmail.com"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_savings"], 25000.0);
        assert_eq!(body["ai_advice"], "Keep investing in PPF");

        let (status, body) = post_json(
            router(seeded_store(), vec![]),
            "/api/analyze-savings",
            r#"{"userId": "nobody"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No transactions found");
    }

    #[tokio::test]
    async fn test_exhausted_retries_is_500() {
        let replies = (0..5)
            .map(|_| Err(AdvisoryError::TransientUnavailable("503".into())))
            .collect();
        let app = router(seeded_store(), replies);

        let (status, body) =
            post_json(app, "/analyze-tax", r#"{"userId": "aditya@gmail.com"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], crate::error::OVERLOADED_MESSAGE);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_500() {
        let app = router(seeded_store(), vec![Ok("Sorry, I can't help".to_string())]);

        let (status, body) =
            post_json(app, "/analyze-tax", r#"{"userId": "aditya@gmail.com"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Malformed inference response"));
    }

    #[tokio::test]
    async fn test_transaction_listing_and_check() {
        let (status, body) = get_json(
            router(seeded_store(), vec![]),
            "/api/transactions/aditya@gmail.com",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["description"], "PPF deposit");

        let (_, body) = get_json(router(seeded_store(), vec![]), "/api/check-data/aditya@gmail.com").await;
        assert_eq!(body["hasData"], true);

        let (_, body) = get_json(router(seeded_store(), vec![]), "/api/check-data/nobody").await;
        assert_eq!(body["hasData"], false);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(router(seeded_store(), vec![]), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}
