use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::AppState;
use crate::auth;
use crate::entity::location;
use crate::error::ApiError;
use crate::store::DEFAULT_LIST_LIMIT;

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/locations", post(create_location).get(list_locations))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    Router::new().nest("/api", api).with_state(state)
}

async fn create_location(
    State(state): State<AppState>,
    payload: Result<Json<LocationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Rejected location body");
        ApiError::Validation("Failed to parse JSON".to_string())
    })?;

    let id = state
        .store
        .create(payload.latitude, payload.longitude)
        .await
        .map_err(|source| {
            metrics::counter!("beacon_store_errors_total", "op" => "create").increment(1);
            ApiError::Store {
                context: "Failed to save location",
                source,
            }
        })?;

    metrics::counter!("beacon_locations_created_total").increment(1);
    info!(location_id = id, "Location saved");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Location saved successfully".to_string(),
        }),
    ))
}

async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<location::Model>>, ApiError> {
    let locations = state
        .store
        .list_latest(DEFAULT_LIST_LIMIT)
        .await
        .map_err(|source| {
            metrics::counter!("beacon_store_errors_total", "op" => "list").increment(1);
            ApiError::Store {
                context: "Failed to retrieve locations",
                source,
            }
        })?;

    Ok(Json(locations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ApiToken;
    use crate::error::ErrorResponse;
    use crate::store::LocationStore;
    use axum::body::Body;
    use axum::http::{Request, header};
    use sea_orm::Database;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt; // For `oneshot`

    const TOKEN: &str = "test-secret";

    async fn test_app() -> Router {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        migration::Migrator::run(&db)
            .await
            .expect("Failed to run migrations");

        router(AppState {
            store: LocationStore::new(db),
            token: Arc::new(ApiToken::new(TOKEN)),
        })
    }

    fn post_location(body: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .uri("/api/locations")
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_locations(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/locations").method("GET");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_create_location_with_bearer_token() {
        let app = test_app().await;
        let body = json!({"latitude": 51.5, "longitude": -0.12}).to_string();

        let response = app
            .oneshot(post_location(&body, Some("Bearer test-secret")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let data: MessageResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(data.message, "Location saved successfully");
    }

    #[tokio::test]
    async fn test_create_location_with_bare_token() {
        let app = test_app().await;

        let response = app
            .oneshot(post_location(
                r#"{"latitude":1.0,"longitude":2.0}"#,
                Some(TOKEN),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_create_location_without_token() {
        let app = test_app().await;

        let response = app
            .oneshot(post_location(r#"{"latitude":51.5,"longitude":-0.12}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let data: ErrorResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(data.error, "Unauthorized - Missing authentication token");
    }

    #[tokio::test]
    async fn test_create_location_with_wrong_token() {
        let app = test_app().await;

        let response = app
            .oneshot(post_location(
                r#"{"latitude":51.5,"longitude":-0.12}"#,
                Some("Bearer nope"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_is_checked_before_body() {
        let app = test_app().await;

        let response = app
            .oneshot(post_location(r#"{"latitude":"x"}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_bad_requests() {
        let app = test_app().await;

        for body in [
            r#"{"latitude":"x"}"#,
            r#"{"latitude":51.5}"#,
            r#"{"latitude":51.5,"longitude":null}"#,
            "not json",
        ] {
            let response = app
                .clone()
                .oneshot(post_location(body, Some("Bearer test-secret")))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
            let data: ErrorResponse = serde_json::from_value(body_json(response).await).unwrap();
            assert_eq!(data.error, "Failed to parse JSON");
        }
    }

    #[tokio::test]
    async fn test_list_returns_ten_newest_first() {
        let app = test_app().await;

        for i in 0..12 {
            let body = json!({"latitude": i as f64, "longitude": 0.5}).to_string();
            let response = app
                .clone()
                .oneshot(post_location(&body, Some("Bearer test-secret")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .oneshot(get_locations(Some("Bearer test-secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let data = body_json(response).await;
        let items = data.as_array().unwrap();
        assert_eq!(items.len(), 10);

        let latitudes: Vec<f64> = items
            .iter()
            .map(|item| item["latitude"].as_f64().unwrap())
            .collect();
        let expected: Vec<f64> = (2..12).rev().map(|i| i as f64).collect();
        assert_eq!(latitudes, expected);

        let first = &items[0];
        assert!(first["id"].is_i64());
        assert!(first["createdAt"].is_string());
        assert_eq!(first["longitude"], json!(0.5));
        assert!(first.get("userId").is_none());
    }

    #[tokio::test]
    async fn test_list_requires_token() {
        let app = test_app().await;

        let response = app.oneshot(get_locations(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
