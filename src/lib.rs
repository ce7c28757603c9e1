pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod session;
pub mod state;
pub mod upstream;
pub mod views;

use axum::{routing::get, routing::post, Router};
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use state::AppState;

/// The complete admin application.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Public
        .merge(public_routes())
        // Protected (session cookie required)
        .merge(protected_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public;

    Router::new().route("/login", get(public::login_get).post(public::login_post))
}

fn protected_routes() -> Router<AppState> {
    use handlers::protected;

    Router::new()
        .route("/", get(protected::index))
        .route("/logout", post(protected::logout))
        .route("/users", get(protected::users_index))
        .route(
            "/users/:id",
            get(protected::user_show).post(protected::user_action),
        )
        .route("/devices", get(protected::devices_index))
        .route(
            "/devices/:id",
            get(protected::device_show).post(protected::device_action),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = AppConfig::from_lookup(|key| match key {
            "OSEM_API_URL" => Some("http://127.0.0.1:9".to_string()),
            "MAPTILER_KEY" => Some("key".to_string()),
            "SESSION_SECRET" => Some("secret".to_string()),
            _ => None,
        })
        .unwrap();
        app(AppState::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_protected_route_redirects() {
        let response = test_app()
            .oneshot(Request::get("/devices").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login?redirectTo=%2Fdevices"
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = test_app()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
