use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::state::AppState;
use crate::{accounts, auth};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(accounts::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, server: &ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const PASSWORD: &str = "Abc12345!";

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    /// Registers the first operator and returns a session token for them.
    async fn bootstrap(app: &Router) -> String {
        let (status, _) = send(
            app,
            "POST",
            "/api/v1/accounts",
            None,
            Some(json!({"name": "Admin", "email": "admin@doces.com", "password": PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "admin@doces.com", "password": PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, "GET", "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn first_account_can_register_without_session_but_second_cannot() {
        let app = build_app(AppState::fake());
        let token = bootstrap(&app).await;

        let new_user = json!({"name": "Bia", "email": "bia@doces.com", "password": PASSWORD});
        let (status, _) =
            send(&app, "POST", "/api/v1/accounts", None, Some(new_user.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            send(&app, "POST", "/api/v1/accounts", Some(&token), Some(new_user)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "active");
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn login_returns_session_and_me_reflects_last_access() {
        let app = build_app(AppState::fake());
        let token = bootstrap(&app).await;

        let (status, me) = send(&app, "GET", "/api/v1/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "admin@doces.com");
        assert!(me["last_access"].is_string());
    }

    #[tokio::test]
    async fn failed_logins_look_the_same() {
        let app = build_app(AppState::fake());
        bootstrap(&app).await;

        let (s1, wrong_password) = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "admin@doces.com", "password": "Nope1234!"})),
        )
        .await;
        let (s2, unknown_email) = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ghost@doces.com", "password": PASSWORD})),
        )
        .await;
        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s2, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password, unknown_email);
        assert_eq!(wrong_password["error"], "authentication_failure");
    }

    #[tokio::test]
    async fn weak_password_is_a_bad_request() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/accounts",
            None,
            Some(json!({"name": "Admin", "email": "admin@doces.com", "password": "abc12345"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert!(!body.to_string().contains("abc12345"));
    }

    #[tokio::test]
    async fn account_routes_require_a_session() {
        let app = build_app(AppState::fake());
        bootstrap(&app).await;
        let (status, _) = send(&app, "GET", "/api/v1/accounts", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, "DELETE", "/api/v1/accounts/1", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registration_with_a_bad_token_reports_the_token_problem() {
        let app = build_app(AppState::fake());
        bootstrap(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/accounts",
            Some("garbage"),
            Some(json!({"name": "Bia", "email": "bia@doces.com", "password": PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, Value::String("Invalid or expired token".into()));

        // refused before the payload is looked at
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/accounts",
            None,
            Some(json!({"name": "Bia", "email": "bia@doces.com", "password": "weak"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, Value::String("Missing Authorization header".into()));
    }

    #[tokio::test]
    async fn update_with_blank_name_is_a_bad_request() {
        let app = build_app(AppState::fake());
        let token = bootstrap(&app).await;
        let (status, body) = send(
            &app,
            "PUT",
            "/api/v1/accounts/1",
            Some(&token),
            Some(json!({"name": "  ", "email": "admin@doces.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");

        let (_, me) = send(&app, "GET", "/api/v1/me", Some(&token), None).await;
        assert_eq!(me["name"], "Admin");
    }

    #[tokio::test]
    async fn edit_list_and_delete_round_trip() {
        let app = build_app(AppState::fake());
        let token = bootstrap(&app).await;

        let (_, created) = send(
            &app,
            "POST",
            "/api/v1/accounts",
            Some(&token),
            Some(json!({"name": "Bia", "email": "bia@doces.com", "phone": "1199", "password": PASSWORD})),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/v1/accounts/{id}"),
            Some(&token),
            Some(json!({"name": "Beatriz", "email": "beatriz@doces.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Beatriz");
        assert!(updated["phone"].is_null());
        assert!(updated["last_modified"].is_string());
        assert_eq!(updated["password_expiry"], created["password_expiry"]);

        let (status, list) = send(&app, "GET", "/api/v1/accounts", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 2);

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/v1/accounts/{id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(
            &app,
            "DELETE",
            &format!("/api/v1/accounts/{id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (_, list) = send(&app, "GET", "/api/v1/accounts", Some(&token), None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_account_is_not_found() {
        let app = build_app(AppState::fake());
        let token = bootstrap(&app).await;
        let (status, _) = send(
            &app,
            "PUT",
            "/api/v1/accounts/999",
            Some(&token),
            Some(json!({"name": "X", "email": "x@doces.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
