//! Demo session server.
//!
//! `crumb serve` - Start an HTTP server exercising the session lifecycle.
//!
//! Routes:
//! - `POST /login` - form field `username`; issues a session for that subject
//! - `GET /session` - current session, renewed on every call
//! - `POST /logout` - clears the session cookie
//! - `GET /healthz` - liveness

use super::token::load_config;
use anyhow::Context;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use crumb_session::{ErrorKind, SessionError, SessionHandler, SessionState};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionHandler>,
}

impl AppState {
    pub fn new(sessions: SessionHandler) -> Self {
        Self {
            sessions: Arc::new(sessions),
        }
    }
}

/// Session failures as HTTP responses.
struct ApiError(SessionError);

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::TransportFailure | ErrorKind::Configuration => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = json!({
            "state": SessionState::from(&self.0).as_str(),
            "error": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/session", get(current_session))
        .route("/logout", post(logout))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the demo server and block until Ctrl-C.
pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let sessions =
        SessionHandler::from_config(&config).context("Failed to build the session handler")?;
    let app = router(AppState::new(sessions));

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(address = %addr, "crumb demo server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("crumb demo server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
    }
}

/// No credential check: whoever posts a username gets a session for it.
async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let username = form.username.trim();
    if username.is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "username is required" })),
        )
            .into_response());
    }

    let session = state.sessions.new_session().with_subject(username);
    let mut headers = HeaderMap::new();
    state.sessions.save_session(&mut headers, &session)?;

    tracing::info!(subject = username, "Logged in");
    Ok((headers, Json(json!({ "state": "live", "session": session }))).into_response())
}

async fn current_session(
    State(state): State<AppState>,
    request_headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (session, session_state) = state.sessions.resolve(&request_headers)?;

    let mut headers = HeaderMap::new();
    state.sessions.save_session(&mut headers, &session)?;

    Ok((
        headers,
        Json(json!({ "state": session_state.as_str(), "session": session })),
    )
        .into_response())
}

async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut headers = HeaderMap::new();
    state.sessions.delete_session(&mut headers)?;
    Ok((headers, Json(json!({ "ok": true }))).into_response())
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": "crumb" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
    use crumb_core::CookieConfig;
    use crumb_session::CookieFactory;
    use crumb_token::{KeyMaterial, SigningMethod, TokenSigner};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let signer =
            TokenSigner::new(SigningMethod::Hs256, KeyMaterial::secret("serve-test-secret"))
                .unwrap();
        let cookies = CookieFactory::new(CookieConfig {
            secure: false,
            ..CookieConfig::default()
        });
        router(AppState::new(SessionHandler::new(cookies, Arc::new(signer))))
    }

    fn login_request(username: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={username}")))
            .unwrap()
    }

    fn session_request(cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/session");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    /// `name=value` of the response's Set-Cookie header.
    fn cookie_pair(res: &Response) -> String {
        let set_cookie = res
            .headers()
            .get(SET_COOKIE)
            .expect("response sets a cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let res = app()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["ok"], true);
    }

    #[tokio::test]
    async fn test_login_then_session() {
        let app = app();

        let res = app.clone().oneshot(login_request("jpj")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = cookie_pair(&res);
        assert!(cookie.starts_with("crumb_session="));

        let res = app
            .oneshot(session_request(Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(SET_COOKIE));
        let body = json_body(res).await;
        assert_eq!(body["state"], "live");
        assert_eq!(body["session"]["sub"], "jpj");
    }

    #[tokio::test]
    async fn test_session_without_cookie_is_issued() {
        let res = app().oneshot(session_request(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(SET_COOKIE));

        let body = json_body(res).await;
        assert_eq!(body["state"], "absent");
        assert!(body["session"]["jti"].is_string());
    }

    #[tokio::test]
    async fn test_tampered_cookie_is_unauthorized() {
        let app = app();
        let res = app.clone().oneshot(login_request("jpj")).await.unwrap();
        let cookie = cookie_pair(&res);

        // Swap the payload for one claiming another subject
        let (prefix, rest) = cookie.split_once('.').unwrap();
        let signature = rest.rsplit('.').next().unwrap();
        let forged = format!("{prefix}.eyJzdWIiOiJhZG1pbiJ9.{signature}");

        let res = app.oneshot(session_request(Some(&forged))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(!res.headers().contains_key(SET_COOKIE));
        assert_eq!(json_body(res).await["state"], "invalid");
    }

    #[tokio::test]
    async fn test_logout_expires_cookie() {
        let res = app()
            .oneshot(
                Request::post("/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let set_cookie = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=0"));
        let cookie = cookie_pair(&res);

        // A client that keeps the cleared cookie gets a renewed session
        let res = app().oneshot(session_request(Some(&cookie))).await.unwrap();
        assert_eq!(json_body(res).await["state"], "renewed");
    }

    #[tokio::test]
    async fn test_login_requires_username() {
        let res = app().oneshot(login_request("")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
