//! `gatesuite serve` — Expose the generator as `POST /api/generate`.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use clap::Args;
use gatesuite_common::config::SuiteConfig;
use gatesuite_common::constants::{DEFAULT_SERVE_PORT, MAX_GENERATE_BODY_BYTES};
use gatesuite_common::error::SuiteError;
use gatesuite_common::types::Topology;
use gatesuite_compose::{ComposeDocument, OptionsRequest, generate};
use serde::{Deserialize, Serialize};

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on.
    #[arg(short, long, env = "SERVE_PORT", default_value_t = DEFAULT_SERVE_PORT)]
    pub port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
}

/// Body of `POST /api/generate`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Topology names to generate.
    pub modes: Vec<String>,
    /// Literal `.env` text; used verbatim when non-blank.
    pub env_override: String,
    /// Generation options; absent means defaults.
    pub options: Option<OptionsRequest>,
}

/// Response of `POST /api/generate`.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// Compose text keyed by topology name.
    pub composes: BTreeMap<String, String>,
    /// Shared `.env` text.
    pub env: String,
}

struct ServeState {
    config: SuiteConfig,
}

/// Builds the router serving the generate endpoint.
pub fn build_router(config: SuiteConfig) -> Router {
    Router::new()
        .route("/api/generate", post(generate_handler))
        .with_state(Arc::new(ServeState { config }))
}

/// Executes the `serve` command, blocking until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the runtime cannot start or the port cannot be bound.
pub fn execute(args: ServeArgs, config: SuiteConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("start async runtime")?;
    runtime.block_on(serve(config, &args.host, args.port))
}

async fn serve(config: SuiteConfig, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(config);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    tracing::info!("generate API listening on http://{addr}/api/generate");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

async fn generate_handler(
    State(state): State<Arc<ServeState>>,
    body: axum::body::Body,
) -> Result<Json<GenerateResponse>, AppError> {
    let bytes = axum::body::to_bytes(body, MAX_GENERATE_BODY_BYTES)
        .await
        .map_err(|_| AppError::status(StatusCode::PAYLOAD_TOO_LARGE, "request body too large"))?;
    let req: GenerateRequest =
        serde_json::from_slice(&bytes).map_err(|_| AppError::status(StatusCode::BAD_REQUEST, "invalid json"))?;
    if req.modes.is_empty() {
        return Err(AppError::status(StatusCode::BAD_REQUEST, "modes required"));
    }
    let topologies = req
        .modes
        .iter()
        .map(|m| m.parse::<Topology>())
        .collect::<Result<Vec<_>, _>>()?;
    let opts = req.options.unwrap_or_default().into_options();
    let canonical = state.config.canonical_compose.clone();
    let env_override = req.env_override;

    let artifacts = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let full = ComposeDocument::load(&canonical)?;
        Ok(generate(&full, &topologies, Some(&env_override), &opts)?)
    })
    .await
    .context("generate task")??;

    Ok(Json(GenerateResponse {
        composes: artifacts
            .composes
            .into_iter()
            .map(|(t, text)| (t.as_str().to_owned(), text))
            .collect(),
        env: artifacts.env,
    }))
}

/// Carries an explicit status through the `anyhow::Error` chain.
#[derive(Debug)]
struct StatusError {
    status: StatusCode,
    message: String,
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StatusError {}

/// Error type for HTTP responses; renders as `{"error": "..."}`.
#[derive(Debug)]
struct AppError(anyhow::Error);

impl AppError {
    fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self(
            StatusError {
                status,
                message: message.into(),
            }
            .into(),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<StatusError>() {
            e.status
        } else if let Some(e) = self.0.downcast_ref::<SuiteError>() {
            match e {
                SuiteError::UnknownTopology { .. } | SuiteError::UnknownMode { .. } => {
                    StatusCode::BAD_REQUEST
                }
                SuiteError::Io { .. }
                | SuiteError::Parse { .. }
                | SuiteError::MissingServices
                | SuiteError::Yaml { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "generate request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const CANONICAL: &str = include_str!("../../../../compose/canonical/docker-compose.yml");

    fn project() -> (tempfile::TempDir, SuiteConfig) {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = SuiteConfig::at(dir.path());
        std::fs::create_dir_all(cfg.canonical_compose.parent().expect("parent")).expect("mkdir");
        std::fs::write(&cfg.canonical_compose, CANONICAL).expect("write");
        (dir, cfg)
    }

    async fn post_raw(app: Router, body: impl Into<Body>) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header("content-type", "application/json")
            .body(body.into())
            .expect("request");
        let response = app.oneshot(req).await.expect("response");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn post_json(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        post_raw(app, serde_json::to_vec(&body).expect("encode")).await
    }

    #[tokio::test]
    async fn generates_requested_topologies() {
        let (_dir, cfg) = project();
        let (status, json) = post_json(
            build_router(cfg),
            serde_json::json!({ "modes": ["traefik-warden", "traefik-herald"] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let composes = json["composes"].as_object().expect("composes");
        assert_eq!(composes.len(), 2);
        assert!(composes["traefik-warden"].as_str().expect("text").contains("warden-redis"));
        assert!(json["env"].as_str().expect("env").contains("WARDEN_IMAGE="));
    }

    #[tokio::test]
    async fn options_and_env_override_are_applied() {
        let (_dir, cfg) = project();
        let (status, json) = post_json(
            build_router(cfg),
            serde_json::json!({
                "modes": ["traefik-stargate"],
                "envOverride": "LOG_LEVEL=debug\n",
                "options": { "containerNamePrefix": "foo-", "exposePorts": false }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let text = json["composes"]["traefik-stargate"].as_str().expect("text");
        assert!(text.contains("WARDEN_URL=http://foo-warden:8081"));
        assert!(!text.contains("ports:"));
        assert_eq!(json["env"], "LOG_LEVEL=debug\n");
    }

    #[tokio::test]
    async fn invalid_json_is_rejected() {
        let (_dir, cfg) = project();
        let (status, json) = post_raw(build_router(cfg), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid json");
    }

    #[tokio::test]
    async fn empty_modes_are_rejected() {
        let (_dir, cfg) = project();
        let (status, json) = post_json(build_router(cfg), serde_json::json!({ "modes": [] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "modes required");
    }

    #[tokio::test]
    async fn unknown_topology_is_a_bad_request() {
        let (_dir, cfg) = project();
        let (status, json) = post_json(build_router(cfg), serde_json::json!({ "modes": ["image"] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().expect("error").contains("unknown topology"));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (_dir, cfg) = project();
        let body = vec![b' '; MAX_GENERATE_BODY_BYTES + 1];
        let (status, json) = post_raw(build_router(cfg), body).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error"], "request body too large");
    }

    #[tokio::test]
    async fn missing_canonical_is_a_server_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (status, _) = post_json(
            build_router(SuiteConfig::at(dir.path())),
            serde_json::json!({ "modes": ["traefik"] }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
