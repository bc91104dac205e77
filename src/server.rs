// http server mode - run sqlgate as an api

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::Settings;
use crate::core::{Agent, Db, RunMode, RunOptions, RunOutcome, WriteOutcome};
use crate::Error;

type AppState = Arc<Agent<Db>>;

#[derive(Deserialize)]
struct PlanRequest {
    sql: String,
}

#[derive(Deserialize)]
struct QueryRequest {
    sql: String,
    #[serde(default)]
    mode: RunMode,
    #[serde(default = "default_safe")]
    safe: bool,
}

#[derive(Deserialize)]
struct WriteRequest {
    sql: String,
    #[serde(default)]
    allow_write: bool,
}

#[derive(Deserialize)]
struct AskRequest {
    prompt: String,
    #[serde(default)]
    execute: bool,
    #[serde(default)]
    mode: RunMode,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn default_safe() -> bool {
    true
}

pub struct Server;

impl Server {
    pub async fn run(settings: &Settings, host: &str, port: u16) -> Result<(), Error> {
        let state: AppState = Arc::new(settings.connect().await?);

        let app = Router::new()
            .route("/health", get(health))
            .route("/schema", get(get_schema))
            .route("/erd", get(get_erd))
            .route("/plan", post(plan))
            .route("/query", post(query))
            .route("/write", post(write))
            .route("/ask", post(ask))
            .layer(CorsLayer::permissive())
            .with_state(state);

        let addr = format!("{host}:{port}");
        tracing::info!(%addr, "server running");

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        Ok(())
    }
}

fn failure(status: StatusCode, e: Error) -> Response {
    tracing::error!(error = %e, "request failed");
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn get_schema(State(agent): State<AppState>) -> Response {
    match agent.schema().await {
        Ok(schema) => Json(schema).into_response(),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn get_erd(State(agent): State<AppState>) -> Response {
    match agent.erd().await {
        Ok(erd) => Json(serde_json::json!({ "erd": erd })).into_response(),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn plan(State(agent): State<AppState>, Json(req): Json<PlanRequest>) -> Response {
    Json(agent.plan(&req.sql).await).into_response()
}

async fn query(State(agent): State<AppState>, Json(req): Json<QueryRequest>) -> Response {
    let options = RunOptions {
        mode: req.mode,
        safe: req.safe,
    };

    match agent.run(&req.sql, options).await {
        Ok(outcome @ (RunOutcome::Rejected { .. } | RunOutcome::Blocked { .. })) => {
            (StatusCode::BAD_REQUEST, Json(outcome)).into_response()
        }
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => failure(StatusCode::BAD_REQUEST, e),
    }
}

async fn write(State(agent): State<AppState>, Json(req): Json<WriteRequest>) -> Response {
    match agent.write(&req.sql, req.allow_write).await {
        Ok(outcome @ WriteOutcome::Written { .. }) => Json(outcome).into_response(),
        Ok(outcome) => (StatusCode::BAD_REQUEST, Json(outcome)).into_response(),
        Err(e) => failure(StatusCode::BAD_REQUEST, e),
    }
}

async fn ask(State(agent): State<AppState>, Json(req): Json<AskRequest>) -> Response {
    let options = RunOptions {
        mode: req.mode,
        ..RunOptions::default()
    };

    match agent.ask(&req.prompt, req.execute, options).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e @ (Error::NoTranslator | Error::MissingApiKey)) => {
            failure(StatusCode::SERVICE_UNAVAILABLE, e)
        }
        Err(e) => failure(StatusCode::BAD_REQUEST, e),
    }
}
