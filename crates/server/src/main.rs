use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use gallery::{FlatIpIndex, GalleryStore};
use pipeline::{FacePipeline, EMBEDDING_DIM};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{Match, MatchRequest, MatchResponse},
};

mod config;

use config::{load_settings, normalize_database_url};

const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

struct AppState {
    index: FlatIpIndex,
    pipeline: FacePipeline,
    top_k: usize,
    score_floor: f32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = normalize_database_url(&settings.database_url);
    let store = GalleryStore::new(&database_url).await.map_err(|err| {
        error!(
            %database_url,
            %err,
            "failed to open gallery database; verify the path exists and is writable"
        );
        err
    })?;
    store.health_check().await?;

    let entries = store.load_entries().await?;
    if entries.is_empty() {
        warn!("gallery is empty; /match will return no candidates until one is ingested");
    }
    let index = FlatIpIndex::from_entries(EMBEDDING_DIM, entries)?;
    info!(entries = index.len(), "gallery index loaded");

    let state = AppState {
        index,
        pipeline: FacePipeline::new(),
        top_k: settings.top_k,
        score_floor: settings.score_floor,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/match", post(match_image))
        .layer(RequestBodyLimitLayer::new(MAX_IMAGE_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn match_image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, (StatusCode, Json<ApiError>)> {
    let image_bytes = STANDARD.decode(req.image_base64.trim()).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::Validation,
                format!("image_base64 is not valid base64: {e}"),
            )),
        )
    })?;

    let face = state.pipeline.prepare(&image_bytes).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(ErrorCode::Validation, e.to_string())),
        )
    })?;
    let embedding = state.pipeline.embed(&face);

    let matches: Vec<Match> = state
        .index
        .search(embedding.as_slice(), state.top_k, state.score_floor)
        .into_iter()
        .map(|entry| Match {
            name: entry.name,
            score: entry.score,
            photo_url: entry.photo_url,
        })
        .collect();

    Ok(Json(MatchResponse {
        query_id: Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        matches,
    }))
}
