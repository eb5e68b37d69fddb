use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info};

use shared::protocol::{MatchRequest, MatchResponse};

pub mod view;

use view::{DisplayMode, ResultsView};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("match request was rejected: {status_text}")]
    Rejected {
        status: StatusCode,
        status_text: String,
    },
    #[error("match request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// HTTP client for the matching service.
#[derive(Clone)]
pub struct MatchClient {
    http: Client,
    server_url: String,
}

impl MatchClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            server_url: server_url.into(),
        }
    }

    /// Encode the file at `path` and request matches for it.
    pub async fn match_file(&self, path: &Path) -> Result<MatchResponse, MatchError> {
        let image_base64 = encode_image_file(path).await?;
        self.match_image(image_base64).await
    }

    /// One `POST /match` with the given base64 payload. Non-2xx statuses
    /// become [`MatchError::Rejected`]; the body of a rejection is not
    /// inspected, only the status text is carried.
    pub async fn match_image(&self, image_base64: String) -> Result<MatchResponse, MatchError> {
        let response = self
            .http
            .post(format!("{}/match", self.server_url))
            .json(&MatchRequest { image_base64 })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MatchError::Rejected {
                status,
                status_text: status_text(status),
            });
        }
        Ok(response.json().await?)
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| status.to_string())
}

/// Read a file into the base64 payload for [`MatchRequest`].
///
/// A file that already holds a data URL contributes only the portion after
/// the first comma; anything else is encoded as-is.
pub async fn encode_image_file(path: &Path) -> Result<String, MatchError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| MatchError::Read {
            path: path.display().to_string(),
            source,
        })?;
    if let Ok(text) = std::str::from_utf8(&bytes) {
        if let Some(payload) = payload_from_data_url(text.trim()) {
            return Ok(payload.to_string());
        }
    }
    Ok(STANDARD.encode(&bytes))
}

/// The payload portion of a `data:` URL: everything after the first comma.
pub fn payload_from_data_url(input: &str) -> Option<&str> {
    let rest = input.strip_prefix("data:")?;
    rest.split_once(',').map(|(_, payload)| payload)
}

/// Owns the upload flow of one display surface.
///
/// Each submission runs as its own task: read, encode, request, publish a
/// [`ResultsView`] on the watch channel. Submitting again aborts any task
/// still in flight, so only the newest submission can publish and overlapping
/// uploads cannot race for the display.
pub struct UploadSession {
    client: MatchClient,
    mode: DisplayMode,
    inflight: Option<JoinHandle<()>>,
    views: Arc<watch::Sender<ResultsView>>,
}

impl UploadSession {
    pub fn new(client: MatchClient, mode: DisplayMode) -> Self {
        let (views, _) = watch::channel(ResultsView::Idle);
        Self {
            client,
            mode,
            inflight: None,
            views: Arc::new(views),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ResultsView> {
        self.views.subscribe()
    }

    /// Submit a file selection.
    ///
    /// `None` (no file picked) is a no-op: no request is issued and the
    /// current view stays untouched. Rejected requests publish an error view;
    /// transport and read failures have no rendering contract and are only
    /// logged, leaving the display as it was.
    pub fn submit(&mut self, selection: Option<PathBuf>) {
        let Some(path) = selection else {
            return;
        };
        if let Some(inflight) = self.inflight.take() {
            inflight.abort();
        }

        let client = self.client.clone();
        let mode = self.mode;
        let views = Arc::clone(&self.views);
        self.inflight = Some(tokio::spawn(async move {
            match client.match_file(&path).await {
                Ok(response) => {
                    info!(
                        query_id = %response.query_id,
                        matches = response.matches.len(),
                        "match response received"
                    );
                    let _ = views.send(ResultsView::from_matches(response.matches, mode));
                }
                Err(MatchError::Rejected {
                    status,
                    status_text,
                }) => {
                    info!(%status, "match request rejected");
                    let _ = views.send(ResultsView::error(&status_text));
                }
                Err(err) => {
                    error!(%err, path = %path.display(), "match request failed");
                }
            }
        }));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
