use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /match`. The payload is plain base64 with no data-URL prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    pub image_base64: String,
}

/// One candidate returned by the matching service.
///
/// Scores are inner products over L2-normalized embeddings, so they land in
/// the 0.0–1.0 range for the gallery vectors this system produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub name: String,
    pub score: f32,
    pub photo_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub query_id: String,
    pub timestamp: DateTime<Utc>,
    pub matches: Vec<Match>,
}
