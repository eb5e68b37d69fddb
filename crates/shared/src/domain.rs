use serde::{Deserialize, Serialize};

/// Row id of a reference photo in the gallery store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub i64);

/// Dimensionality of the face embedding vectors.
pub const EMBEDDING_DIM: usize = 512;
