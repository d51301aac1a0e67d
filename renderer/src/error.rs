use shardmap_shared::{CellId, Shard};
use thiserror::Error;

/// Failures that abort the whole render cycle. The scheduler reacts by
/// retrying the full cycle after the short interval; the permanent tile and
/// badge caches keep that retry cheap.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("map stats fetch failed for {shard}: {reason}")]
    Stats { shard: Shard, reason: String },

    #[error("tile fetch failed for {cell} on {shard}: {reason}")]
    TileFetch {
        shard: Shard,
        cell: CellId,
        reason: String,
    },

    #[error("fetched tile {cell} on {shard} did not decode: {source}")]
    TileDecode {
        shard: Shard,
        cell: CellId,
        source: image::ImageError,
    },

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-owner badge failures. Never fatal: the owner's overlay is skipped
/// for the cycle and everything else renders.
#[derive(Debug, Error)]
pub enum BadgeError {
    #[error("badge fetch failed for {owner}: {reason}")]
    Fetch { owner: String, reason: String },

    #[error("badge for {owner} did not decode: {source}")]
    Decode {
        owner: String,
        source: image::ImageError,
    },
}
