use std::path::PathBuf;
use std::time::Duration;

use shardmap_shared::Shard;

pub const API_BASE_URL: &str = "https://screeps.com/api";
pub const TILE_BASE_URL: &str = "https://d3os7yery2usni.cloudfront.net/map";
pub const BADGE_RENDER_URL: &str = "https://screeps.com/api/user/badge";

pub const DEFAULT_CACHE_DIR: &str = ".shardmap_cache";
pub const DEFAULT_OUTPUT_DIR: &str = "renders";
pub const DEFAULT_SHARDS: [u8; 4] = [3, 2, 1, 0];

pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 200;
/// Fire just past the daily boundary, never exactly on it.
pub const DEFAULT_RUN_AT_OFFSET_SECS: u32 = 1;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// The map-stats call carries every cell of a shard and needs more room.
pub const DEFAULT_STATS_TIMEOUT_SECS: u64 = 120;

// Compositing constants.
pub const MASK_BLEND: f32 = 0.5;
pub const OUT_OF_BORDERS_COLOR: [u8; 3] = [0x00, 0x00, 0x00];
pub const RESPAWN_COLOR: [u8; 3] = [0x00, 0x6b, 0xff];
pub const NOVICE_COLOR: [u8; 3] = [0x7c, 0xff, 0x7c];
/// Badge side length as a fraction of the cell, for home cells.
pub const BADGE_HOME_FRACTION: f32 = 0.8;
/// Badge side length as a fraction of the cell, for remotely mined cells.
pub const BADGE_REMOTE_FRACTION: f32 = 0.4;
/// Alpha multiplier applied to remote-mine badges.
pub const BADGE_REMOTE_ALPHA: f32 = 0.5;
pub const BADGE_RING_WIDTH: u32 = 2;
pub const BADGE_RING_COLOR: [u8; 4] = [0x2b, 0x2b, 0x2b, 0xff];

pub fn credentials() -> Option<(String, String)> {
    let email = std::env::var("SHARDMAP_EMAIL").ok()?;
    let password = std::env::var("SHARDMAP_PASSWORD").ok()?;
    Some((email, password))
}

pub fn api_base_url() -> String {
    std::env::var("SHARDMAP_API_URL").unwrap_or_else(|_| API_BASE_URL.to_string())
}

pub fn tile_base_url() -> String {
    std::env::var("SHARDMAP_TILE_URL").unwrap_or_else(|_| TILE_BASE_URL.to_string())
}

pub fn badge_render_url() -> String {
    std::env::var("SHARDMAP_BADGE_URL").unwrap_or_else(|_| BADGE_RENDER_URL.to_string())
}

pub fn cache_dir() -> PathBuf {
    std::env::var("SHARDMAP_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR))
}

pub fn output_dir() -> PathBuf {
    std::env::var("SHARDMAP_OUTPUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

/// Shards to render, in the order they render. The order is part of the
/// contract: cycles are strictly sequential and deterministic.
pub fn draw_shards() -> Vec<Shard> {
    let configured = std::env::var("SHARDMAP_SHARDS").ok().map(|value| {
        value
            .split(',')
            .filter_map(|part| part.trim().parse::<u8>().ok())
            .map(Shard)
            .collect::<Vec<_>>()
    });
    match configured {
        Some(shards) if !shards.is_empty() => shards,
        _ => DEFAULT_SHARDS.map(Shard).to_vec(),
    }
}

pub fn retry_interval() -> Duration {
    std::env::var("SHARDMAP_RETRY_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS))
}

/// Seconds past midnight at which the daily run fires. Clamped below a day.
pub fn run_at_offset_secs() -> u32 {
    std::env::var("SHARDMAP_RUN_AT_OFFSET_SECS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value < 86_400)
        .unwrap_or(DEFAULT_RUN_AT_OFFSET_SECS)
}

pub fn http_timeout() -> Duration {
    std::env::var("SHARDMAP_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
}

pub fn connect_timeout() -> Duration {
    std::env::var("SHARDMAP_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
}

pub fn stats_timeout() -> Duration {
    std::env::var("SHARDMAP_STATS_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_STATS_TIMEOUT_SECS))
}
