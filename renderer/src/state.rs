use std::path::PathBuf;

use shardmap_shared::WorldGrid;
use tracing::warn;

use crate::config;

/// Shared environment for one renderer process: the HTTP client every
/// remote call goes through, the world geometry, and the disk locations.
#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub grid: WorldGrid,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl AppState {
    pub fn new() -> Self {
        let request_timeout = config::http_timeout();
        let connect_timeout = config::connect_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent("shardmap/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(request_timeout)
                    .connect_timeout(connect_timeout)
                    .build()
            })
            .unwrap_or_else(|e| {
                panic!("failed to build timeout-configured HTTP client: {e}");
            });
        Self {
            http_client,
            grid: WorldGrid::default(),
            cache_dir: config::cache_dir(),
            output_dir: config::output_dir(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
