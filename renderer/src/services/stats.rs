use chrono::Utc;
use shardmap_shared::{RawStatsResponse, Shard, WorldGrid, WorldStats};

use crate::config;
use crate::error::RenderError;

/// Authenticated handle on the stats API. The service rotates the session
/// token on every response and later calls must present the rotated value,
/// so the handle is mutable and owned by the cycle.
pub struct Session {
    token: String,
}

#[derive(serde::Serialize)]
struct MapStatsRequest {
    rooms: Vec<String>,
    shard: String,
    #[serde(rename = "statName")]
    stat_name: &'static str,
}

impl Session {
    pub fn new(token: String) -> Self {
        Self { token }
    }

    /// Fetches status and ownership for every cell of `shard` in one call.
    /// The response is assumed consistent across all requested cells.
    pub async fn fetch_world_stats(
        &mut self,
        client: &reqwest::Client,
        grid: &WorldGrid,
        shard: Shard,
    ) -> Result<WorldStats, RenderError> {
        let request = MapStatsRequest {
            rooms: grid.all_cells().iter().map(|cell| cell.to_string()).collect(),
            shard: shard.to_string(),
            stat_name: "owner0",
        };
        let url = format!("{}/game/map-stats", config::api_base_url());
        let resp = client
            .post(&url)
            .timeout(config::stats_timeout())
            .header("X-Token", &self.token)
            .header("X-Username", &self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| RenderError::Stats {
                shard,
                reason: format!("request failed: {e}"),
            })?;

        if let Some(rotated) = resp
            .headers()
            .get("X-Token")
            .and_then(|value| value.to_str().ok())
        {
            self.token = rotated.to_string();
        }

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| RenderError::Stats {
            shard,
            reason: format!("failed to read response body: {e}"),
        })?;
        if !status.is_success() {
            return Err(RenderError::Stats {
                shard,
                reason: format!("upstream status {status}; body preview: {}", preview(&bytes)),
            });
        }

        let raw: RawStatsResponse =
            serde_json::from_slice(&bytes).map_err(|e| RenderError::Stats {
                shard,
                reason: format!(
                    "failed to decode stats payload: {e}; body preview: {}",
                    preview(&bytes)
                ),
            })?;
        Ok(WorldStats::from_raw(raw, Utc::now()))
    }
}

fn preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).chars().take(200).collect()
}
