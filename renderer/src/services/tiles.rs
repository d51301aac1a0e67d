use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use image::RgbaImage;
use shardmap_shared::{CellId, Shard};
use tracing::{debug, warn};

use crate::config;
use crate::error::RenderError;

/// Permanent on-disk store of sector tile images, one PNG per
/// `(shard, corner cell)`. Map imagery never changes for a given shard and
/// cell, so entries are written once and never revalidated or evicted.
pub struct TileCache {
    root: PathBuf,
}

impl TileCache {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            root: cache_dir.to_path_buf(),
        }
    }

    fn tile_path(&self, shard: Shard, corner: CellId) -> PathBuf {
        self.root
            .join(shard.to_string())
            .join("tiles")
            .join(format!("{corner}.png"))
    }

    /// Loads the tile for `(shard, corner)`, fetching and persisting it on a
    /// miss. A persisted file that no longer decodes counts as a miss and is
    /// overwritten by a fresh fetch.
    pub async fn get(
        &self,
        client: &reqwest::Client,
        shard: Shard,
        corner: CellId,
    ) -> Result<RgbaImage, RenderError> {
        self.get_with(shard, corner, || fetch_tile(client, shard, corner))
            .await
    }

    /// [`Self::get`] with the network fetch injected, so cache behavior is
    /// exercisable without a live imagery service.
    pub async fn get_with<F, Fut>(
        &self,
        shard: Shard,
        corner: CellId,
        fetch: F,
    ) -> Result<RgbaImage, RenderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, RenderError>>,
    {
        let path = self.tile_path(shard, corner);
        if path.exists() {
            match image::open(&path) {
                Ok(img) => return Ok(img.to_rgba8()),
                Err(e) => {
                    warn!(%shard, cell = %corner, error = %e, "cached tile did not decode, refetching");
                }
            }
        }

        debug!(%shard, cell = %corner, "downloading tile");
        let bytes = fetch().await?;
        let img = image::load_from_memory(&bytes)
            .map_err(|source| RenderError::TileDecode {
                shard,
                cell: corner,
                source,
            })?
            .to_rgba8();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &bytes)?;
        Ok(img)
    }
}

async fn fetch_tile(
    client: &reqwest::Client,
    shard: Shard,
    corner: CellId,
) -> Result<Bytes, RenderError> {
    let url = format!("{}/{shard}/zoom1/{corner}.png", config::tile_base_url());
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| RenderError::TileFetch {
            shard,
            cell: corner,
            reason: format!("request failed: {e}"),
        })?;
    let status = resp.status();
    if !status.is_success() {
        return Err(RenderError::TileFetch {
            shard,
            cell: corner,
            reason: format!("upstream status {status}"),
        });
    }
    resp.bytes().await.map_err(|e| RenderError::TileFetch {
        shard,
        cell: corner,
        reason: format!("failed to read response body: {e}"),
    })
}
