use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use image::RgbaImage;
use shardmap_shared::BadgeConfig;
use tracing::{debug, warn};

use crate::config;
use crate::error::BadgeError;

/// On-disk store of rendered owner badges plus a manifest of the badge
/// configs they were rendered from. An entry is served only while the
/// owner's current config equals its manifest entry; any difference, or an
/// image that no longer decodes, forces a refetch. Badges are shared across
/// shards.
pub struct BadgeCache {
    root: PathBuf,
    manifest: HashMap<String, BadgeConfig>,
}

impl BadgeCache {
    /// Opens the cache, loading the manifest persisted by previous runs so
    /// unchanged owners cost no fetch even across restarts.
    pub fn open(cache_dir: &Path) -> Self {
        let root = cache_dir.join("badges");
        let manifest = match fs::read(root.join("manifest.json")) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(error = %e, "badge manifest did not parse, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { root, manifest }
    }

    fn badge_path(&self, owner: &str) -> PathBuf {
        self.root.join(format!("{owner}.png"))
    }

    /// Returns the badge for `owner`, refetching when `current` differs
    /// from the config it was cached under.
    pub async fn get(
        &mut self,
        client: &reqwest::Client,
        owner: &str,
        current: &BadgeConfig,
    ) -> Result<RgbaImage, BadgeError> {
        self.get_with(owner, current, || fetch_badge(client, owner))
            .await
    }

    /// [`Self::get`] with the network fetch injected, so invalidation is
    /// exercisable without a live badge service.
    pub async fn get_with<F, Fut>(
        &mut self,
        owner: &str,
        current: &BadgeConfig,
        fetch: F,
    ) -> Result<RgbaImage, BadgeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, BadgeError>>,
    {
        if self.manifest.get(owner) == Some(current) {
            match image::open(self.badge_path(owner)) {
                Ok(img) => return Ok(img.to_rgba8()),
                Err(e) => {
                    warn!(owner, error = %e, "cached badge did not decode, refetching");
                }
            }
        }

        debug!(owner, "downloading badge");
        let bytes = fetch().await?;
        let img = image::load_from_memory(&bytes)
            .map_err(|source| BadgeError::Decode {
                owner: owner.to_string(),
                source,
            })?
            .to_rgba8();
        self.persist(owner, current, &bytes);
        Ok(img)
    }

    /// Stores the badge bytes and the updated manifest. Storage failures
    /// are logged and swallowed: the fetched badge is still usable this
    /// cycle, and the missing entry just costs a refetch next time.
    fn persist(&mut self, owner: &str, current: &BadgeConfig, bytes: &[u8]) {
        if let Err(e) = fs::create_dir_all(&self.root) {
            warn!(owner, error = %e, "failed to create badge cache directory");
            return;
        }
        if let Err(e) = fs::write(self.badge_path(owner), bytes) {
            warn!(owner, error = %e, "failed to store badge image");
            return;
        }
        self.manifest.insert(owner.to_string(), current.clone());
        match serde_json::to_vec_pretty(&self.manifest) {
            Ok(json) => {
                if let Err(e) = fs::write(self.root.join("manifest.json"), json) {
                    warn!(owner, error = %e, "failed to store badge manifest");
                }
            }
            Err(e) => warn!(owner, error = %e, "failed to serialize badge manifest"),
        }
    }
}

async fn fetch_badge(client: &reqwest::Client, owner: &str) -> Result<Bytes, BadgeError> {
    let resp = client
        .get(config::badge_render_url())
        .query(&[("user", owner)])
        .send()
        .await
        .map_err(|e| BadgeError::Fetch {
            owner: owner.to_string(),
            reason: format!("request failed: {e}"),
        })?;
    let status = resp.status();
    if !status.is_success() {
        return Err(BadgeError::Fetch {
            owner: owner.to_string(),
            reason: format!("upstream status {status}"),
        });
    }
    resp.bytes().await.map_err(|e| BadgeError::Fetch {
        owner: owner.to_string(),
        reason: format!("failed to read response body: {e}"),
    })
}
