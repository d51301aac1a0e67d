use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use image::RgbaImage;
use shardmap_shared::{CellStatus, Shard, WorldGrid, WorldStats};
use tracing::{info, warn};

use crate::config;
use crate::error::RenderError;
use crate::raster;
use crate::services::badges::BadgeCache;
use crate::services::tiles::TileCache;
use crate::state::AppState;

/// Renders one shard end to end: assemble (or reuse) the base canvas,
/// upscale, blend status masks, composite owner badges, persist the dated
/// output. Returns the written path.
///
/// Tiles assemble before any overlay, and every status mask lands before
/// the first badge, so badges always draw on top.
pub async fn render_shard(
    state: &AppState,
    shard: Shard,
    stats: &WorldStats,
    tiles: &TileCache,
    badges: &mut BadgeCache,
    date: NaiveDate,
) -> Result<PathBuf, RenderError> {
    let base = base_canvas(state, shard, tiles).await?;
    let mut canvas = raster::scale_integer(&base, state.grid.zoom);
    apply_status_masks(&mut canvas, &state.grid, stats);
    apply_badges(state, &mut canvas, stats, badges).await;

    let path = output_path(&state.output_dir, shard, date);
    let png = raster::encode_png(&canvas)?;
    fs::create_dir_all(&state.output_dir)?;
    fs::write(&path, png)?;
    info!(%shard, path = %path.display(), "render written");
    Ok(path)
}

pub fn output_path(output_dir: &Path, shard: Shard, date: NaiveDate) -> PathBuf {
    output_dir.join(format!("{shard}_{date}.png"))
}

/// The stitched unscaled world image. It depends only on immutable tiles,
/// so it is persisted per shard and reused on every later cycle; a cached
/// file that no longer decodes is reassembled from the tile cache.
async fn base_canvas(
    state: &AppState,
    shard: Shard,
    tiles: &TileCache,
) -> Result<RgbaImage, RenderError> {
    let path = state.cache_dir.join(shard.to_string()).join("background.png");
    if path.exists() {
        match image::open(&path) {
            Ok(img) => return Ok(img.to_rgba8()),
            Err(e) => {
                warn!(%shard, error = %e, "cached base canvas did not decode, reassembling");
            }
        }
    }

    let grid = &state.grid;
    let mut canvas = raster::new_canvas(grid.base_pixels(), grid.base_pixels());
    let sector_px = grid.sector_pixels();
    for (ix, iy, corner) in grid.sector_corners() {
        let tile = tiles.get(&state.http_client, shard, corner).await?;
        raster::paste(
            &mut canvas,
            &tile,
            i64::from(ix * sector_px),
            i64::from(iy * sector_px),
        );
    }

    let png = raster::encode_png(&canvas)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, png)?;
    info!(%shard, "assembled base canvas");
    Ok(canvas)
}

fn apply_status_masks(canvas: &mut RgbaImage, grid: &WorldGrid, stats: &WorldStats) {
    let cell_px = grid.scaled_cell_pixels();
    for (cell, record) in &stats.cells {
        let Some(color) = mask_color(record.status) else {
            continue;
        };
        let (x, y) = grid.cell_to_pixel(*cell);
        if outside_canvas(canvas, x, y, cell_px) {
            continue;
        }
        raster::blend_rect(canvas, x, y, cell_px, color, config::MASK_BLEND);
    }
}

/// `Normal` and unrecognized statuses deliberately get no mask.
fn mask_color(status: CellStatus) -> Option<[u8; 3]> {
    match status {
        CellStatus::OutOfBorders => Some(config::OUT_OF_BORDERS_COLOR),
        CellStatus::Respawn => Some(config::RESPAWN_COLOR),
        CellStatus::Novice => Some(config::NOVICE_COLOR),
        CellStatus::Normal | CellStatus::Unknown => None,
    }
}

/// Composites every resolvable owner badge. Badge failures cost only the
/// affected cell; a cell position outside the canvas is skipped silently.
async fn apply_badges(
    state: &AppState,
    canvas: &mut RgbaImage,
    stats: &WorldStats,
    badges: &mut BadgeCache,
) {
    let grid = &state.grid;
    let cell_px = grid.scaled_cell_pixels();
    for (cell, record) in &stats.cells {
        let Some(owner) = &record.owner else {
            continue;
        };
        let (x, y) = grid.cell_to_pixel(*cell);
        if outside_canvas(canvas, x, y, cell_px) {
            continue;
        }
        let Some(profile) = stats.owners.get(&owner.id) else {
            warn!(owner = %owner.id, cell = %cell, "owner missing from stats, skipping badge");
            continue;
        };

        let badge = match badges
            .get(&state.http_client, &owner.id, &profile.badge)
            .await
        {
            Ok(img) => img,
            Err(e) => {
                warn!(owner = %profile.username, cell = %cell, error = %e, "badge unavailable, skipping overlay");
                continue;
            }
        };

        let remote = owner.level == 0;
        let fraction = if remote {
            config::BADGE_REMOTE_FRACTION
        } else {
            config::BADGE_HOME_FRACTION
        };
        let size = ((cell_px as f32) * fraction).round().max(1.0) as u32;
        let mut badge = raster::scale_nearest(&badge, size, size);
        if remote {
            raster::fade_alpha(&mut badge, config::BADGE_REMOTE_ALPHA);
        }

        let offset = i64::from((cell_px - size) / 2);
        let (bx, by) = (x + offset, y + offset);
        raster::alpha_over(canvas, &badge, bx, by);
        raster::draw_ring(
            canvas,
            bx,
            by,
            size,
            config::BADGE_RING_WIDTH,
            config::BADGE_RING_COLOR,
        );
    }
}

fn outside_canvas(canvas: &RgbaImage, x: i64, y: i64, cell_px: u32) -> bool {
    x < 0
        || y < 0
        || x + i64::from(cell_px) > i64::from(canvas.width())
        || y + i64::from(cell_px) > i64::from(canvas.height())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use image::Rgba;
    use serde_json::json;
    use shardmap_shared::{CellId, CellOwner, CellRecord, OwnerProfile};

    use super::*;
    use crate::state::AppState;

    /// 2×2-cell world: a single sector, 4 px cells, zoom ×2 → 8 px scaled
    /// cells on a 16 px canvas. The lone sector tile is named by W0N0.
    fn test_grid() -> WorldGrid {
        WorldGrid {
            world_size: 1,
            sector_cells: 2,
            cell_pixels: 4,
            zoom: 2,
        }
    }

    fn test_state(tag: &str) -> AppState {
        let root = std::env::temp_dir().join(format!(
            "shardmap-compositor-{tag}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).expect("temp dir should be creatable");
        AppState {
            http_client: reqwest::Client::new(),
            grid: test_grid(),
            cache_dir: root.join("cache"),
            output_dir: root.join("out"),
        }
    }

    const TILE_GRAY: [u8; 4] = [100, 100, 100, 255];

    /// Seeds the tile cache so no fetch happens: one tile for the only
    /// sector of the 2×2 world.
    fn seed_tile(state: &AppState, shard: Shard) {
        let corner = state.grid.sector_corner(0, 0);
        assert_eq!(corner.to_string(), "W0N0");
        let dir = state.cache_dir.join(shard.to_string()).join("tiles");
        fs::create_dir_all(&dir).expect("tile dir");
        let side = state.grid.sector_pixels();
        let tile = RgbaImage::from_pixel(side, side, Rgba(TILE_GRAY));
        fs::write(
            dir.join(format!("{corner}.png")),
            raster::encode_png(&tile).expect("encode tile"),
        )
        .expect("write tile");
    }

    /// Seeds one cached badge and its manifest entry so no fetch happens.
    fn seed_badge(state: &AppState, owner: &str, rgba: [u8; 4], badge_config: &serde_json::Value) {
        let dir = state.cache_dir.join("badges");
        fs::create_dir_all(&dir).expect("badge dir");
        let badge = RgbaImage::from_pixel(6, 6, Rgba(rgba));
        fs::write(
            dir.join(format!("{owner}.png")),
            raster::encode_png(&badge).expect("encode badge"),
        )
        .expect("write badge");
        let manifest: HashMap<&str, &serde_json::Value> =
            HashMap::from([(owner, badge_config)]);
        fs::write(
            dir.join("manifest.json"),
            serde_json::to_vec(&manifest).expect("encode manifest"),
        )
        .expect("write manifest");
    }

    fn record(status: CellStatus, owner: Option<CellOwner>) -> CellRecord {
        CellRecord { status, owner }
    }

    fn owner(id: &str, level: u8) -> Option<CellOwner> {
        Some(CellOwner {
            id: id.to_string(),
            level,
        })
    }

    fn cell(name: &str) -> CellId {
        name.parse().expect("valid cell id")
    }

    fn scenario_stats() -> WorldStats {
        let badge_config = json!({"type": 1, "color1": "#cc0000"});
        WorldStats {
            cells: HashMap::from([
                (cell("W0N0"), record(CellStatus::Normal, owner("u1", 4))),
                (cell("E0N0"), record(CellStatus::OutOfBorders, None)),
                (cell("W0S0"), record(CellStatus::Normal, None)),
                (cell("E0S0"), record(CellStatus::Normal, None)),
            ]),
            owners: HashMap::from([(
                "u1".to_string(),
                OwnerProfile {
                    username: "alice".to_string(),
                    badge: badge_config,
                },
            )]),
        }
    }

    fn blend_half(a: u8, b: u8) -> u8 {
        (f32::from(a) + (f32::from(b) - f32::from(a)) * 0.5).round() as u8
    }

    #[tokio::test]
    async fn scenario_badge_and_mask_land_where_they_should() {
        let state = test_state("scenario");
        let shard = Shard(3);
        seed_tile(&state, shard);
        let stats = scenario_stats();
        seed_badge(&state, "u1", [200, 0, 0, 255], &stats.owners["u1"].badge);

        let tiles = TileCache::new(&state.cache_dir);
        let mut badges = BadgeCache::open(&state.cache_dir);
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date");

        let path = render_shard(&state, shard, &stats, &tiles, &mut badges, date)
            .await
            .expect("render should succeed");
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("shard3_2026-08-07.png")
        );
        let out = image::open(&path).expect("output should decode").to_rgba8();
        assert_eq!(out.dimensions(), (16, 16));

        // E0N0 occupies x 8..16, y 0..8 and is fully masked with black.
        let masked = [
            blend_half(TILE_GRAY[0], 0),
            blend_half(TILE_GRAY[1], 0),
            blend_half(TILE_GRAY[2], 0),
            255,
        ];
        for y in 0..8 {
            for x in 8..16 {
                assert_eq!(out.get_pixel(x, y).0, masked, "mask at ({x}, {y})");
            }
        }

        // W0S0 is Normal and unowned: identical to the upscaled base.
        for y in 8..16 {
            for x in 0..8 {
                assert_eq!(out.get_pixel(x, y).0, TILE_GRAY, "base at ({x}, {y})");
            }
        }

        // W0N0 carries u1's badge: home level, so undimmed. The badge is
        // round(8 * 0.8) = 6 px, centered at offset 1 within x 0..8, y 0..8;
        // its center pixels keep the badge color at full alpha.
        assert_eq!(out.get_pixel(3, 3).0, [200, 0, 0, 255]);
        // the cell's corner stays base-colored
        assert_eq!(out.get_pixel(0, 0).0, TILE_GRAY);
    }

    #[tokio::test]
    async fn rendering_twice_is_byte_identical() {
        let state = test_state("determinism");
        let shard = Shard(3);
        seed_tile(&state, shard);
        let stats = scenario_stats();
        seed_badge(&state, "u1", [200, 0, 0, 255], &stats.owners["u1"].badge);

        let tiles = TileCache::new(&state.cache_dir);
        let mut badges = BadgeCache::open(&state.cache_dir);
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date");

        let path = render_shard(&state, shard, &stats, &tiles, &mut badges, date)
            .await
            .expect("first render");
        let first = fs::read(&path).expect("first output");

        // second cycle reuses the persisted base canvas
        assert!(state
            .cache_dir
            .join("shard3")
            .join("background.png")
            .exists());
        let path = render_shard(&state, shard, &stats, &tiles, &mut badges, date)
            .await
            .expect("second render");
        let second = fs::read(&path).expect("second output");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn respawn_mask_blends_exactly_and_normal_cells_stay_base() {
        let state = test_state("mask-math");
        let shard = Shard(1);
        seed_tile(&state, shard);
        let stats = WorldStats {
            cells: HashMap::from([
                (cell("W0N0"), record(CellStatus::Respawn, None)),
                (cell("E0N0"), record(CellStatus::Novice, None)),
                (cell("W0S0"), record(CellStatus::Unknown, None)),
                (cell("E0S0"), record(CellStatus::Normal, None)),
            ]),
            owners: HashMap::new(),
        };

        let tiles = TileCache::new(&state.cache_dir);
        let mut badges = BadgeCache::open(&state.cache_dir);
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).expect("valid date");
        let path = render_shard(&state, shard, &stats, &tiles, &mut badges, date)
            .await
            .expect("render should succeed");
        let out = image::open(&path).expect("output should decode").to_rgba8();

        let respawn = [
            blend_half(TILE_GRAY[0], config::RESPAWN_COLOR[0]),
            blend_half(TILE_GRAY[1], config::RESPAWN_COLOR[1]),
            blend_half(TILE_GRAY[2], config::RESPAWN_COLOR[2]),
            255,
        ];
        let novice = [
            blend_half(TILE_GRAY[0], config::NOVICE_COLOR[0]),
            blend_half(TILE_GRAY[1], config::NOVICE_COLOR[1]),
            blend_half(TILE_GRAY[2], config::NOVICE_COLOR[2]),
            255,
        ];
        assert_eq!(out.get_pixel(2, 2).0, respawn);
        assert_eq!(out.get_pixel(10, 2).0, novice);
        // Unknown and Normal stay identical to the base canvas.
        assert_eq!(out.get_pixel(2, 10).0, TILE_GRAY);
        assert_eq!(out.get_pixel(10, 10).0, TILE_GRAY);
    }

    #[tokio::test]
    async fn remote_mine_badges_render_smaller_and_faded() {
        let mut state = test_state("remote");
        // wider cells so the ring leaves the badge center visible
        state.grid = WorldGrid {
            world_size: 1,
            sector_cells: 2,
            cell_pixels: 8,
            zoom: 2,
        };
        let shard = Shard(2);
        seed_tile(&state, shard);
        let badge_config = json!({"type": 2});
        let stats = WorldStats {
            cells: HashMap::from([(cell("W0N0"), record(CellStatus::Normal, owner("u1", 0)))]),
            owners: HashMap::from([(
                "u1".to_string(),
                OwnerProfile {
                    username: "bob".to_string(),
                    badge: badge_config.clone(),
                },
            )]),
        };
        seed_badge(&state, "u1", [200, 0, 0, 255], &badge_config);

        let tiles = TileCache::new(&state.cache_dir);
        let mut badges = BadgeCache::open(&state.cache_dir);
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).expect("valid date");
        let path = render_shard(&state, shard, &stats, &tiles, &mut badges, date)
            .await
            .expect("render should succeed");
        let out = image::open(&path).expect("output should decode").to_rgba8();

        // round(16 * 0.4) = 6 px badge at offset 5 inside the 16 px cell.
        // Faded to half alpha, its center pixels are a mix of badge red and
        // base gray rather than pure red.
        let center = out.get_pixel(8, 8).0;
        assert_ne!(center, [200, 0, 0, 255]);
        assert_ne!(center, TILE_GRAY);
        assert!(center[0] > TILE_GRAY[0]);
        // pixels outside the badge block keep the base color
        assert_eq!(out.get_pixel(2, 2).0, TILE_GRAY);
        assert_eq!(out.get_pixel(13, 13).0, TILE_GRAY);
    }

    #[tokio::test]
    async fn unavailable_badges_skip_the_cell_but_not_the_render() {
        let state = test_state("badge-miss");
        let shard = Shard(0);
        seed_tile(&state, shard);
        // the owner never resolves to a profile, so its badge is unavailable
        let stats = WorldStats {
            cells: HashMap::from([(cell("W0N0"), record(CellStatus::Normal, owner("u9", 3)))]),
            owners: HashMap::new(),
        };

        let tiles = TileCache::new(&state.cache_dir);
        let mut badges = BadgeCache::open(&state.cache_dir);
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).expect("valid date");
        let path = render_shard(&state, shard, &stats, &tiles, &mut badges, date)
            .await
            .expect("render should succeed without the badge");
        let out = image::open(&path).expect("output should decode").to_rgba8();
        // no badge landed: the owned cell is untouched base
        assert_eq!(out.get_pixel(3, 3).0, TILE_GRAY);
    }

    #[tokio::test]
    async fn out_of_world_cells_are_tolerated() {
        let state = test_state("oob");
        let shard = Shard(3);
        seed_tile(&state, shard);
        let mut stats = scenario_stats();
        stats.cells.insert(
            cell("W50N50"),
            record(CellStatus::OutOfBorders, owner("u1", 2)),
        );
        seed_badge(&state, "u1", [200, 0, 0, 255], &stats.owners["u1"].badge);

        let tiles = TileCache::new(&state.cache_dir);
        let mut badges = BadgeCache::open(&state.cache_dir);
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).expect("valid date");
        render_shard(&state, shard, &stats, &tiles, &mut badges, date)
            .await
            .expect("far-out cells must not break the render");
    }
}
