use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, TimeDelta};
use tracing::{info, warn};

use crate::config;
use crate::error::RenderError;
use crate::services::auth;
use crate::services::badges::BadgeCache;
use crate::services::compositor;
use crate::services::stats::Session;
use crate::services::tiles::TileCache;
use crate::state::AppState;

/// What one successful cycle produced.
pub struct CycleReport {
    pub outputs: Vec<PathBuf>,
}

/// Drives the render loop forever: one full multi-shard cycle, then sleep
/// until the next daily instant, or the retry interval after a failure.
/// Exactly one cycle is ever in flight and exactly one sleep is ever
/// pending.
pub async fn run(state: AppState) {
    loop {
        info!("render cycle started");
        let outcome = run_cycle(&state).await;
        let delay = next_delay(&outcome, Local::now());
        match outcome {
            Ok(report) => {
                info!(
                    outputs = report.outputs.len(),
                    "cycle completed, next run in {}s",
                    delay.as_secs()
                );
            }
            Err(e) => {
                warn!(error = %e, "cycle failed, retrying in {}s", delay.as_secs());
            }
        }
        tokio::time::sleep(delay).await;
    }
}

/// One full render pass over every configured shard, strictly in order.
/// The first fatal error aborts the remainder; stats fetched so far are
/// discarded and refetched on the retry, while tiles and badges stay
/// cached.
pub async fn run_cycle(state: &AppState) -> Result<CycleReport, RenderError> {
    let (email, password) = config::credentials().ok_or_else(|| {
        RenderError::Auth("SHARDMAP_EMAIL and SHARDMAP_PASSWORD are not set".to_string())
    })?;
    let token = auth::signin(&state.http_client, &email, &password).await?;
    let mut session = Session::new(token);

    let tiles = TileCache::new(&state.cache_dir);
    let mut badges = BadgeCache::open(&state.cache_dir);
    let date = Local::now().date_naive();

    let mut outputs = Vec::new();
    for shard in config::draw_shards() {
        info!(%shard, "rendering shard");
        let stats = session
            .fetch_world_stats(&state.http_client, &state.grid, shard)
            .await?;
        let path = compositor::render_shard(state, shard, &stats, &tiles, &mut badges, date).await?;
        outputs.push(path);
    }
    Ok(CycleReport { outputs })
}

/// Picks the sleep before the next attempt: the daily instant after a
/// success, the short retry interval after any failure.
pub fn next_delay(outcome: &Result<CycleReport, RenderError>, now: DateTime<Local>) -> Duration {
    match outcome {
        Ok(_) => next_daily_delay(now, config::run_at_offset_secs()),
        Err(_) => config::retry_interval(),
    }
}

/// Time until the next occurrence of `offset_secs` past local midnight.
/// Always strictly in the future: if today's instant has passed (it has,
/// right after a cycle), the next day's is used.
pub fn next_daily_delay(now: DateTime<Local>, offset_secs: u32) -> Duration {
    let run_at =
        NaiveTime::from_num_seconds_from_midnight_opt(offset_secs, 0).unwrap_or(NaiveTime::MIN);
    let mut target = now.date_naive().and_time(run_at);
    if target <= now.naive_local() {
        target += TimeDelta::days(1);
    }
    (target - now.naive_local())
        .to_std()
        .unwrap_or(Duration::ZERO)
}
