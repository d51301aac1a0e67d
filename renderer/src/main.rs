mod config;
mod error;
mod raster;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if config::credentials().is_none() {
        tracing::error!("SHARDMAP_EMAIL and SHARDMAP_PASSWORD are required to run shardmap-renderer");
        return;
    }

    let state = AppState::new();
    let shards = config::draw_shards();
    if let Err(e) = bootstrap_dirs(&state, &shards) {
        tracing::error!(error = %e, "failed to create cache/output directories");
        return;
    }

    tracing::info!(
        cache = %state.cache_dir.display(),
        output = %state.output_dir.display(),
        shards = ?shards.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "shardmap renderer starting"
    );

    services::scheduler::run(state).await;
}

fn bootstrap_dirs(state: &AppState, shards: &[shardmap_shared::Shard]) -> std::io::Result<()> {
    for shard in shards {
        std::fs::create_dir_all(state.cache_dir.join(shard.to_string()).join("tiles"))?;
    }
    std::fs::create_dir_all(state.cache_dir.join("badges"))?;
    std::fs::create_dir_all(&state.output_dir)
}
