use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::cell::CellId;
use crate::status::CellStatus;

/// Owner id as issued by the game service. Opaque.
pub type OwnerId = String;

/// Serialized badge appearance descriptor. Opaque; equality drives badge
/// cache invalidation.
pub type BadgeConfig = serde_json::Value;

/// NPC account holding invader strongholds; never rendered as an owner.
pub const NPC_OWNER_ID: &str = "2";

/// Ownership record for one cell. Level 0 marks a remotely mined cell
/// rather than a home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOwner {
    pub id: OwnerId,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    pub status: CellStatus,
    pub owner: Option<CellOwner>,
}

/// Display data for one owner, resolved from the stats payload.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerProfile {
    pub username: String,
    pub badge: BadgeConfig,
}

/// One shard's ownership and status picture, rebuilt from scratch every
/// render cycle.
#[derive(Debug, Clone, Default)]
pub struct WorldStats {
    pub cells: HashMap<CellId, CellRecord>,
    pub owners: HashMap<OwnerId, OwnerProfile>,
}

#[derive(Debug, Deserialize)]
pub struct RawStatsResponse {
    #[serde(default)]
    pub stats: HashMap<String, RawCellStats>,
    #[serde(default)]
    pub users: HashMap<String, RawUser>,
}

#[derive(Debug, Deserialize)]
pub struct RawCellStats {
    #[serde(default)]
    pub status: CellStatus,
    #[serde(default)]
    pub own: Option<RawOwn>,
    /// Millisecond timestamp until which the cell sits in a novice area.
    #[serde(default)]
    pub novice: Option<i64>,
    /// Millisecond timestamp until which the cell sits in a respawn area.
    #[serde(default, rename = "respawnArea")]
    pub respawn_area: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RawOwn {
    pub user: String,
    pub level: u8,
}

#[derive(Debug, Deserialize)]
pub struct RawUser {
    pub username: String,
    #[serde(default)]
    pub badge: BadgeConfig,
}

impl WorldStats {
    /// Builds the per-cycle picture from a raw stats payload.
    ///
    /// `now` is the instant novice/respawn windows are compared against; an
    /// open window overrides the reported status. Cell names that do not
    /// parse and the NPC invader account are dropped.
    pub fn from_raw(raw: RawStatsResponse, now: DateTime<Utc>) -> Self {
        let now_ms = now.timestamp_millis();
        let mut cells = HashMap::with_capacity(raw.stats.len());
        for (name, cell) in raw.stats {
            let Ok(id) = name.parse::<CellId>() else {
                continue;
            };
            let status = resolve_status(&cell, now_ms);
            let owner = cell
                .own
                .filter(|own| own.user != NPC_OWNER_ID)
                .map(|own| CellOwner {
                    id: own.user,
                    level: own.level,
                });
            cells.insert(id, CellRecord { status, owner });
        }
        let owners = raw
            .users
            .into_iter()
            .filter(|(id, _)| id != NPC_OWNER_ID)
            .map(|(id, user)| {
                (
                    id,
                    OwnerProfile {
                        username: user.username,
                        badge: user.badge,
                    },
                )
            })
            .collect();
        Self { cells, owners }
    }
}

/// A window timestamp strictly in the future wins over the reported status;
/// novice wins over respawn when both are open.
fn resolve_status(cell: &RawCellStats, now_ms: i64) -> CellStatus {
    if cell.novice.is_some_and(|until| until > now_ms) {
        CellStatus::Novice
    } else if cell.respawn_area.is_some_and(|until| until > now_ms) {
        CellStatus::Respawn
    } else {
        cell.status
    }
}
