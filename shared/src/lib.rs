pub mod cell;
pub mod grid;
pub mod shard;
pub mod stats;
pub mod status;

pub use cell::{CellId, Latitude, Longitude, ParseCellIdError};
pub use grid::WorldGrid;
pub use shard::Shard;
pub use stats::*;
pub use status::CellStatus;
