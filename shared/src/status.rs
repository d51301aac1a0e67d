use serde::{Deserialize, Serialize};

/// Accessibility state of a cell as reported by the stats service.
///
/// Strings the service grows later deserialize to [`CellStatus::Unknown`],
/// which renders without a mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    #[default]
    Normal,
    #[serde(rename = "out of borders")]
    OutOfBorders,
    Respawn,
    Novice,
    #[serde(other)]
    Unknown,
}
