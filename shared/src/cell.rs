use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// East-west half of a cell coordinate. Magnitudes count outward from the
/// central meridian, so `W0` and `E0` are adjacent columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Longitude {
    West(u32),
    East(u32),
}

/// North-south half of a cell coordinate, mirroring [`Longitude`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Latitude {
    North(u32),
    South(u32),
}

impl Longitude {
    /// Column of this coordinate counted from the west edge, given the
    /// half-world width in cells. West columns come first.
    pub fn index(self, half: u32) -> i64 {
        match self {
            Longitude::West(mag) => i64::from(half) - 1 - i64::from(mag),
            Longitude::East(mag) => i64::from(half) + i64::from(mag),
        }
    }

    pub fn from_index(index: u32, half: u32) -> Self {
        if index < half {
            Longitude::West(half - 1 - index)
        } else {
            Longitude::East(index - half)
        }
    }
}

impl Latitude {
    /// Row counted from the north edge. North rows come first.
    pub fn index(self, half: u32) -> i64 {
        match self {
            Latitude::North(mag) => i64::from(half) - 1 - i64::from(mag),
            Latitude::South(mag) => i64::from(half) + i64::from(mag),
        }
    }

    pub fn from_index(index: u32, half: u32) -> Self {
        if index < half {
            Latitude::North(half - 1 - index)
        } else {
            Latitude::South(index - half)
        }
    }
}

/// Identifier of one map cell, e.g. `W12N3`: longitude part first, then
/// latitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId {
    pub lon: Longitude,
    pub lat: Latitude,
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lon {
            Longitude::West(mag) => write!(f, "W{mag}")?,
            Longitude::East(mag) => write!(f, "E{mag}")?,
        }
        match self.lat {
            Latitude::North(mag) => write!(f, "N{mag}"),
            Latitude::South(mag) => write!(f, "S{mag}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCellIdError(String);

impl fmt::Display for ParseCellIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cell id `{}`", self.0)
    }
}

impl std::error::Error for ParseCellIdError {}

impl FromStr for CellId {
    type Err = ParseCellIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCellIdError(s.to_string());
        if s.len() < 4 || !s.is_ascii() {
            return Err(err());
        }
        let split = s[1..].find(['N', 'S']).map(|i| i + 1).ok_or_else(err)?;
        let lon_mag: u32 = s[1..split].parse().map_err(|_| err())?;
        let lat_mag: u32 = s[split + 1..].parse().map_err(|_| err())?;
        let lon = match s.as_bytes()[0] {
            b'W' => Longitude::West(lon_mag),
            b'E' => Longitude::East(lon_mag),
            _ => return Err(err()),
        };
        // `find` above only stops on N or S
        let lat = match s.as_bytes()[split] {
            b'N' => Latitude::North(lat_mag),
            _ => Latitude::South(lat_mag),
        };
        Ok(CellId { lon, lat })
    }
}

impl Serialize for CellId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
