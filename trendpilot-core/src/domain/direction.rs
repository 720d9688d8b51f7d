//! Trade direction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an entry or an open position.
///
/// The signal pipeline encodes "no entry" as `Option<Direction>::None`,
/// which maps onto the integer convention `entry_dir ∈ {-1, 0, 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> i8 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// Order side used when entering in this direction.
    pub fn order_side(self) -> &'static str {
        match self {
            Direction::Long => "buy",
            Direction::Short => "sell",
        }
    }

    /// Label written to the order log.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Integer encoding of an optional direction (`entry_dir`).
pub fn entry_dir(direction: Option<Direction>) -> i8 {
    direction.map_or(0, Direction::sign)
}
