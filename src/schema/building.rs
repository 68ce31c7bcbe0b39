//! Building catalog: positions, kinds and their economic payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan (taxicab) distance.
    #[inline]
    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// True when both coordinates are odd, i.e. the cell may host a building.
    #[inline]
    pub fn is_lattice(self) -> bool {
        self.x.rem_euclid(2) == 1 && self.y.rem_euclid(2) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Closed set of cell kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    House,
    Shop,
    Office,
    Road,
    Empty,
}

impl BuildingKind {
    /// Kinds a buildable lattice cell can be turned into.
    pub const PLACEABLE: [BuildingKind; 3] =
        [BuildingKind::House, BuildingKind::Shop, BuildingKind::Office];

    /// Display symbol used by the symbol grid.
    #[inline]
    pub const fn symbol(self) -> char {
        match self {
            BuildingKind::House => 'H',
            BuildingKind::Shop => 'S',
            BuildingKind::Office => 'O',
            BuildingKind::Road => '+',
            BuildingKind::Empty => ' ',
        }
    }
}

/// Kind-specific economic parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Payload {
    None,
    Shop { average_spend: f64, variation: f64 },
    Office { average_salary: f64, variation: f64 },
}

/// A placed building. Kind and payload always agree.
///
/// Equality compares positions only: two buildings on the same cell are
/// considered the same building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    kind: BuildingKind,
    position: Position,
    payload: Payload,
}

impl PartialEq for Building {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl Eq for Building {}

impl Building {
    pub fn house(position: Position) -> Self {
        Self {
            kind: BuildingKind::House,
            position,
            payload: Payload::None,
        }
    }

    pub fn road(position: Position) -> Self {
        Self {
            kind: BuildingKind::Road,
            position,
            payload: Payload::None,
        }
    }

    /// Shop with an already resolved spend value.
    pub fn shop(position: Position, average_spend: f64, variation: f64) -> Self {
        Self {
            kind: BuildingKind::Shop,
            position,
            payload: Payload::Shop {
                average_spend,
                variation,
            },
        }
    }

    /// Office with an already resolved salary value.
    pub fn office(position: Position, average_salary: f64, variation: f64) -> Self {
        Self {
            kind: BuildingKind::Office,
            position,
            payload: Payload::Office {
                average_salary,
                variation,
            },
        }
    }

    /// Build a kind with a given payload, falling back to a zero payload when
    /// the supplied one belongs to another kind.
    pub fn with_kind(kind: BuildingKind, position: Position, payload: Payload) -> Self {
        let payload = match (kind, payload) {
            (BuildingKind::Shop, p @ Payload::Shop { .. }) => p,
            (BuildingKind::Shop, _) => Payload::Shop {
                average_spend: 0.0,
                variation: 0.0,
            },
            (BuildingKind::Office, p @ Payload::Office { .. }) => p,
            (BuildingKind::Office, _) => Payload::Office {
                average_salary: 0.0,
                variation: 0.0,
            },
            (BuildingKind::House | BuildingKind::Road | BuildingKind::Empty, _) => Payload::None,
        };
        Self {
            kind,
            position,
            payload,
        }
    }

    #[inline]
    pub fn kind(&self) -> BuildingKind {
        self.kind
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    #[inline]
    pub fn payload(&self) -> Payload {
        self.payload
    }

    #[inline]
    pub fn symbol(&self) -> char {
        self.kind.symbol()
    }

    /// Salary paid by an office.
    pub fn salary(&self) -> Option<f64> {
        match self.payload {
            Payload::Office { average_salary, .. } => Some(average_salary),
            _ => None,
        }
    }

    /// Amount spent at a shop.
    pub fn spend(&self) -> Option<f64> {
        match self.payload {
            Payload::Shop { average_spend, .. } => Some(average_spend),
            _ => None,
        }
    }

    /// Salary for offices, spend for shops.
    pub fn economic_value(&self) -> Option<f64> {
        match self.payload {
            Payload::Shop { average_spend, .. } => Some(average_spend),
            Payload::Office { average_salary, .. } => Some(average_salary),
            Payload::None => None,
        }
    }

    /// Overwrite the salary or spend. Returns false for kinds without one.
    pub fn set_economic_value(&mut self, value: f64) -> bool {
        match &mut self.payload {
            Payload::Shop { average_spend, .. } => {
                *average_spend = value;
                true
            }
            Payload::Office { average_salary, .. } => {
                *average_salary = value;
                true
            }
            Payload::None => false,
        }
    }
}

/// Round down to two decimal places.
#[inline]
pub fn floor_cents(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}
