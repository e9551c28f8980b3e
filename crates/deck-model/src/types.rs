use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::CardId;

/// A model invariant was violated. The rejected operation has no effect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("card has no front image")]
    MissingFrontImage,
    #[error("card size {found} does not match deck size {expected}")]
    SizeClassMismatch { expected: SizeClass, found: SizeClass },
    #[error("size class cannot change while the deck holds {cards} card(s)")]
    SizeClassLocked { cards: usize },
    #[error("invalid card size {width_mm}x{height_mm} mm")]
    InvalidSize { width_mm: f32, height_mm: f32 },
    #[error("card {id} carries a back image that differs from the shared back")]
    ConflictingBack { id: CardId },
    #[error("card {id} has no alternate face")]
    NoAlternateFace { id: CardId },
    #[error("card {id} is already in the deck with different content")]
    DuplicateId { id: CardId },
    #[error("index {index} out of bounds for deck of {len} card(s)")]
    IndexOutOfBounds { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Physical card size class shared by every card in a deck
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    /// Poker-size card, 63.5 x 88.9 mm
    #[default]
    Standard,
    /// Mini card, 44 x 68 mm
    Small,
    Custom { width_mm: f32, height_mm: f32 },
}

impl SizeClass {
    /// Card dimensions (width, height) in millimetres
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            SizeClass::Standard => (63.5, 88.9),
            SizeClass::Small => (44.0, 68.0),
            SizeClass::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    pub fn validate(self) -> Result<()> {
        let (width_mm, height_mm) = self.dimensions_mm();
        if !(width_mm.is_finite() && height_mm.is_finite()) || width_mm <= 0.0 || height_mm <= 0.0
        {
            return Err(ValidationError::InvalidSize {
                width_mm,
                height_mm,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for SizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeClass::Standard => write!(f, "standard"),
            SizeClass::Small => write!(f, "small"),
            SizeClass::Custom {
                width_mm,
                height_mm,
            } => write!(f, "custom:{}x{}", width_mm, height_mm),
        }
    }
}

impl std::str::FromStr for SizeClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "standard" => Ok(SizeClass::Standard),
            "small" => Ok(SizeClass::Small),
            other => {
                let dims = other
                    .strip_prefix("custom:")
                    .ok_or_else(|| format!("unknown size class '{other}'"))?;
                let (w, h) = dims
                    .split_once('x')
                    .ok_or_else(|| format!("malformed custom size '{dims}'"))?;
                let width_mm = w.parse::<f32>().map_err(|e| e.to_string())?;
                let height_mm = h.parse::<f32>().map_err(|e| e.to_string())?;
                Ok(SizeClass::Custom {
                    width_mm,
                    height_mm,
                })
            }
        }
    }
}

/// Whether each card may carry its own back or all cards share one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sidedness {
    #[default]
    DoubleSided,
    SingleBackShared,
}

impl Sidedness {
    pub fn name(self) -> &'static str {
        match self {
            Sidedness::DoubleSided => "double-sided",
            Sidedness::SingleBackShared => "single-back-shared",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "double-sided" => Some(Sidedness::DoubleSided),
            "single-back-shared" => Some(Sidedness::SingleBackShared),
            _ => None,
        }
    }
}

/// Orientation flag of a deck entry: played front up, or on its alternate face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    #[default]
    Front,
    Alternate,
}

/// Card category. Selects the deck's per-kind back and the deck section on export.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Player,
    Encounter,
    Villain,
    #[default]
    Unspecified,
}

impl CardKind {
    pub const ALL: [CardKind; 4] = [
        CardKind::Player,
        CardKind::Encounter,
        CardKind::Villain,
        CardKind::Unspecified,
    ];
}
