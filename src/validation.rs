//! Local checks applied before anything is sent to the bridge.
//!
//! Rejections here never issue a bridge request; the caller keeps the user in
//! the editor or drawing mode they were in.

use crate::geometry::is_simple_polygon;
use crate::model::Point;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MIN_ROOM_POINTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    TooFewPoints { count: usize },
    SelfIntersecting,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "room name must not be empty"),
            Self::TooFewPoints { count } => write!(
                f,
                "a room needs at least {MIN_ROOM_POINTS} points, got {count}"
            ),
            Self::SelfIntersecting => write!(f, "room outline crosses itself"),
        }
    }
}

impl Error for ValidationError {}

/// Returns the trimmed name, or `EmptyName`.
pub fn validate_room_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(name.to_string())
}

/// Outline policy for rooms.
///
/// `Permissive` accepts self-intersecting outlines; selection then follows
/// even-odd semantics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolygonPolicy {
    #[default]
    Permissive,
    RequireSimple,
}

impl PolygonPolicy {
    pub fn check(self, points: &[Point]) -> Result<(), ValidationError> {
        if points.len() < MIN_ROOM_POINTS {
            return Err(ValidationError::TooFewPoints {
                count: points.len(),
            });
        }
        match self {
            PolygonPolicy::Permissive => Ok(()),
            PolygonPolicy::RequireSimple if is_simple_polygon(points) => Ok(()),
            PolygonPolicy::RequireSimple => Err(ValidationError::SelfIntersecting),
        }
    }
}
