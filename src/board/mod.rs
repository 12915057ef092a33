/// Shared pin board
///
/// Pins are content cards placed on one shared whiteboard using percentage
/// coordinates. Stacking order is a per-board `zIndex` that only grows.

mod manager;

pub use manager::PinManager;

use crate::{
    error::{ApiError, ApiResult},
    store::Record,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Largest tilt a pin may have, in degrees either way
pub const MAX_ROTATION: f64 = 45.0;

/// Highest stacking value a pin may hold
pub const MAX_Z_INDEX: i64 = 1 << 40;

/// What a pin shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    Photo,
    Quote,
    Video,
    Link,
}

impl PinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinKind::Photo => "photo",
            PinKind::Quote => "quote",
            PinKind::Video => "video",
            PinKind::Link => "link",
        }
    }

    /// Photo, video and link pins point at something
    pub fn requires_url(&self) -> bool {
        !matches!(self, PinKind::Quote)
    }
}

/// Board position in percent of the board's width and height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp into the visible board; non-finite coordinates are rejected
    pub fn clamped(self) -> ApiResult<Self> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(ApiError::Validation(
                "Position must be a finite number".to_string(),
            ));
        }
        Ok(Self {
            x: self.x.clamp(0.0, 100.0),
            y: self.y.clamp(0.0, 100.0),
        })
    }
}

/// Pin record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PinKind,
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    pub url: Option<String>,
    pub color: Option<String>,
    pub position: Position,
    pub rotation: f64,
    pub z_index: i64,
    #[serde(default)]
    pub likes: Vec<String>,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Pin {
    const DOCUMENT: &'static str = "pins";
    const KIND: &'static str = "Pin";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Create pin request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePinRequest {
    #[serde(rename = "type")]
    pub kind: PinKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 32))]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

/// Partial pin update. Only present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePinRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    /// Put the pin above every other pin
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bring_to_front: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 5000))]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 32))]
    pub color: Option<String>,
}

impl UpdatePinRequest {
    /// Move-only update for pin `id`
    pub fn move_to(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            position: Some(position),
            ..Default::default()
        }
    }

    /// Whether the update touches what the pin shows (author or admin only)
    pub fn edits_content(&self) -> bool {
        self.title.is_some() || self.content.is_some() || self.url.is_some() || self.color.is_some()
    }
}

/// `zIndex` for a new top-most pin: one above the current maximum, 1 on an empty board
pub fn next_z_index(pins: &[Pin]) -> ApiResult<i64> {
    let Some(max) = pins.iter().map(|p| p.z_index).max() else {
        return Ok(1);
    };
    max.checked_add(1)
        .filter(|z| *z <= MAX_Z_INDEX)
        .ok_or_else(|| {
            ApiError::Validation("The board has no stacking room left above the top pin".to_string())
        })
}

/// Reject stacking values outside `0..=MAX_Z_INDEX`
pub fn validate_z_index(z_index: i64) -> ApiResult<i64> {
    if !(0..=MAX_Z_INDEX).contains(&z_index) {
        return Err(ApiError::Validation(format!(
            "zIndex must be between 0 and {}",
            MAX_Z_INDEX
        )));
    }
    Ok(z_index)
}

/// Bottom-most first, ties broken by creation time
pub fn sort_for_display(pins: &mut [Pin]) {
    pins.sort_by(|a, b| {
        a.z_index
            .cmp(&b.z_index)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

/// Check the content rules for a pin kind
pub fn validate_content(kind: PinKind, content: &str, url: Option<&str>) -> ApiResult<()> {
    if kind.requires_url() && url.map_or(true, |u| u.trim().is_empty()) {
        return Err(ApiError::Validation(format!(
            "A {} pin needs a url",
            kind.as_str()
        )));
    }
    if kind == PinKind::Quote && content.trim().is_empty() {
        return Err(ApiError::Validation(
            "A quote pin needs content".to_string(),
        ));
    }
    Ok(())
}

/// Reject tilts outside the allowed range
pub fn validate_rotation(rotation: f64) -> ApiResult<f64> {
    if !rotation.is_finite() || rotation.abs() > MAX_ROTATION {
        return Err(ApiError::Validation(format!(
            "Rotation must be between -{0} and {0} degrees",
            MAX_ROTATION
        )));
    }
    Ok(rotation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin_with_z(z_index: i64) -> Pin {
        let now = Utc::now();
        Pin {
            id: format!("pin-{}", z_index),
            kind: PinKind::Quote,
            title: None,
            content: "Design is thinking made visual".to_string(),
            url: None,
            color: None,
            position: Position::new(10.0, 10.0),
            rotation: 0.0,
            z_index,
            likes: Vec::new(),
            author_id: "u1".to_string(),
            author_name: "Teacher".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_next_z_index() {
        assert_eq!(next_z_index(&[]).unwrap(), 1);
        assert_eq!(
            next_z_index(&[pin_with_z(3), pin_with_z(7), pin_with_z(2)]).unwrap(),
            8
        );
    }

    #[test]
    fn test_next_z_index_never_overflows() {
        assert_eq!(next_z_index(&[pin_with_z(MAX_Z_INDEX - 1)]).unwrap(), MAX_Z_INDEX);
        assert!(matches!(
            next_z_index(&[pin_with_z(MAX_Z_INDEX)]),
            Err(ApiError::Validation(_))
        ));
        assert!(next_z_index(&[pin_with_z(i64::MAX)]).is_err());
    }

    #[test]
    fn test_z_index_bounds() {
        assert_eq!(validate_z_index(0).unwrap(), 0);
        assert_eq!(validate_z_index(MAX_Z_INDEX).unwrap(), MAX_Z_INDEX);
        assert!(validate_z_index(-1).is_err());
        assert!(validate_z_index(i64::MAX).is_err());
    }

    #[test]
    fn test_position_clamped() {
        let p = Position::new(-5.0, 140.0).clamped().unwrap();
        assert_eq!(p, Position::new(0.0, 100.0));
        assert!(Position::new(f64::NAN, 1.0).clamped().is_err());
    }

    #[test]
    fn test_content_rules() {
        assert!(validate_content(PinKind::Photo, "", Some("https://x.test/a.png")).is_ok());
        assert!(validate_content(PinKind::Photo, "caption", None).is_err());
        assert!(validate_content(PinKind::Link, "", Some("  ")).is_err());
        assert!(validate_content(PinKind::Quote, "  ", None).is_err());
        assert!(validate_content(PinKind::Quote, "Form follows function", None).is_ok());
    }

    #[test]
    fn test_rotation_bounds() {
        assert!(validate_rotation(12.5).is_ok());
        assert!(validate_rotation(-45.0).is_ok());
        assert!(validate_rotation(90.0).is_err());
    }

    #[test]
    fn test_sort_for_display() {
        let mut pins = vec![pin_with_z(5), pin_with_z(1), pin_with_z(3)];
        sort_for_display(&mut pins);
        let order: Vec<i64> = pins.iter().map(|p| p.z_index).collect();
        assert_eq!(order, vec![1, 3, 5]);
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(pin_with_z(4)).unwrap();
        assert_eq!(json["type"], "quote");
        assert_eq!(json["zIndex"], 4);
        assert_eq!(json["authorId"], "u1");
        assert_eq!(json["position"]["x"], 10.0);
    }
}
