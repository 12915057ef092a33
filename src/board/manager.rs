/// Pin board manager backed by the `pins` JSON document
use crate::{
    account::User,
    board::{
        next_z_index, sort_for_display, validate_content, validate_rotation, validate_z_index,
        CreatePinRequest, Pin, Position, UpdatePinRequest,
    },
    error::{ApiError, ApiResult},
    likes::toggle_like,
    metrics,
    store::{collection::Snapshot, Collection, DocumentBackend},
};
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Pin board manager
pub struct PinManager {
    pins: Collection<Pin>,
}

/// Small random tilt so new pins look hand-placed
fn random_tilt() -> f64 {
    let tilt: f64 = rand::thread_rng().gen_range(-3.0..=3.0);
    (tilt * 10.0).round() / 10.0
}

fn random_position() -> Position {
    let mut rng = rand::thread_rng();
    Position::new(rng.gen_range(5.0..=85.0), rng.gen_range(5.0..=85.0))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PinManager {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            pins: Collection::new(backend),
        }
    }

    /// All pins, bottom-most first, with the document's entity tag
    pub async fn list(&self) -> ApiResult<Snapshot<Pin>> {
        let mut snapshot = self.pins.snapshot().await?;
        sort_for_display(&mut snapshot.records);
        Ok(snapshot)
    }

    /// Get a pin by id
    pub async fn get(&self, id: &str) -> ApiResult<Pin> {
        self.pins.get(id).await
    }

    /// Create a pin on top of every existing pin
    pub async fn create(&self, author: &User, req: CreatePinRequest) -> ApiResult<Pin> {
        req.validate()?;

        let url = non_empty(req.url);
        validate_content(req.kind, &req.content, url.as_deref())?;

        let position = match req.position {
            Some(position) => position.clamped()?,
            None => random_position(),
        };
        let rotation = match req.rotation {
            Some(rotation) => validate_rotation(rotation)?,
            None => random_tilt(),
        };

        let pin = self
            .pins
            .update(|pins| {
                let now = Utc::now();
                let z_index = next_z_index(pins)?;
                let pin = Pin {
                    id: Uuid::new_v4().to_string(),
                    kind: req.kind,
                    title: non_empty(req.title),
                    content: req.content.trim().to_string(),
                    url,
                    color: non_empty(req.color),
                    position,
                    rotation,
                    z_index,
                    likes: Vec::new(),
                    author_id: author.id.clone(),
                    author_name: author.display_name.clone(),
                    created_at: now,
                    updated_at: now,
                };
                pins.push(pin.clone());
                Ok(pin)
            })
            .await?;

        metrics::record_pin_event("create");
        tracing::debug!("{} pinned {} at z {}", author.id, pin.id, pin.z_index);

        Ok(pin)
    }

    /// Apply a partial update.
    ///
    /// Anyone signed in may move, tilt or restack a pin; changing what it
    /// shows is limited to its author and admins.
    pub async fn update(&self, actor: &User, req: UpdatePinRequest) -> ApiResult<Pin> {
        req.validate()?;

        let position = req.position.map(Position::clamped).transpose()?;
        let rotation = req.rotation.map(validate_rotation).transpose()?;
        let z_index = req.z_index.map(validate_z_index).transpose()?;

        let pin = self
            .pins
            .update(|pins| {
                let top = if req.bring_to_front {
                    Some(next_z_index(pins)?)
                } else {
                    None
                };
                let pin = pins
                    .iter_mut()
                    .find(|p| p.id == req.id)
                    .ok_or_else(|| ApiError::NotFound("Pin not found".to_string()))?;

                if req.edits_content() && !actor.can_manage(&pin.author_id) {
                    return Err(ApiError::Authorization(
                        "Only the author can edit this pin".to_string(),
                    ));
                }

                if let Some(position) = position {
                    pin.position = position;
                }
                if let Some(rotation) = rotation {
                    pin.rotation = rotation;
                }
                if let Some(z_index) = z_index {
                    pin.z_index = z_index;
                }
                if let Some(top) = top {
                    if pin.z_index < top - 1 {
                        pin.z_index = top;
                    }
                }
                if req.title.is_some() {
                    pin.title = non_empty(req.title);
                }
                if let Some(content) = req.content {
                    pin.content = content.trim().to_string();
                }
                if req.url.is_some() {
                    pin.url = non_empty(req.url);
                }
                if req.color.is_some() {
                    pin.color = non_empty(req.color);
                }

                validate_content(pin.kind, &pin.content, pin.url.as_deref())?;

                pin.updated_at = Utc::now();
                Ok(pin.clone())
            })
            .await?;

        metrics::record_pin_event("update");
        Ok(pin)
    }

    /// Like or unlike a pin for `user_id`
    pub async fn toggle_like(&self, id: &str, user_id: &str) -> ApiResult<Pin> {
        let pin = self
            .pins
            .modify(id, |pin| {
                toggle_like(&mut pin.likes, user_id);
                Ok(pin.clone())
            })
            .await?;

        metrics::record_pin_event("like");
        Ok(pin)
    }

    /// Delete a pin (author or admin)
    pub async fn delete(&self, actor: &User, id: &str) -> ApiResult<Pin> {
        let pin = self
            .pins
            .update(|pins| {
                let index = pins
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| ApiError::NotFound("Pin not found".to_string()))?;

                if !actor.can_manage(&pins[index].author_id) {
                    return Err(ApiError::Authorization(
                        "Only the author can delete this pin".to_string(),
                    ));
                }

                Ok(pins.remove(index))
            })
            .await?;

        metrics::record_pin_event("delete");
        tracing::info!("{} deleted pin {}", actor.id, pin.id);
        Ok(pin)
    }
}
