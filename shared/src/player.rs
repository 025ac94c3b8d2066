use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Color channels in `0.0..=1.0`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Picks each channel uniformly at random.
    pub fn random() -> Self {
        Self {
            r: rand::random::<f32>(),
            g: rand::random::<f32>(),
            b: rand::random::<f32>(),
        }
    }
}

/// One participant as known to the authority or to a peer.
///
/// `id` is assigned by the authority when the connection is accepted and is
/// the only stable key for a player. `color` never changes after creation;
/// `position` is self-reported by the owning peer and replaced wholesale on
/// every remote copy.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerState {
    pub id: String,
    pub color: Rgb,
    pub position: Vec3,
}

impl PlayerState {
    pub fn new(id: impl Into<String>, color: Rgb, position: Vec3) -> Self {
        Self {
            id: id.into(),
            color,
            position,
        }
    }

    /// A local player that has not received its id yet.
    pub fn unassigned(color: Rgb, position: Vec3) -> Self {
        Self::new(String::new(), color, position)
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }
}
