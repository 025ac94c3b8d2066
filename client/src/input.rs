//! Keyboard movement for the local player.

use crate::session::LocalInput;
use macroquad::prelude::{get_frame_time, is_key_down, KeyCode};
use shared::Vec3;

/// Keys held down during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveKeys {
    /// Samples WASD and the arrow keys. Needs a live macroquad window.
    pub fn sample() -> Self {
        Self {
            forward: is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            back: is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
            left: is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
        }
    }

    /// Unit direction on the XZ plane, or zero.
    pub fn direction(&self) -> Vec3 {
        let mut x: f32 = 0.0;
        let mut z: f32 = 0.0;
        if self.forward {
            z -= 1.0;
        }
        if self.back {
            z += 1.0;
        }
        if self.left {
            x -= 1.0;
        }
        if self.right {
            x += 1.0;
        }

        let length = (x * x + z * z).sqrt();
        if length == 0.0 {
            return Vec3::ZERO;
        }
        Vec3::new(x / length, 0.0, z / length)
    }
}

/// Moves the local player around the ground plane at a fixed speed.
pub struct KeyboardMover {
    position: Vec3,
    speed: f32,
}

impl KeyboardMover {
    pub fn new(start: Vec3, speed: f32) -> Self {
        Self {
            position: start,
            speed,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Advances the position by `dt` seconds of movement.
    pub fn step(&mut self, keys: MoveKeys, dt: f32) -> Vec3 {
        let direction = keys.direction();
        self.position.x += direction.x * self.speed * dt;
        self.position.z += direction.z * self.speed * dt;
        self.position
    }
}

impl LocalInput for KeyboardMover {
    fn current_local_position(&mut self) -> Vec3 {
        self.step(MoveKeys::sample(), get_frame_time())
    }
}
