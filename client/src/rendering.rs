use crate::session::EntityRenderer;
use macroquad::prelude::*;
use shared::{Rgb, Vec3 as Position};
use std::collections::HashMap;

const CUBE_SIZE: f32 = 1.0;
const GRID_SLICES: u32 = 40;

/// Names one cube owned by a [`SceneRenderer`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct EntityHandle(u32);

#[derive(Debug, Clone, Copy)]
struct Cube {
    color: Color,
    position: Position,
}

#[derive(Debug, Clone)]
pub struct HudInfo<'a> {
    pub player_id: &'a str,
    pub status: &'a str,
    pub remote_players: usize,
}

/// Draws every player as a colored cube on a ground grid.
#[derive(Default)]
pub struct SceneRenderer {
    next_handle: u32,
    cubes: HashMap<u32, Cube>,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_count(&self) -> usize {
        self.cubes.len()
    }

    pub fn position_of(&self, handle: &EntityHandle) -> Option<Position> {
        self.cubes.get(&handle.0).map(|cube| cube.position)
    }

    /// Draws one frame with the camera looking at `focus`.
    pub fn render(&self, focus: Position, hud: &HudInfo<'_>) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        let target = vec3(focus.x, focus.y, focus.z);
        set_camera(&Camera3D {
            position: target + vec3(0.0, 12.0, 14.0),
            up: vec3(0.0, 1.0, 0.0),
            target,
            ..Default::default()
        });

        draw_grid(GRID_SLICES, 1.0, Color::from_rgba(68, 68, 68, 255), DARKGRAY);

        for cube in self.cubes.values() {
            let center = vec3(
                cube.position.x,
                cube.position.y + CUBE_SIZE / 2.0,
                cube.position.z,
            );
            let size = vec3(CUBE_SIZE, CUBE_SIZE, CUBE_SIZE);
            draw_cube(center, size, None, cube.color);
            draw_cube_wires(center, size, WHITE);
        }

        set_default_camera();
        self.draw_hud(hud);
    }

    fn draw_hud(&self, hud: &HudInfo<'_>) {
        let connection_color = if hud.player_id.is_empty() { RED } else { GREEN };
        draw_rectangle(10.0, 10.0, 8.0, 8.0, connection_color);
        draw_text(hud.status, 24.0, 18.0, 16.0, WHITE);

        let id_text = if hud.player_id.is_empty() {
            "id: -".to_string()
        } else {
            format!("id: {}", hud.player_id)
        };
        draw_text(&id_text, 10.0, 36.0, 16.0, WHITE);

        let players_text = format!("{} other players", hud.remote_players);
        draw_text(&players_text, 10.0, 54.0, 16.0, WHITE);
    }
}

fn to_color(rgb: Rgb) -> Color {
    Color::new(rgb.r, rgb.g, rgb.b, 1.0)
}

impl EntityRenderer for SceneRenderer {
    type Handle = EntityHandle;

    fn create_entity(&mut self, color: Rgb, position: Position) -> EntityHandle {
        self.next_handle += 1;
        self.cubes.insert(
            self.next_handle,
            Cube {
                color: to_color(color),
                position,
            },
        );
        EntityHandle(self.next_handle)
    }

    fn set_position(&mut self, handle: &EntityHandle, position: Position) {
        if let Some(cube) = self.cubes.get_mut(&handle.0) {
            cube.position = position;
        }
    }

    fn destroy_entity(&mut self, handle: EntityHandle) {
        self.cubes.remove(&handle.0);
    }
}
