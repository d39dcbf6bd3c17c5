//! Button and flip-wall behavior passes.

use glam::Quat;
use hecs::{Entity, World};

use crate::ecs::components::gameplay::{Button, FlipWall, ObjectFlags};
use crate::ecs::components::transform::{rotation_matrix_degrees, Transform};

/// Animate buttons toward their pressed or rest pose and latch the
/// edge-detection state from the trigger-maintained overlap counter.
pub fn update_buttons(world: &mut World, dt: f32) {
    for (_, (button, transform)) in world.query_mut::<(&mut Button, &mut Transform)>() {
        button.last_pressed = button.pressed;
        button.pressed = button.objects_on > 0;

        let target = if button.pressed {
            button.pressed_position
        } else {
            button.initial_position
        };

        let diff = target - transform.position;
        let dist = diff.length();
        if dist > 1e-4 {
            let step = button.press_speed * dt;
            if step >= dist {
                transform.position = target;
            } else {
                transform.position += diff / dist * step;
            }
        }
    }
}

/// Step flip walls toward their target angle, rotating the transform about
/// the pivot. A wall mid-rotation cannot host a portal.
pub fn update_flip_walls(world: &mut World, dt: f32) {
    for (_, (flip, transform, flags)) in
        world.query_mut::<(&mut FlipWall, &mut Transform, &mut ObjectFlags)>()
    {
        if (flip.current_angle - flip.target_angle).abs() < 0.01 {
            flip.current_angle = flip.target_angle;
            flip.rotating = false;
        } else {
            flip.rotating = true;
            let step = flip.speed * dt;
            if flip.current_angle < flip.target_angle {
                flip.current_angle = (flip.current_angle + step).min(flip.target_angle);
            } else {
                flip.current_angle = (flip.current_angle - step).max(flip.target_angle);
            }
        }
        flags.can_open_portal = !flip.rotating;

        let rot_init = rotation_matrix_degrees(flip.initial_rotation);
        let pivot_world = flip.initial_position
            + rot_init.transform_point3(flip.pivot_local * transform.scale);
        let q = Quat::from_axis_angle(flip.rotation_axis, flip.current_angle.to_radians());

        transform.position = pivot_world + q * (flip.initial_position - pivot_world);
        transform.rotation = flip.initial_rotation + flip.rotation_axis * flip.current_angle;
    }
}

/// React to button edges: a just-pressed button flips its target wall, a
/// just-released one resets it.
pub fn drive_button_targets(world: &mut World) {
    let actions: Vec<(Entity, bool)> = world
        .query::<&Button>()
        .iter()
        .filter_map(|(_, button)| {
            let target = button.target?;
            if button.just_pressed() {
                Some((target, true))
            } else if button.just_released() {
                Some((target, false))
            } else {
                None
            }
        })
        .collect();

    for (target, flip) in actions {
        if let Ok(mut wall) = world.get::<&mut FlipWall>(target) {
            if flip {
                wall.flip();
            } else {
                wall.reset();
            }
        }
    }
}
