//! Per-frame input snapshot supplied by the embedding layer.

/// Input state for one frame. Held keys are level-triggered; `*_pressed`
/// fields are edge-triggered and true only on the frame the key went down.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub jump_pressed: bool,
    /// Grab/release toggle.
    pub grab_pressed: bool,
    /// Fires portal A, or throws a carried object.
    pub fire_primary: bool,
    /// Fires portal B.
    pub fire_secondary: bool,
    /// Mouse delta since last frame: +x right, +y up.
    pub look_delta: (f32, f32),
}
