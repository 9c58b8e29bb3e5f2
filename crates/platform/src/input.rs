//! Keyboard state and its translation into frame loop commands.

use std::collections::HashSet;

use gsync_pacing::InputCommands;
pub use winit::keyboard::KeyCode;

const QUIT_KEYS: [KeyCode; 2] = [KeyCode::Escape, KeyCode::KeyQ];

/// Tracks the keyboard between polls.
#[derive(Debug, Default)]
pub struct InputState {
    /// Currently pressed keys
    pressed_keys: HashSet<KeyCode>,
    /// Keys that went down since the last poll
    just_pressed_keys: HashSet<KeyCode>,
    /// Keys that went up since the last poll
    just_released_keys: HashSet<KeyCode>,
    close_requested: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the per-poll edges.
    pub fn begin_frame(&mut self) {
        self.just_pressed_keys.clear();
        self.just_released_keys.clear();
    }

    /// Records a key press. OS key repeat does not produce a new edge.
    pub fn on_key_pressed(&mut self, key: KeyCode) {
        if self.pressed_keys.insert(key) {
            self.just_pressed_keys.insert(key);
        }
    }

    pub fn on_key_released(&mut self, key: KeyCode) {
        if self.pressed_keys.remove(&key) {
            self.just_released_keys.insert(key);
        }
    }

    /// Records a window close request.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.just_released_keys.contains(&key)
    }

    /// Translates the keys pressed since the last poll.
    ///
    /// `rate_step` is the frame rate change per arrow or page key press.
    pub fn commands(&self, rate_step: u32) -> InputCommands {
        let step = i32::try_from(rate_step).unwrap_or(i32::MAX);
        let edge = |key| i32::from(self.is_key_just_pressed(key));

        InputCommands {
            quit: self.close_requested || QUIT_KEYS.iter().any(|&k| self.is_key_just_pressed(k)),
            adjust_max_by: step * (edge(KeyCode::ArrowUp) - edge(KeyCode::ArrowDown)),
            adjust_min_by: step * (edge(KeyCode::PageUp) - edge(KeyCode::PageDown)),
            toggle_vsync: self.is_key_just_pressed(KeyCode::KeyV),
            toggle_gsync: self.is_key_just_pressed(KeyCode::KeyG),
        }
    }
}
