//! Platform layer for the G-Sync test bench.
//!
//! This crate provides:
//! - The winit window and its Vulkan surface
//! - Keyboard state and its mapping to frame loop commands

mod input;
mod window;

pub use input::{InputState, KeyCode};
pub use window::{Surface, Window, refresh_rate_from_millihertz};

// Re-export winit types that users might need
pub use winit::event::{ElementState, KeyEvent, WindowEvent};
pub use winit::event_loop::{ActiveEventLoop, EventLoop};
pub use winit::keyboard::PhysicalKey;
