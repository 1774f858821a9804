//! Input state
//!
//! The window forwards glfw key events into a [`KeyboardState`], which is
//! then read by components during the update pass.

pub mod keyboard;

pub use glfw::{Action, Key};
pub use keyboard::{KeyCode, KeyEventQueue, KeyboardState, NUMBER_OF_KEYS};
