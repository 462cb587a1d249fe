//! Core value types shared by the store, the converter and the dispatcher.

pub mod ids;
pub mod state;

pub use ids::{ItemId, Variant, AUDIO_VARIANT};
pub use state::JobState;
