//! Warden Adapters - Infrastructure implementations
//!
//! This crate contains concrete implementations of the ports defined in
//! warden-core: the Home Assistant REST client and the Gemini client.

pub mod ai;
pub mod hass_rest;

// Re-export primary adapter types
pub use ai::GeminiAdapter;
pub use hass_rest::HassRestAdapter;
