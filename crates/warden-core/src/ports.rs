//! Port definitions for Hexagonal Architecture
//!
//! These traits define the boundaries between the core domain and external adapters.

pub mod ai;
pub mod hub;

pub use ai::AIProviderPort;
pub use hub::{EntitySnapshot, EntityState, HubError, NotificationPort, StatePort};
