//! Preview session.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SessionInfo`] | Identity sent with every message |
//! | [`SessionState`] | Lifecycle state |
//! | [`SessionController`] | Initialization, fallback and update routing |

// ============================================================================
// Submodules
// ============================================================================

/// Session controller.
pub mod controller;

/// Session identity and state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use controller::{Initialization, SessionController};
pub use state::{Session, SessionInfo, SessionState};
