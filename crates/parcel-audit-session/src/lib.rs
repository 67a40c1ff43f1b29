//! Session lifecycle for Parcel.
//!
//! [`validate`] applies the validity rules to a session snapshot.
//! [`SessionManager`] owns the lifecycle around it: sign-in, per-request
//! authorization, sign-out, regeneration after a password change, forced
//! logout and cleanup, recording each transition to an audit sink.

mod error;
mod manager;
mod state;
mod store;
mod validate;

pub use error::{SessionError, SessionResult};
pub use manager::{Authorization, SessionManager};
pub use state::{SessionId, SessionState, SessionStats, SessionSummary, SessionUser};
pub use store::{MemorySessionStore, SessionStore};
pub use validate::{validate, InvalidReason, SessionDecision, SessionPolicy};
