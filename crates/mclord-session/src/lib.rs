//! Session bookkeeping for McLord.
//!
//! This crate holds the small pieces of per-connection state that both the
//! room layer and the server need to agree on:
//!
//! 1. **Admission**: the shared online-player counter and the soft/hard
//!    limit classification ([`Admission`], [`AdmissionDecision`])
//! 2. **Roles**: which side of a room a session plays ([`Role`])
//! 3. **Phases**: where a session is in its lifecycle ([`SessionPhase`]),
//!    used for logging
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← admits connections, tracks each session's phase
//!     ↕
//! Session Layer (this crate)  ← counters, roles, phases
//!     ↕
//! Room Layer (beside)  ← uses Role to address host/opponent
//! ```

mod admission;
mod session;

pub use admission::{Admission, AdmissionDecision, AdmissionLimits, OnlinePermit};
pub use session::{Role, SessionPhase};
