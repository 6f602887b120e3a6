//! Turn orchestration for two-party agent conversations.
//!
//! A [`TurnOrchestrator`] alternates an initiator and a responder agent over a
//! shared, append-only history, one committed round at a time, and asks the
//! escalation policy after every round whether to continue, stop, or hand the
//! session off.

pub mod error;
pub mod events;
pub mod manager;
pub mod policy;
pub mod roster;
pub mod runtime;
pub mod session;
pub mod state;
pub mod summary;

pub use error::SessionError;
pub use error::SessionFailure;
pub use error::TurnFailure;
pub use manager::SessionManager;
pub use policy::Decision;
pub use policy::decide;
pub use roster::Roster;
pub use runtime::SessionConfig;
pub use runtime::TurnOrchestrator;
pub use runtime::exchange;
pub use session::Session;
pub use session::SessionOutcome;
pub use session::UtteranceSource;
pub use state::Phase;
pub use state::SessionState;
