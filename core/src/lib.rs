//! Agent abstraction, output validation and conversation history for parley.
//!
//! An [`Agent`] consumes an input envelope and a read-only history snapshot
//! and produces one validated [`StructuredOutput`](parley_protocol::StructuredOutput).
//! The [`ConversationHistory`] it reads from is owned by the turn
//! orchestrator of its session.

pub mod agent;
pub mod backend;
pub mod config;
pub mod contract;
pub mod error;
pub mod history;
pub mod transcript;
pub mod validator;

pub use agent::Agent;
pub use agent::ContractAgent;
pub use backend::ReasoningBackend;
pub use backend::ScriptedBackend;
pub use config::Config;
pub use contract::AgentContract;
pub use contract::AgentRole;
pub use error::AgentInvocationError;
pub use error::ProtocolViolation;
pub use error::ValidationError;
pub use history::ConversationHistory;
pub use history::HistorySnapshot;
pub use transcript::Transcript;
