//! Data types exchanged between parley agents, the turn orchestrator and
//! session drivers.

pub mod events;
pub mod message;
pub mod outputs;

pub use message::InputEnvelope;
pub use message::Message;
pub use outputs::OutputShapeKind;
pub use outputs::StructuredOutput;
