//! Escalation and termination policy.

use parley_protocol::StructuredOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Escalate,
    Stop,
}

/// Decides what follows the round that produced `output`.
///
/// A true escalation flag wins over the turn budget. An absent flag counts as
/// false. Reaching `max_turns` is a normal stop, not a failure.
pub fn decide(output: &StructuredOutput, turns_so_far: u32, max_turns: u32) -> Decision {
    if output.escalation_flag() == Some(true) {
        Decision::Escalate
    } else if turns_so_far >= max_turns {
        Decision::Stop
    } else {
        Decision::Continue
    }
}
