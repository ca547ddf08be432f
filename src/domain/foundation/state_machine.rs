//! State machine trait for lifecycle status enums.

use super::ValidationError;

/// Trait for status enums whose values form a state machine.
///
/// Implementors list the legal edges; `transition_to` and `is_terminal` come
/// for free.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if moving from self to target is a legal edge.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all legal targets from the current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs the transition, rejecting illegal edges.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no outgoing edges).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
