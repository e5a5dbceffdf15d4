//! This module contains the [`EngineLike`] trait, which defines the behavior of an engine-like object.

use std::sync::Arc;

use displaydoc::Display;
use fixedbitset_stack::FixedBitSet;

use crate::fsm::{Fsm, StateID};
use crate::vocabulary::Vocabulary;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
/// Represents the error when an [`EngineLike`] tries to accept a token.
pub enum AcceptTokenError {
    /// The input token id does not exist in the vocabulary of the [`EngineLike`].
    UnknownTokenID,
    /// The input token id is rejected and the [`EngineLike`]'s internal states are not updated.
    Rejected,
    /// The [`EngineLike`] is finished, as defined by its automaton. No more tokens can be accepted.
    Finished,
}
impl std::error::Error for AcceptTokenError {}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
/// Represents the result after [`EngineLike`] successfully accepts a token.
pub enum AcceptTokenResult {
    /// The token is accepted and the [`EngineLike`] can accept more tokens.
    Ongoing,
    /// The end-of-sequence token is accepted and no more tokens can be accepted.
    Finished,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
/// Represents the error when an [`EngineLike`] tries to mask logits.
pub enum MaskLogitsError {
    /// The input logits array is not equal to the vocabulary size.
    InvalidLogitsLength,
}
impl std::error::Error for MaskLogitsError {}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
/// Represents the error when an [`EngineLike`] tries to update logits.
pub enum UpdateLogitsError {
    /// The input token id does not exist in the vocabulary of the [`EngineLike`].
    UnknownTokenID,
    /// The input token id is rejected and the [`EngineLike`]'s internal states are not updated.
    Rejected,
    /// The [`EngineLike`] is finished, as defined by its automaton. No more tokens can be accepted.
    Finished,
    /// The input logits array is not of the expected length according to the vocabulary.
    InvalidLogitsLength,
}
impl std::error::Error for UpdateLogitsError {}

impl From<AcceptTokenError> for UpdateLogitsError {
    fn from(value: AcceptTokenError) -> Self {
        match value {
            AcceptTokenError::UnknownTokenID => UpdateLogitsError::UnknownTokenID,
            AcceptTokenError::Rejected => UpdateLogitsError::Rejected,
            AcceptTokenError::Finished => UpdateLogitsError::Finished,
        }
    }
}

impl From<MaskLogitsError> for UpdateLogitsError {
    fn from(value: MaskLogitsError) -> Self {
        match value {
            MaskLogitsError::InvalidLogitsLength => UpdateLogitsError::InvalidLogitsLength,
        }
    }
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// A trait that defines the behavior of an [`EngineLike`] object.
pub trait EngineLike: sealed::Sealed {
    /// Tries to accept a new token with the given token ID.
    ///
    /// The end-of-sequence token is accepted only in a terminal state and finishes the engine.
    ///
    /// # Errors
    ///
    /// Returns an [`AcceptTokenError`] when a token is not accepted. Check the error type docs for more details.
    /// The [`EngineLike`] internal states are not updated in this case.
    fn try_accept_new_token(
        &mut self,
        token_id: u32,
    ) -> Result<AcceptTokenResult, AcceptTokenError>;

    /// Computes the allowed token IDs based on current states.
    fn compute_allowed_token_ids(&mut self);

    /// Gets the allowed token IDs from the last computation, end-of-sequence first and then in vocabulary order.
    fn allowed_token_ids(&self) -> &[u32];

    /// Gets the allowed token IDs from the last computation as a bitset.
    ///
    /// Last computation is the last [`EngineLike::compute_allowed_token_ids`] or [`EngineLike::update_logits`] called.
    /// In other words, [`EngineLike::try_accept_new_token`] DOES NOT compute the allowed token IDs and hence DOES NOT affect its result!
    fn allowed_token_ids_from_last_computation(&self) -> &FixedBitSet;

    /// Masks the logits based on last computed token IDs.
    ///
    /// # Errors
    ///
    /// Returns a [`MaskLogitsError`] when the input logits array is not of the expected length according to the vocabulary.
    /// The logits array is not updated in this case.
    fn mask_logits(&self, logits: &mut [f32]) -> Result<(), MaskLogitsError>;

    /// Try to accept the token ID and if succeeds, update the given logits array.
    ///
    /// # Errors
    ///
    /// Returns an [`UpdateLogitsError`] when the logits is not updated. Check the error type docs for more details.
    fn update_logits(
        &mut self,
        token_id: u32,
        logits: &mut [f32],
    ) -> Result<AcceptTokenResult, UpdateLogitsError>;

    /// Checks if the engine is finished.
    fn is_finished(&self) -> bool;
    /// Gets the current automaton state.
    fn current_state(&self) -> StateID;
    /// Gets the token IDs accepted since the last reset, end-of-sequence excluded.
    fn generated_token_ids(&self) -> &[u32];
    /// Resets the engine to the start state of its automaton.
    fn reset(&mut self);
    /// Gets the vocabulary of the engine.
    fn vocab(&self) -> Arc<Vocabulary>;
    /// Gets the automaton of the engine.
    fn fsm(&self) -> Arc<Fsm>;
}
