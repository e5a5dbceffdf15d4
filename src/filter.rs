//! Token filtering: narrows a [`Vocabulary`] down to the tokens a [`Fsm`] allows next.
use std::collections::VecDeque;

use fixedbitset_stack::FixedBitSet;

use crate::engine_like::MaskLogitsError;
use crate::fsm::{Fsm, StateID};
use crate::vocabulary::Vocabulary;

/// Filters the tokens of `vocab` that may follow `state` in `fsm`.
///
/// 1. If `state` is terminal, the end-of-sequence token id comes first.
/// 2. Every other token whose text is a valid continuation from `state` follows, in vocabulary order.
///
/// The end-of-sequence token is never validated against the automaton, so it appears at most once.
/// An unknown `state` yields an empty list.
pub fn get_valid_tokens(vocab: &Vocabulary, fsm: &Fsm, state: StateID) -> Vec<u32> {
    let eos_token_id = vocab.eos_token_id();
    let mut valid_tokens = Vec::new();
    if fsm.is_terminal(state) {
        valid_tokens.push(eos_token_id);
    }
    valid_tokens.extend(
        vocab
            .iter()
            .filter(|&(token_id, token)| {
                token_id != eos_token_id && fsm.validate_continuation(state, token)
            })
            .map(|(token_id, _)| token_id),
    );
    log::trace!("State {} allows {} tokens.", state, valid_tokens.len());
    valid_tokens
}

/// Same as [`get_valid_tokens`] but collected into a bitset of [`Vocabulary::vocab_size`] bits.
pub fn allowed_token_ids(vocab: &Vocabulary, fsm: &Fsm, state: StateID) -> FixedBitSet {
    let mut allowed = FixedBitSet::with_capacity(vocab.vocab_size());
    for token_id in get_valid_tokens(vocab, fsm, state) {
        allowed.insert(token_id as usize);
    }
    allowed
}

/// Sets every logit whose token id is not in `allowed` to negative infinity.
///
/// # Errors
///
/// Returns [`MaskLogitsError::InvalidLogitsLength`] when `logits` is not as long as the bitset.
/// The logits are not modified in this case.
pub fn mask_logits(allowed: &FixedBitSet, logits: &mut [f32]) -> Result<(), MaskLogitsError> {
    if logits.len() != allowed.len() {
        return Err(MaskLogitsError::InvalidLogitsLength);
    }
    for (token_id, logit) in logits.iter_mut().enumerate() {
        if !allowed.contains(token_id) {
            *logit = f32::NEG_INFINITY;
        }
    }
    Ok(())
}

/// Finds the states a generation can enter from the start state but never finish from.
///
/// Edges are the tokens of `vocab` other than end-of-sequence, so a state is only reachable
/// if some sequence of tokens leads there, and it can finish only if some sequence of tokens
/// leads on to a terminal state. A generation entering one of the returned states either runs
/// out of valid tokens or never samples end-of-sequence.
pub fn states_without_finishing_path(vocab: &Vocabulary, fsm: &Fsm) -> Vec<StateID> {
    let n = fsm.num_states();
    let eos_token_id = vocab.eos_token_id();
    let mut predecessors: Vec<Vec<StateID>> = vec![Vec::new(); n];
    let mut reachable = FixedBitSet::with_capacity(n);
    let mut queue = VecDeque::new();
    let start = fsm.start_state();
    reachable.insert(start.as_usize());
    queue.push_back(start);
    while let Some(state) = queue.pop_front() {
        for (_, token) in vocab.iter().filter(|&(token_id, _)| token_id != eos_token_id) {
            let Ok(next) = fsm.advance(token, state) else {
                continue;
            };
            predecessors[next.as_usize()].push(state);
            if !reachable.contains(next.as_usize()) {
                reachable.insert(next.as_usize());
                queue.push_back(next);
            }
        }
    }
    let mut finishing = FixedBitSet::with_capacity(n);
    for id in reachable.ones() {
        if fsm.is_terminal(StateID(id as u32)) {
            finishing.insert(id);
            queue.push_back(StateID(id as u32));
        }
    }
    while let Some(state) = queue.pop_front() {
        for &from in &predecessors[state.as_usize()] {
            if !finishing.contains(from.as_usize()) {
                finishing.insert(from.as_usize());
                queue.push_back(from);
            }
        }
    }
    reachable
        .ones()
        .filter(|&id| !finishing.contains(id))
        .map(|id| StateID(id as u32))
        .collect()
}
