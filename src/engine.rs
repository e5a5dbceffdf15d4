//! The main module that contains the [`Engine`] struct and its related types.
use std::fmt::Debug;
use std::sync::Arc;

use fixedbitset_stack::FixedBitSet;

use crate::{
    config::Config,
    engine_like::{
        AcceptTokenError, AcceptTokenResult, EngineLike, MaskLogitsError, UpdateLogitsError,
    },
    filter,
    fsm::{Fsm, StateID},
    utils,
    vocabulary::Vocabulary,
};

/// The engine that constrains decoding with a [`Fsm`] over a [`Vocabulary`].
///
/// The automaton and the vocabulary are shared and immutable.
/// The engine owns the generation trace: the current state and the accepted token IDs.
#[derive(Clone)]
pub struct Engine {
    fsm: Arc<Fsm>,
    vocabulary: Arc<Vocabulary>,
    config: Config,
    state: StateID,
    finished: bool,
    generated: Vec<u32>,
    allowed_token_ids: Vec<u32>,
    allowed_token_id_set: FixedBitSet,
}

impl Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state.0)
            .field("is_terminal", &self.fsm.is_terminal(self.state))
            .field("finished", &self.finished)
            .field("generated", &self.generated)
            .field("allowed_token_ids", &self.allowed_token_ids)
            .field(
                "allowed_token_id_set",
                &utils::get_display_form_from_bitset(&self.allowed_token_id_set),
            )
            .finish()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
/// Represents the error type for the [`Engine`] creation.
pub enum CreateEngineError {
    #[error(
        "The states {0:?} are reachable from the start state but no sequence of tokens leads from them to a terminal state. \
        A generation entering them would never finish."
    )]
    /// Some states reachable through the vocabulary have no token path to a terminal state.
    NoAcceptingPath(Vec<StateID>),
}

impl Engine {
    /// Create a new [`Engine`] from a [`Fsm`] and a [`Vocabulary`] with the default [`Config`].
    ///
    /// # Errors
    ///
    /// Returns a [`CreateEngineError`] when the vocabulary can lead the automaton into a state
    /// from which no sequence of tokens reaches a terminal state.
    pub fn new(fsm: Fsm, vocabulary: Vocabulary) -> Result<Engine, CreateEngineError> {
        Self::with_config(Arc::new(fsm), Arc::new(vocabulary), Config::default())
    }

    /// Create a new [`Engine`] from a shared [`Fsm`], a shared [`Vocabulary`] and a [`Config`].
    ///
    /// # Errors
    ///
    /// Returns a [`CreateEngineError`] when [`Config::check_terminal_reachability`] is enabled
    /// and the vocabulary can lead the automaton into a state from which no sequence of tokens
    /// reaches a terminal state. See [`filter::states_without_finishing_path`].
    pub fn with_config(
        fsm: Arc<Fsm>,
        vocabulary: Arc<Vocabulary>,
        config: Config,
    ) -> Result<Engine, CreateEngineError> {
        let dead_ends = filter::states_without_finishing_path(&vocabulary, &fsm);
        if !dead_ends.is_empty() {
            if config.check_terminal_reachability {
                return Err(CreateEngineError::NoAcceptingPath(dead_ends));
            }
            log::warn!(
                "The states {:?} cannot reach any terminal state with this vocabulary. \
                Generation may never finish; consider setting `max_steps`.",
                dead_ends
            );
        }
        let allowed_token_id_set = FixedBitSet::with_capacity(vocabulary.vocab_size());
        Ok(Self {
            state: fsm.start_state(),
            fsm,
            vocabulary,
            config,
            finished: false,
            generated: Vec::new(),
            allowed_token_ids: Vec::new(),
            allowed_token_id_set,
        })
    }

    /// Gets the config of the engine.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Concatenates the texts of the accepted tokens.
    pub fn generated_text(&self) -> String {
        self.generated
            .iter()
            .filter_map(|&token_id| self.vocabulary.token_string(token_id))
            .collect()
    }
}

impl crate::engine_like::sealed::Sealed for Engine {}

impl EngineLike for Engine {
    fn try_accept_new_token(
        &mut self,
        token_id: u32,
    ) -> Result<AcceptTokenResult, AcceptTokenError> {
        if self.finished {
            return Err(AcceptTokenError::Finished);
        }
        let token = self
            .vocabulary
            .token_string(token_id)
            .ok_or(AcceptTokenError::UnknownTokenID)?;
        if token_id == self.vocabulary.eos_token_id() {
            if !self.fsm.is_terminal(self.state) {
                return Err(AcceptTokenError::Rejected);
            }
            log::debug!("End-of-sequence accepted in state {}.", self.state);
            self.finished = true;
            return Ok(AcceptTokenResult::Finished);
        }
        let next = self.fsm.advance(token, self.state).map_err(|e| {
            log::debug!("Token ID {} rejected: {}", token_id, e);
            AcceptTokenError::Rejected
        })?;
        log::trace!(
            "Token ID {} ({:?}) moves state {} to {}.",
            token_id,
            token,
            self.state,
            next
        );
        self.state = next;
        self.generated.push(token_id);
        Ok(AcceptTokenResult::Ongoing)
    }

    fn compute_allowed_token_ids(&mut self) {
        self.allowed_token_id_set.clear();
        self.allowed_token_ids.clear();
        if self.finished {
            return;
        }
        self.allowed_token_ids
            .extend(filter::get_valid_tokens(&self.vocabulary, &self.fsm, self.state));
        for &token_id in &self.allowed_token_ids {
            self.allowed_token_id_set.insert(token_id as usize);
        }
    }

    fn allowed_token_ids(&self) -> &[u32] {
        &self.allowed_token_ids
    }

    fn allowed_token_ids_from_last_computation(&self) -> &FixedBitSet {
        &self.allowed_token_id_set
    }

    fn mask_logits(&self, logits: &mut [f32]) -> Result<(), MaskLogitsError> {
        filter::mask_logits(&self.allowed_token_id_set, logits)
    }

    fn update_logits(
        &mut self,
        token_id: u32,
        logits: &mut [f32],
    ) -> Result<AcceptTokenResult, UpdateLogitsError> {
        if logits.len() != self.vocabulary.vocab_size() {
            return Err(UpdateLogitsError::InvalidLogitsLength);
        }
        let result = self.try_accept_new_token(token_id)?;
        if AcceptTokenResult::Finished == result {
            return Ok(AcceptTokenResult::Finished);
        }
        self.compute_allowed_token_ids();
        self.mask_logits(logits)?;
        Ok(result)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn current_state(&self) -> StateID {
        self.state
    }

    fn generated_token_ids(&self) -> &[u32] {
        &self.generated
    }

    fn reset(&mut self) {
        self.state = self.fsm.start_state();
        self.finished = false;
        self.generated.clear();
        self.allowed_token_ids.clear();
        self.allowed_token_id_set.clear();
    }

    fn vocab(&self) -> Arc<Vocabulary> {
        self.vocabulary.clone()
    }

    fn fsm(&self) -> Arc<Fsm> {
        self.fsm.clone()
    }
}
