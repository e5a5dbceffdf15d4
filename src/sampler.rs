//! The sampling loop that drives an [`Engine`] from its start state to end-of-sequence.
use rand::seq::SliceRandom;
use rand::Rng;

use crate::engine::{CreateEngineError, Engine};
use crate::engine_like::{AcceptTokenError, AcceptTokenResult, EngineLike};
use crate::fsm::{build_odd_zeros_fsm, StateID};
use crate::vocabulary::{demo_vocabulary, CreateVocabularyError};

/// Picks the next token among the currently allowed ones.
pub trait TokenSampler {
    /// Picks one of `candidates`, which are listed end-of-sequence first and then in vocabulary order.
    ///
    /// Returning `None` aborts the generation with [`GenerateError::NoValidTokens`].
    fn sample(&mut self, candidates: &[u32]) -> Option<u32>;
}

/// Draws uniformly from the candidates with the given random number generator.
///
/// Seed the generator (e.g. [`rand::rngs::StdRng`]) to replay a generation deterministically.
#[derive(Debug, Clone)]
pub struct UniformSampler<R> {
    rng: R,
}

impl<R: Rng> UniformSampler<R> {
    /// Creates a new [`UniformSampler`].
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> TokenSampler for UniformSampler<R> {
    fn sample(&mut self, candidates: &[u32]) -> Option<u32> {
        candidates.choose(&mut self.rng).copied()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
/// The error type of a generation. A failed generation produces no output.
pub enum GenerateError {
    #[error("{0}")] // inherits the error message from the wrapped CreateVocabularyError
    /// A wrapper for the [`CreateVocabularyError`] error type.
    VocabularyError(#[from] CreateVocabularyError),
    #[error("{0}")] // inherits the error message from the wrapped CreateEngineError
    /// A wrapper for the [`CreateEngineError`] error type.
    EngineError(#[from] CreateEngineError),
    /// No token is allowed in a non-terminal state.
    #[error("No token is allowed in state {0}. The vocabulary cannot continue the automaton from here.")]
    NoValidTokens(StateID),
    /// The step budget of [`Config::max_steps`](crate::config::Config::max_steps) ran out.
    #[error("The generation did not finish within {0} steps.")]
    StepBudgetExceeded(usize),
    /// The sampler picked a token that the engine refused.
    #[error("The sampled token ID {token_id} was refused: {reason}")]
    TokenRejected {
        /// The refused token ID.
        token_id: u32,
        /// Why the engine refused it.
        reason: AcceptTokenError,
    },
}

/// Generates one string by repeatedly filtering, sampling and advancing until end-of-sequence is sampled.
///
/// The engine is reset first. The returned string concatenates the accepted tokens,
/// end-of-sequence excluded, and is always a member of the engine's automaton language.
///
/// # Errors
///
/// Returns a [`GenerateError`] when no token is allowed, the step budget runs out
/// or the sampler picks a token the engine refuses.
pub fn generate<S>(engine: &mut Engine, sampler: &mut S) -> Result<String, GenerateError>
where
    S: TokenSampler + ?Sized,
{
    engine.reset();
    let max_steps = engine.config().max_steps;
    let mut steps = 0usize;
    loop {
        if let Some(max_steps) = max_steps {
            if steps >= max_steps {
                return Err(GenerateError::StepBudgetExceeded(max_steps));
            }
        }
        steps += 1;
        engine.compute_allowed_token_ids();
        let state = engine.current_state();
        let token_id = sampler
            .sample(engine.allowed_token_ids())
            .ok_or(GenerateError::NoValidTokens(state))?;
        match engine.try_accept_new_token(token_id) {
            Ok(AcceptTokenResult::Finished) => break,
            Ok(AcceptTokenResult::Ongoing) => {}
            Err(reason) => return Err(GenerateError::TokenRejected { token_id, reason }),
        }
    }
    log::debug!(
        "Generation finished after {} steps in state {}.",
        steps,
        engine.current_state()
    );
    Ok(engine.generated_text())
}

/// Samples one binary string with an odd number of `'0'` using the given sampler.
///
/// The odd-zeros automaton is paired with [`demo_vocabulary`].
pub fn random_generation_with<S>(sampler: &mut S) -> Result<String, GenerateError>
where
    S: TokenSampler + ?Sized,
{
    let (fsm, _start) = build_odd_zeros_fsm();
    let vocab = demo_vocabulary()?;
    let mut engine = Engine::new(fsm, vocab)?;
    generate(&mut engine, sampler)
}

/// Samples one binary string with an odd number of `'0'`, drawing uniformly with a thread-local generator.
pub fn random_generation() -> Result<String, GenerateError> {
    random_generation_with(&mut UniformSampler::new(rand::thread_rng()))
}
