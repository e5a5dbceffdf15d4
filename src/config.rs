//! The configuration module of the engine.
use serde::{Deserialize, Serialize};

/// The configuration of the [`Engine`](crate::engine::Engine) struct. This should suffice most scenarios.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct Config {
    /// The maximum number of sampling steps of one generation, end-of-sequence included.
    /// `None` means generation runs until end-of-sequence is sampled.
    /// The default is `None`.
    pub max_steps: Option<usize>,
    /// Whether to reject automata with states that are reachable from the start state
    /// but can never reach a terminal state. A generation entering such a state
    /// can never finish legally.
    /// The default is `true`.
    pub check_terminal_reachability: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_steps: None,
            check_terminal_reachability: true,
        }
    }
}
