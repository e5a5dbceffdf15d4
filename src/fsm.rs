//! The finite-state machine module that contains the [`Fsm`] struct and its related types.
use std::collections::VecDeque;
use std::fmt::{Debug, Display};

use ahash::AHashMap;
use fixedbitset_stack::FixedBitSet;
use serde::{Deserialize, Serialize};

use crate::utils;

/// The wrapper struct that represents the state id in a [`Fsm`].
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct StateID(pub u32);

impl StateID {
    /// Get the state id as an index into the state table.
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Display for StateID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The state `EVEN` of the odd-zeros automaton. It is the start state.
pub const EVEN: StateID = StateID(0);
/// The state `ODD` of the odd-zeros automaton. It is the only terminal state.
pub const ODD: StateID = StateID(1);

/// A single state of a [`Fsm`] together with its outgoing transitions.
#[derive(Clone, PartialEq, Eq)]
pub struct State {
    /// Whether the automaton may stop here and accept end-of-sequence.
    pub is_terminal: bool,
    pub(crate) transitions: AHashMap<char, StateID>,
}

impl State {
    /// Gets the destination of `symbol` from this state, if any.
    pub fn transition(&self, symbol: char) -> Option<StateID> {
        self.transitions.get(&symbol).copied()
    }
}

impl Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("is_terminal", &self.is_terminal)
            .field(
                "transitions",
                &utils::get_deterministic_display_form_from_hash_map(
                    &self.transitions,
                    |(symbol, to)| (*symbol, to.0),
                ),
            )
            .finish()
    }
}

/// A serializable description of a [`Fsm`].
///
/// States are identified by their index in `states`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FsmDefinition {
    /// The states of the automaton.
    pub states: Vec<StateDefinition>,
    /// The transition relation.
    pub transitions: Vec<TransitionDefinition>,
    /// The start state.
    pub start: StateID,
}

/// A state entry of a [`FsmDefinition`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StateDefinition {
    /// Whether the state is terminal.
    #[serde(default)]
    pub terminal: bool,
}

/// A transition entry of a [`FsmDefinition`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionDefinition {
    /// The source state.
    pub from: StateID,
    /// The consumed symbol.
    pub symbol: char,
    /// The destination state.
    pub to: StateID,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
/// The error type for [`Fsm`] creation.
pub enum CreateFsmError {
    /// The definition contains no state.
    #[error("The automaton must have at least one state.")]
    EmptyStates,
    /// The start state does not exist.
    #[error("The start state {0} does not exist. The automaton has {1} states.")]
    UnknownStartState(StateID, usize),
    /// A transition refers to a state that does not exist.
    #[error("The transition {from} --{symbol:?}--> {to} refers to a state that does not exist. The automaton has {num_states} states.")]
    UnknownState {
        /// The source state of the transition.
        from: StateID,
        /// The symbol of the transition.
        symbol: char,
        /// The destination state of the transition.
        to: StateID,
        /// The number of states of the automaton.
        num_states: usize,
    },
    /// The same `(state, symbol)` pair is mapped to two different destinations.
    #[error("The state {state} has two transitions for {symbol:?}: to {first} and to {second}.")]
    DuplicateTransition {
        /// The source state.
        state: StateID,
        /// The ambiguous symbol.
        symbol: char,
        /// The destination defined first.
        first: StateID,
        /// The conflicting destination.
        second: StateID,
    },
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
/// The error type for [`Fsm::advance`].
pub enum MoveError {
    /// No transition exists for `symbol` from `state`.
    #[error("No transition is defined for {symbol:?} from state {state}.")]
    UndefinedTransition {
        /// The state the automaton was in.
        state: StateID,
        /// The symbol that could not be consumed.
        symbol: char,
    },
    /// The state does not exist in the automaton.
    #[error("The state {0} does not exist.")]
    UnknownState(StateID),
    /// The token text is empty and cannot be consumed.
    #[error("An empty token cannot be consumed.")]
    EmptyToken,
}

/// An immutable finite-state machine over `char` symbols.
///
/// The machine never stores a "current" state. Every query receives the state explicitly,
/// so one [`Fsm`] can be shared by any number of generations.
#[derive(Clone, PartialEq, Eq)]
pub struct Fsm {
    states: Vec<State>,
    start: StateID,
}

impl Debug for Fsm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fsm")
            .field("start", &self.start.0)
            .field("states", &self.states)
            .finish()
    }
}

impl Fsm {
    /// Creates a new [`Fsm`] from a [`FsmDefinition`].
    ///
    /// # Errors
    ///
    /// Returns a [`CreateFsmError`] when the definition has no state, refers to missing states
    /// or maps one `(state, symbol)` pair to two different destinations.
    /// Repeating an identical transition is allowed.
    pub fn new(definition: FsmDefinition) -> Result<Fsm, CreateFsmError> {
        let num_states = definition.states.len();
        if num_states == 0 {
            return Err(CreateFsmError::EmptyStates);
        }
        if definition.start.as_usize() >= num_states {
            return Err(CreateFsmError::UnknownStartState(definition.start, num_states));
        }
        let mut states: Vec<State> = definition
            .states
            .iter()
            .map(|s| State {
                is_terminal: s.terminal,
                transitions: AHashMap::default(),
            })
            .collect();
        for t in definition.transitions {
            if t.from.as_usize() >= num_states || t.to.as_usize() >= num_states {
                return Err(CreateFsmError::UnknownState {
                    from: t.from,
                    symbol: t.symbol,
                    to: t.to,
                    num_states,
                });
            }
            let transitions = &mut states[t.from.as_usize()].transitions;
            match transitions.get(&t.symbol) {
                Some(&first) if first != t.to => {
                    return Err(CreateFsmError::DuplicateTransition {
                        state: t.from,
                        symbol: t.symbol,
                        first,
                        second: t.to,
                    });
                }
                Some(_) => {}
                None => {
                    transitions.insert(t.symbol, t.to);
                }
            }
        }
        Ok(Self {
            states,
            start: definition.start,
        })
    }

    /// Gets the start state.
    pub fn start_state(&self) -> StateID {
        self.start
    }

    /// Gets the number of states.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Retrieves the record of the given state.
    ///
    /// # Returns
    ///
    /// * `Some(&State)` - The state if it exists.
    /// * `None` - If the state id is out of range.
    pub fn state(&self, state: StateID) -> Option<&State> {
        self.states.get(state.as_usize())
    }

    /// Checks whether the given state is terminal. Unknown states are not terminal.
    pub fn is_terminal(&self, state: StateID) -> bool {
        self.state(state).is_some_and(|s| s.is_terminal)
    }

    /// Gets every symbol used by at least one transition, sorted.
    pub fn alphabet(&self) -> Vec<char> {
        let mut symbols: Vec<char> = self
            .states
            .iter()
            .flat_map(|s| s.transitions.keys().copied())
            .collect();
        symbols.sort_unstable();
        symbols.dedup();
        symbols
    }

    /// Checks whether consuming all characters of `token_text` from `state` only takes defined transitions.
    ///
    /// The result says nothing about whether the reached state is terminal.
    /// Empty texts, unknown states and characters outside the alphabet give `false`.
    pub fn validate_continuation(&self, state: StateID, token_text: &str) -> bool {
        self.advance(token_text, state).is_ok()
    }

    /// Consumes `token_text` from `state` one character at a time and returns the reached state.
    ///
    /// # Errors
    ///
    /// Returns a [`MoveError`] on the first character without a transition.
    /// Callers are expected to validate the continuation with [`Fsm::validate_continuation`] first.
    pub fn advance(&self, token_text: &str, state: StateID) -> Result<StateID, MoveError> {
        if token_text.is_empty() {
            return Err(MoveError::EmptyToken);
        }
        let mut current = self.state(state).ok_or(MoveError::UnknownState(state))?;
        let mut current_id = state;
        for symbol in token_text.chars() {
            current_id = current
                .transition(symbol)
                .ok_or(MoveError::UndefinedTransition {
                    state: current_id,
                    symbol,
                })?;
            // destinations are checked in Fsm::new
            current = &self.states[current_id.as_usize()];
        }
        Ok(current_id)
    }

    /// Checks whether the whole `text` is a member of the language of this automaton.
    pub fn accepts(&self, text: &str) -> bool {
        if text.is_empty() {
            return self.is_terminal(self.start);
        }
        self.advance(text, self.start)
            .is_ok_and(|state| self.is_terminal(state))
    }

    /// Finds the states reachable from the start state from which no terminal state can be reached.
    ///
    /// This looks at single characters only. Whether a generation can actually finish also depends
    /// on the vocabulary, see [`states_without_finishing_path`](crate::filter::states_without_finishing_path).
    pub fn states_without_accepting_path(&self) -> Vec<StateID> {
        let n = self.states.len();
        let mut reachable = FixedBitSet::with_capacity(n);
        let mut queue = VecDeque::new();
        reachable.insert(self.start.as_usize());
        queue.push_back(self.start);
        while let Some(state) = queue.pop_front() {
            for &to in self.states[state.as_usize()].transitions.values() {
                if !reachable.contains(to.as_usize()) {
                    reachable.insert(to.as_usize());
                    queue.push_back(to);
                }
            }
        }
        let mut predecessors: Vec<Vec<StateID>> = vec![Vec::new(); n];
        for (from, state) in self.states.iter().enumerate() {
            for &to in state.transitions.values() {
                predecessors[to.as_usize()].push(StateID(from as u32));
            }
        }
        let mut accepting = FixedBitSet::with_capacity(n);
        for (id, state) in self.states.iter().enumerate() {
            if state.is_terminal {
                accepting.insert(id);
                queue.push_back(StateID(id as u32));
            }
        }
        while let Some(state) = queue.pop_front() {
            for &from in &predecessors[state.as_usize()] {
                if !accepting.contains(from.as_usize()) {
                    accepting.insert(from.as_usize());
                    queue.push_back(from);
                }
            }
        }
        reachable
            .ones()
            .filter(|&id| !accepting.contains(id))
            .map(|id| StateID(id as u32))
            .collect()
    }
}

/// Builds the automaton that accepts binary strings with an odd number of `'0'`.
///
/// # Returns
///
/// * `(Fsm, StateID)` - The automaton and its start state [`EVEN`].
pub fn build_odd_zeros_fsm() -> (Fsm, StateID) {
    let even = State {
        is_terminal: false,
        transitions: AHashMap::from_iter([('0', ODD), ('1', EVEN)]),
    };
    let odd = State {
        is_terminal: true,
        transitions: AHashMap::from_iter([('0', EVEN), ('1', ODD)]),
    };
    let fsm = Fsm {
        states: vec![even, odd],
        start: EVEN,
    };
    (fsm, EVEN)
}
