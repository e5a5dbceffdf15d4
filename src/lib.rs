/*!
# guided-fsm

This crate provides a constrained decoding engine
which ensures that a language model's output is a member of the language of a finite-state machine.
At each decoding step, the vocabulary is intersected with the continuations the automaton accepts
from its current state, so the sampled output can never leave the language.
Here is a quick example of how this crate works:

```rust
use guided_fsm::{build_odd_zeros_fsm, Engine, EngineLike, Vocabulary, EVEN, ODD};
let (fsm, start) = build_odd_zeros_fsm();
assert_eq!(start, EVEN);
let vocab = Vocabulary::new(
    [
        (0, "[EOS]".to_string()),
        (1, "0".to_string()),
        (2, "1".to_string()),
    ],
    0,
)
.unwrap();
let mut engine = Engine::new(fsm, vocab).unwrap();
engine.compute_allowed_token_ids();
assert_eq!(engine.allowed_token_ids(), &[1, 2]); // EVEN is not terminal
let mut logits = [0.5, 0.2, 0.3]; // logits obtained from the language model
engine.update_logits(1, &mut logits).unwrap(); // accept "0"
assert_eq!(engine.current_state(), ODD);
assert_eq!(engine.allowed_token_ids(), &[0, 1, 2]); // ODD is terminal, EOS comes first
assert_eq!(
    engine.try_accept_new_token(0).unwrap(),
    guided_fsm::AcceptTokenResult::Finished
);
assert_eq!(engine.generated_text(), "0");
```

# Overview

The primary types in this crate are [Fsm], [Vocabulary] and [Engine].
- [Fsm] is an immutable automaton. [build_odd_zeros_fsm] builds the automaton of binary strings with an odd number of `0`s,
    and [Fsm::new] builds any automaton from a serializable [FsmDefinition].
- [get_valid_tokens] filters a [Vocabulary] down to the tokens allowed from a given state.
- [Engine] tracks one generation: the current state and the accepted tokens. It masks logits for a real model
    through [EngineLike::update_logits].
- [generate] drives an [Engine] with a [TokenSampler] until end-of-sequence. [UniformSampler] draws uniformly with an injected
    random number generator.

# Examples

## Sample deterministically

```rust
use guided_fsm::{random_generation_with, UniformSampler};
use rand::SeedableRng;
let mut sampler = UniformSampler::new(rand::rngs::StdRng::seed_from_u64(42));
let output = random_generation_with(&mut sampler).unwrap();
assert!(output.chars().all(|c| c == '0' || c == '1'));
assert_eq!(output.matches('0').count() % 2, 1);
```

## Load an automaton from JSON

```rust
use guided_fsm::{Fsm, FsmDefinition, StateID};
let definition: FsmDefinition = serde_json::from_str(
    r#"{
        "states": [{}, {"terminal": true}],
        "transitions": [
            {"from": 0, "symbol": "a", "to": 1},
            {"from": 1, "symbol": "b", "to": 1}
        ],
        "start": 0
    }"#,
)
.unwrap();
let fsm = Fsm::new(definition).unwrap();
assert!(fsm.validate_continuation(StateID(0), "abb"));
assert!(!fsm.validate_continuation(StateID(0), "b"));
assert!(fsm.accepts("ab"));
```

# Termination

A generation stops only when end-of-sequence is sampled, which only happens in a terminal state.
If the vocabulary can lead the automaton into a state from which no sequence of tokens reaches
a terminal state, a generation could run forever or run out of valid tokens.
[Engine::new] walks the automaton token by token and rejects such pairs unless
[Config::check_terminal_reachability] is disabled. Characters that no token contains never count,
so a dead end behind them is harmless.
[Config::max_steps] bounds the number of sampling steps.
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod config;
pub mod engine;
pub mod engine_like;
pub mod filter;
pub mod fsm;
pub mod sampler;
mod utils;
pub mod vocabulary;
pub use config::Config;
pub use engine::Engine;
pub use engine_like::AcceptTokenResult;
pub use engine_like::EngineLike;
pub use filter::get_valid_tokens;
pub use fsm::{build_odd_zeros_fsm, Fsm, FsmDefinition, StateID, EVEN, ODD};
#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;
pub use sampler::{
    generate, random_generation, random_generation_with, GenerateError, TokenSampler,
    UniformSampler,
};
pub use vocabulary::{demo_vocabulary, Vocabulary};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
