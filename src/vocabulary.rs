//! This module contains the `Vocabulary` struct, which represents a language model's vocabulary.
use ahash::AHashMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;

const MAX_VOCABULARY_SIZE: usize = 0x1000000;

/// The text of the end-of-sequence token in [`demo_vocabulary`].
pub const DEMO_EOS_TOKEN: &str = "[EOS]";
/// The end-of-sequence token id of [`demo_vocabulary`].
pub const DEMO_EOS_TOKEN_ID: u32 = 0;

/// The struct represents a language model's vocabulary.
///
/// Token ids are unique. Iteration follows insertion order, so every computation
/// that walks the vocabulary is reproducible.
#[derive(Clone)]
pub struct Vocabulary {
    pub(crate) id_to_token_string: Vec<(u32, String)>,
    pub(crate) id_to_index: AHashMap<u32, usize>,
    pub(crate) token_string_to_id: AHashMap<String, u32>,
    pub(crate) eos_token_id: u32,
}

impl Debug for Vocabulary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vocabulary")
            .field("id_to_token_string", &self.id_to_token_string)
            .field("eos_token_id", &self.eos_token_id)
            .finish()
    }
}
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
/// The error type for [Vocabulary] creation.
pub enum CreateVocabularyError {
    /// The vocabulary contains no token.
    #[error("The vocabulary is empty.")]
    EmptyVocabulary,
    /// The same token id appears more than once.
    #[error("The token ID {0} appears more than once.")]
    DuplicateTokenID(u32),
    /// The end-of-sequence token id is not part of the vocabulary.
    #[error("The end-of-sequence token ID {0} does not exist in the vocabulary.")]
    MissingEosToken(u32),
    /// The vocabulary size exceeds the maximum supported size.
    #[error("The vocabulary size is {0}, while the maximum supported is {1}.")]
    VocabularyTooLarge(usize, usize),
    /// A token id is too large. Bitsets and logits are indexed by token id, so ids must stay below the maximum size.
    #[error("The token ID {0} is too large, while the maximum supported is {1}.")]
    TokenIDTooLarge(u32, usize),
}

impl Vocabulary {
    /// Creates a new instance of [Vocabulary].
    ///
    /// # Arguments
    ///
    /// * `id_to_token_string` - The `(token id, token text)` pairs, in the order they should be iterated.
    /// * `eos_token_id` - The id of the end-of-sequence token. It must be one of the ids above.
    ///
    /// # Errors
    ///
    /// Returns a [CreateVocabularyError] when the vocabulary is empty, too large,
    /// contains a token id twice or one at least as large as the maximum size,
    /// or lacks the end-of-sequence token.
    pub fn new(
        id_to_token_string: impl IntoIterator<Item = (u32, String)>,
        eos_token_id: u32,
    ) -> Result<Vocabulary, CreateVocabularyError> {
        let id_to_token_string: Vec<(u32, String)> = id_to_token_string.into_iter().collect();
        if id_to_token_string.is_empty() {
            return Err(CreateVocabularyError::EmptyVocabulary);
        }
        if id_to_token_string.len() >= MAX_VOCABULARY_SIZE {
            return Err(CreateVocabularyError::VocabularyTooLarge(
                id_to_token_string.len(),
                MAX_VOCABULARY_SIZE,
            ));
        }
        let mut id_to_index = AHashMap::with_capacity(id_to_token_string.len());
        let mut token_string_to_id = AHashMap::with_capacity(id_to_token_string.len());
        for (index, (token_id, token)) in id_to_token_string.iter().enumerate() {
            if *token_id as usize >= MAX_VOCABULARY_SIZE {
                return Err(CreateVocabularyError::TokenIDTooLarge(
                    *token_id,
                    MAX_VOCABULARY_SIZE,
                ));
            }
            if id_to_index.insert(*token_id, index).is_some() {
                return Err(CreateVocabularyError::DuplicateTokenID(*token_id));
            }
            if token.is_empty() {
                log::warn!(
                    "Token ID {} corresponds to an empty token. \
                    The token will never be allowed by any automaton.",
                    token_id
                );
                continue;
            }
            match token_string_to_id.entry(token.clone()) {
                Entry::Occupied(entry) => {
                    log::warn!(
                        "Token ID {} and token ID {} corresponds to the same token {:?}. \
                        The second token ID will be ignored when matching tokens to ids. \
                        Both IDs are still allowed whenever the token is.",
                        entry.get(),
                        token_id,
                        token
                    );
                }
                Entry::Vacant(entry) => {
                    entry.insert(*token_id);
                }
            }
        }
        if !id_to_index.contains_key(&eos_token_id) {
            return Err(CreateVocabularyError::MissingEosToken(eos_token_id));
        }
        Ok(Self {
            id_to_token_string,
            id_to_index,
            token_string_to_id,
            eos_token_id,
        })
    }

    /// Retrieves the token string associated with the given token ID.
    ///
    /// # Arguments
    ///
    /// * `token_id` - The ID of the token to retrieve the string for.
    ///
    /// # Returns
    ///
    /// * `Some(&str)` - The token string if it exists.
    /// * `None` - If the token ID does not exist.
    pub fn token_string(&self, token_id: u32) -> Option<&str> {
        self.id_to_index
            .get(&token_id)
            .map(|&index| self.id_to_token_string[index].1.as_str())
    }

    /// Retrieves the token ID associated with the given token string.
    ///
    /// # Returns
    ///
    /// * `Some(u32)` - The first token ID with this text.
    /// * `None` - If the token does not exist in the vocabulary.
    pub fn token_id(&self, token: &str) -> Option<u32> {
        self.token_string_to_id.get(token).copied()
    }

    /// Gets the end-of-sequence token id.
    pub fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    /// Iterates over `(token id, token text)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.id_to_token_string
            .iter()
            .map(|(id, token)| (*id, token.as_str()))
    }

    /// Gets the number of tokens.
    pub fn len(&self) -> usize {
        self.id_to_token_string.len()
    }

    /// Checks whether the vocabulary has no token. Always `false` for a constructed vocabulary.
    pub fn is_empty(&self) -> bool {
        self.id_to_token_string.is_empty()
    }

    /// Retrieves the size of the vocabulary, i.e. the largest token id plus one.
    ///
    /// This is the length of a logits array produced by a model using this vocabulary.
    pub fn vocab_size(&self) -> usize {
        self.id_to_token_string
            .iter()
            .map(|(id, _)| *id)
            .max()
            .map(|x| x as usize + 1)
            .unwrap_or(0)
    }
}

/// Builds the fixed vocabulary `{0: "[EOS]", 1: "0", 2: "1"}` with end-of-sequence id `0`.
pub fn demo_vocabulary() -> Result<Vocabulary, CreateVocabularyError> {
    Vocabulary::new(
        [
            (DEMO_EOS_TOKEN_ID, DEMO_EOS_TOKEN.to_string()),
            (1, "0".to_string()),
            (2, "1".to_string()),
        ],
        DEMO_EOS_TOKEN_ID,
    )
}
