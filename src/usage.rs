//! # Token usage
//!
//! [`Usage`] records the tokens of one backend call. The orchestrator sums
//! the usage of every call made during a turn and returns the total with
//! the turn result.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Token usage for a single backend call, or a sum of several.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Tokens in the request (system prompt, history, tool specs).
    pub input_tokens: usize,

    /// Tokens generated by the backend.
    pub output_tokens: usize,

    /// `input_tokens + output_tokens`
    pub total_tokens: usize,

    /// Number of backend calls represented.
    pub request_count: usize,
}

impl Usage {
    /// Usage of one call.
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            request_count: 1,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl Add for Usage {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
            request_count: self.request_count + other.request_count,
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}
