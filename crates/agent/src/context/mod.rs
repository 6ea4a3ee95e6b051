//! Context injected into the reasoning engine's input.
//!
//! The only injected context is the bounded rendering of a conversation's
//! durable plan state; see [`formatter`].

pub mod formatter;

pub use formatter::{
    MAX_CONTEXT_CHARS, StateContextFormatter, TRUNCATION_MARKER, format_state_context,
};
