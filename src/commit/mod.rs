//! Text commit: stabilized labels → text edits.

pub mod debounce;
pub mod machine;
pub mod text;
pub mod token;

pub use debounce::CommandDebouncer;
pub use machine::{CommitMachine, PredictionSnapshot, SkipReason, TickOutcome};
pub use text::TextBuffer;
pub use token::{Command, Token, BLANK_LABEL};
