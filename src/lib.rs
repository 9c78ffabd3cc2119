pub mod builder;
pub mod error;
pub mod options;
pub mod outcome;
pub mod parser;
mod registry;
pub mod stream;

// Convenient re-exports
pub use builder::ParserBuilder;
pub use error::BuildError;
pub use options::{FailurePolicy, ParserOptions};
pub use outcome::{Decoded, FailureKind, ParseFailure, ParseOutcome};
pub use parser::{Outcomes, Parser};
