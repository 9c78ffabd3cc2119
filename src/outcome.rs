use std::any::TypeId;

use thiserror::Error;

/// A successfully decoded element, tagged with the registered type that
/// produced it and the element's position in the source array.
#[derive(Debug)]
pub struct Decoded<O> {
    /// Position of the source element, starting at 0.
    pub index: usize,
    /// `std::any::type_name` of the registered target type.
    pub type_name: &'static str,
    /// Identity of the registered target type.
    pub type_id: TypeId,
    /// The decoded value.
    pub value: O,
}

/// Why one element failed to route or decode.
///
/// Routing failures (`MissingDiscriminator`, `InvalidDiscriminatorType`,
/// `UnknownDiscriminator`) mean the element never reached a target type;
/// `Decode` means the type was resolved but its fields did not fit.
/// Callers use the distinction to pick a skip/halt/repair policy.
#[derive(Debug, Error)]
pub enum FailureKind {
    /// The element has no discriminator field, or is not a JSON object at all.
    #[error("missing discriminator field")]
    MissingDiscriminator,
    /// The discriminator field is present but not a JSON string.
    #[error("discriminator is a JSON {found}, expected a string")]
    InvalidDiscriminatorType { found: &'static str },
    /// The discriminator value has no registered mapping.
    #[error("unknown discriminator {value:?}")]
    UnknownDiscriminator { value: String },
    /// The target type was resolved but rejected the element.
    #[error("decoding {discriminator:?} failed: {source}")]
    Decode {
        discriminator: String,
        #[source]
        source: serde_json::Error,
    },
    /// Streaming text input only: the element span is not valid JSON, or the
    /// input ended before the array was closed.
    #[error("malformed element: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },
}

/// A failed element: where it was and what went wrong.
#[derive(Debug, Error)]
#[error("element {index}: {kind}")]
pub struct ParseFailure {
    /// Position of the source element, starting at 0.
    pub index: usize,
    #[source]
    pub kind: FailureKind,
}

/// Per-element result: a decoded value or a failure descriptor.
///
/// Failures are data, not raised faults, so a long input survives isolated
/// bad elements; see [`FailurePolicy`](crate::FailurePolicy) for the
/// fail-fast alternative.
#[derive(Debug)]
pub enum ParseOutcome<O> {
    Decoded(Decoded<O>),
    Failed(ParseFailure),
}

impl<O> ParseOutcome<O> {
    pub fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Position of the source element this outcome came from.
    pub fn index(&self) -> usize {
        match self {
            Self::Decoded(decoded) => decoded.index,
            Self::Failed(failure) => failure.index,
        }
    }

    pub fn decoded(&self) -> Option<&Decoded<O>> {
        match self {
            Self::Decoded(decoded) => Some(decoded),
            Self::Failed(_) => None,
        }
    }

    pub fn value(&self) -> Option<&O> {
        self.decoded().map(|decoded| &decoded.value)
    }

    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            Self::Decoded(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// Convert into a plain `Result`, dropping the type tag.
    pub fn into_value(self) -> Result<O, ParseFailure> {
        match self {
            Self::Decoded(decoded) => Ok(decoded.value),
            Self::Failed(failure) => Err(failure),
        }
    }
}
