//! The built parsing engine: discriminator dispatch plus the lazy
//! per-element enumerator.
//!
//! Quick start:
//! - Configure with [`ParserBuilder`](crate::ParserBuilder), then call
//!   [`Parser::parse`] on a JSON array value.
//! - Each iteration step resolves one element's discriminator against the
//!   registry and decodes it; nothing past the consumed prefix is touched.
//! - Feed streaming text input through [`crate::stream`] instead of a
//!   materialized `Value` when the array arrives incrementally.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::options::{FailurePolicy, ParserOptions};
use crate::outcome::{Decoded, FailureKind, ParseFailure, ParseOutcome};
use crate::registry::Registry;

struct ParserInner<O> {
    discriminator_key: String,
    options: ParserOptions,
    registry: Registry<O>,
}

/// The immutable artifact produced by [`ParserBuilder::build`](crate::ParserBuilder::build).
///
/// Holds the frozen registry and options behind an `Arc`: cloning is cheap,
/// and one parser can drive any number of concurrent `parse` calls because
/// nothing in it mutates after build.
pub struct Parser<O> {
    inner: Arc<ParserInner<O>>,
}

impl<O> Clone for Parser<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O> Parser<O> {
    pub(crate) fn from_parts(
        discriminator_key: String,
        options: ParserOptions,
        registry: Registry<O>,
    ) -> Self {
        Self {
            inner: Arc::new(ParserInner {
                discriminator_key,
                options,
                registry,
            }),
        }
    }

    /// The field name used to select each element's target type.
    pub fn discriminator_key(&self) -> &str {
        &self.inner.discriminator_key
    }

    pub fn options(&self) -> &ParserOptions {
        &self.inner.options
    }

    /// Number of registered discriminator values.
    pub fn mapping_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Whether `value` resolves to a registered type, under the parser's
    /// case policy.
    pub fn is_mapped(&self, value: &str) -> bool {
        self.inner.registry.resolve(value).is_some()
    }

    /// Lazily parse a JSON array value, one outcome per element, in source
    /// order.
    ///
    /// Each call produces a fresh single-pass sequence; consuming the first
    /// K outcomes decodes exactly K elements. A non-array input is treated
    /// as a one-element sequence and dispatched by the same rules (so a
    /// bare scalar yields one `MissingDiscriminator` failure).
    pub fn parse<'p>(&'p self, input: &'p Value) -> Outcomes<'p, O> {
        let elements = match input.as_array() {
            Some(items) => items.as_slice(),
            None => std::slice::from_ref(input),
        };
        self.parse_slice(elements)
    }

    /// Lazily parse a slice of already-separated JSON elements.
    pub fn parse_slice<'p>(&'p self, elements: &'p [Value]) -> Outcomes<'p, O> {
        debug!(
            target: "variant_stream::parse",
            elements = elements.len(),
            "starting parse sequence"
        );
        Outcomes {
            parser: self,
            elements: elements.iter().enumerate(),
            halted: false,
        }
    }

    /// Route and decode a single element.
    ///
    /// This is the dispatch step the enumerator runs per element: probe the
    /// discriminator field, resolve the value against the registry, then
    /// hand the full element to the resolved type's decoder. `index` is
    /// carried into the outcome for diagnostics only.
    pub fn parse_element(&self, index: usize, element: &Value) -> ParseOutcome<O> {
        let fail = |kind| ParseOutcome::Failed(ParseFailure { index, kind });

        // A non-object has no discriminator field to read.
        let object = match element.as_object() {
            Some(object) => object,
            None => {
                trace!(target: "variant_stream::dispatch", index, "element is not an object");
                return fail(FailureKind::MissingDiscriminator);
            }
        };
        let tag = match object.get(&self.inner.discriminator_key) {
            None => {
                trace!(target: "variant_stream::dispatch", index, "discriminator field absent");
                return fail(FailureKind::MissingDiscriminator);
            }
            Some(value) => match value.as_str() {
                Some(tag) => tag,
                None => {
                    let found = json_kind(value);
                    trace!(target: "variant_stream::dispatch", index, found, "discriminator is not a string");
                    return fail(FailureKind::InvalidDiscriminatorType { found });
                }
            },
        };
        let descriptor = match self.inner.registry.resolve(tag) {
            Some(descriptor) => descriptor,
            None => {
                trace!(target: "variant_stream::dispatch", index, discriminator = %tag, "unknown discriminator");
                return fail(FailureKind::UnknownDiscriminator {
                    value: tag.to_owned(),
                });
            }
        };
        match (descriptor.decode)(element) {
            Ok(value) => {
                trace!(
                    target: "variant_stream::dispatch",
                    index,
                    discriminator = %tag,
                    type_name = descriptor.type_name,
                    "decoded element"
                );
                ParseOutcome::Decoded(Decoded {
                    index,
                    type_name: descriptor.type_name,
                    type_id: descriptor.type_id,
                    value,
                })
            }
            Err(source) => {
                trace!(
                    target: "variant_stream::dispatch",
                    index,
                    discriminator = %tag,
                    error = %source,
                    "decode rejected element"
                );
                fail(FailureKind::Decode {
                    discriminator: tag.to_owned(),
                    source,
                })
            }
        }
    }
}

impl<O> fmt::Debug for Parser<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("discriminator_key", &self.inner.discriminator_key)
            .field("options", &self.inner.options)
            .field("mappings", &self.inner.registry.len())
            .finish()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Lazy, finite, single-pass sequence of per-element outcomes.
///
/// Produced by [`Parser::parse`]; restart by calling `parse` again. Under
/// [`FailurePolicy::Halt`] the sequence ends after yielding its first
/// failure.
pub struct Outcomes<'p, O> {
    parser: &'p Parser<O>,
    elements: std::iter::Enumerate<std::slice::Iter<'p, Value>>,
    halted: bool,
}

impl<O> Iterator for Outcomes<'_, O> {
    type Item = ParseOutcome<O>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        let (index, element) = self.elements.next()?;
        let outcome = self.parser.parse_element(index, element);
        if outcome.is_failed()
            && self.parser.inner.options.failure_policy == FailurePolicy::Halt
        {
            self.halted = true;
        }
        Some(outcome)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.halted {
            return (0, Some(0));
        }
        let (lower, upper) = self.elements.size_hint();
        match self.parser.inner.options.failure_policy {
            FailurePolicy::Report => (lower, upper),
            // May end early on the first failure.
            FailurePolicy::Halt => (0, upper),
        }
    }
}

impl<O> FusedIterator for Outcomes<'_, O> {}
