use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::BuildError;
use crate::options::ParserOptions;
use crate::parser::Parser;
use crate::registry::{DecodeFn, Registry, TypeDescriptor};

/// Write-once configuration for a [`Parser`].
///
/// Registrations accumulate through `map`/`map_with` and are frozen by
/// `build`, which consumes the builder; mutating a built configuration is
/// a compile error, not a runtime state. `O` is the output type every
/// registered target converts into, typically an enum over the variants.
///
/// ```
/// use serde::Deserialize;
/// use serde_json::json;
/// use variant_stream::ParserBuilder;
///
/// #[derive(Debug, Deserialize)]
/// struct Circle { radius: u32 }
/// #[derive(Debug, Deserialize)]
/// struct Line { length: u32 }
///
/// #[derive(Debug)]
/// enum Shape { Circle(Circle), Line(Line) }
/// impl From<Circle> for Shape { fn from(c: Circle) -> Self { Shape::Circle(c) } }
/// impl From<Line> for Shape { fn from(l: Line) -> Self { Shape::Line(l) } }
///
/// # fn main() -> Result<(), variant_stream::BuildError> {
/// let parser = ParserBuilder::<Shape>::new("type")
///     .map::<Circle>("circle")?
///     .map::<Line>("line")?
///     .build()?;
///
/// let input = json!([
///     {"type": "circle", "radius": 5},
///     {"type": "line", "length": 9},
/// ]);
/// let decoded: Vec<Shape> = parser
///     .parse(&input)
///     .filter_map(|outcome| outcome.into_value().ok())
///     .collect();
/// assert_eq!(decoded.len(), 2);
/// # Ok(()) }
/// ```
pub struct ParserBuilder<O> {
    discriminator_key: String,
    options: ParserOptions,
    registry: Registry<O>,
}

impl<O: 'static> ParserBuilder<O> {
    /// Start an empty configuration with default [`ParserOptions`].
    pub fn new(discriminator_key: impl Into<String>) -> Self {
        Self::with_options(discriminator_key, ParserOptions::default())
    }

    /// Start an empty configuration with explicit options.
    ///
    /// Options are taken up front because the case-folding policy shapes
    /// how registrations are stored and checked for duplicates.
    pub fn with_options(discriminator_key: impl Into<String>, options: ParserOptions) -> Self {
        Self {
            discriminator_key: discriminator_key.into(),
            options,
            registry: Registry::new(options.case_insensitive_discriminators),
        }
    }

    /// Register `value` to decode into `T`, converted to `O` via `Into`.
    ///
    /// Fails with [`BuildError::DuplicateDiscriminator`] if `value` is
    /// already registered in this builder, and with
    /// [`BuildError::InvalidDiscriminatorValue`] if it is empty.
    pub fn map<T>(self, value: impl Into<String>) -> Result<Self, BuildError>
    where
        T: DeserializeOwned + Into<O> + 'static,
    {
        self.map_with::<T, _>(value, T::into)
    }

    /// Register `value` to decode into `T` with an explicit conversion.
    ///
    /// Useful when `O` cannot carry an `Into` impl for `T`, or when the
    /// conversion needs context captured in the closure.
    pub fn map_with<T, F>(mut self, value: impl Into<String>, convert: F) -> Result<Self, BuildError>
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> O + Send + Sync + 'static,
    {
        let decode: DecodeFn<O> =
            Arc::new(move |element| T::deserialize(element).map(|typed| convert(typed)));
        self.registry.insert(value.into(), TypeDescriptor::new::<T>(decode))?;
        Ok(self)
    }

    /// Freeze the registrations into an immutable, shareable [`Parser`].
    ///
    /// Fails with [`BuildError::InvalidDiscriminatorKey`] if the key is
    /// empty and [`BuildError::EmptyRegistry`] if nothing was registered.
    pub fn build(self) -> Result<Parser<O>, BuildError> {
        if self.discriminator_key.is_empty() {
            return Err(BuildError::InvalidDiscriminatorKey);
        }
        if self.registry.is_empty() {
            return Err(BuildError::EmptyRegistry);
        }
        info!(
            target: "variant_stream::builder",
            discriminator_key = %self.discriminator_key,
            mappings = self.registry.len(),
            "built parser"
        );
        Ok(Parser::from_parts(
            self.discriminator_key,
            self.options,
            self.registry,
        ))
    }
}

impl<O> fmt::Debug for ParserBuilder<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserBuilder")
            .field("discriminator_key", &self.discriminator_key)
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish()
    }
}
