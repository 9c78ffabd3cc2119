/// What the enumerator does when an element fails to route or decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Yield the failure as an outcome and continue with the next element.
    Report,
    /// Yield the failure as an outcome, then end the sequence.
    Halt,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::Report
    }
}

/// Configuration for a parser, fixed once `build()` runs.
///
/// These options belong to the routing engine itself. How individual fields
/// of a target type are named and read is controlled per type through its
/// `serde` derive attributes, not here.
///
/// # Default
///
/// Failures are reported inline and discriminator values match exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    /// Whether a failing element ends the sequence.
    ///
    /// With `Report` (the default) every element produces an outcome and a
    /// long input survives isolated bad elements. With `Halt` the first
    /// failure is still yielded, so it stays observable, but nothing after
    /// it is decoded.
    ///
    /// # Default
    ///
    /// `FailurePolicy::Report`
    pub failure_policy: FailurePolicy,

    /// Whether discriminator values are matched ASCII case-insensitively.
    ///
    /// When `true`, registered values are folded to lowercase at build time
    /// and element values are folded before lookup, so `"Circle"` and
    /// `"circle"` resolve to the same mapping (and registering both is a
    /// duplicate). The discriminator field *name* is always matched exactly.
    ///
    /// Exact matching is allocation-free; folding allocates one small
    /// string per element.
    ///
    /// # Default
    ///
    /// `false`
    pub case_insensitive_discriminators: bool,
}
