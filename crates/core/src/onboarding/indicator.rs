//! Where the current step is shown and read back from.

use super::step::Step;

/// Externally visible step marker (the `?step=` query parameter in the storefront).
pub trait StepIndicator {
    /// The step the indicator holds, if it holds a valid one.
    fn current(&self) -> Option<Step>;

    /// Whether the indicator holds any value at all, valid or not.
    fn is_present(&self) -> bool {
        self.current().is_some()
    }

    fn set(&mut self, step: Step);
}

/// In-memory indicator holding the raw marker text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryIndicator {
    raw: Option<String>,
    writes: usize,
}

impl MemoryIndicator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw: None,
            writes: 0,
        }
    }

    /// Start from an arbitrary raw marker, e.g. a hand-edited URL.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            writes: 0,
        }
    }

    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Number of times the step was written.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }
}

impl StepIndicator for MemoryIndicator {
    fn current(&self) -> Option<Step> {
        self.raw.as_deref().and_then(Step::parse)
    }

    fn is_present(&self) -> bool {
        self.raw.is_some()
    }

    fn set(&mut self, step: Step) {
        self.raw = Some(step.to_string());
        self.writes += 1;
    }
}
