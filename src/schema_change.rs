//! Schema Change Detector.
//!
//! Remembers the ordered column names of the last evaluated query result. Axis
//! selections are bound to column identity as presented, so a pure reordering
//! counts as a change too.

use polars::prelude::DataFrame;
use tracing::debug;

/// Ordered tuple of a result's column names.
pub type SchemaSignature = Vec<String>;

/// Single-slot, session-scoped memory of the last observed signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaChangeDetector {
    last: Option<SchemaSignature>,
}

impl SchemaChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the signature of `result` and reports whether it differs from the
    /// previous one.
    ///
    /// * The first observation after (re)initialization always reports `true`.
    /// * `None` (no result to look at) reports `false` and leaves the slot untouched.
    pub fn observe(&mut self, result: Option<&DataFrame>) -> bool {
        let Some(df) = result else {
            return false;
        };

        let signature = signature_of(df);
        let changed = self.last.as_ref() != Some(&signature);

        if changed {
            debug!("Schema signature changed: {:?} -> {signature:?}", self.last);
        }

        self.last = Some(signature);
        changed
    }

    /// The last observed signature, if any.
    pub fn signature(&self) -> Option<&[String]> {
        self.last.as_deref()
    }

    /// Forgets the stored signature (fresh session).
    pub fn reset(&mut self) {
        self.last = None;
    }
}

pub fn signature_of(df: &DataFrame) -> SchemaSignature {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}
