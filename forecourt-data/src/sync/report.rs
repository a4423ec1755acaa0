use std::fmt;

use chrono::{DateTime, Utc};
use forecourt_core::{ExternalId, StoreError, ValidationError};

use crate::normalize::NormalizationWarning;

/// Number of error messages rendered by the `Display` implementation of
/// [`SyncReport`].
pub const DEFAULT_SUMMARY_ERRORS: usize = 5;

/// Catalog write attempted while applying a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOperation {
    /// Insert of a new listing.
    Create,
    /// Replacement of an existing listing.
    Update,
    /// Removal of a listing absent from the feed.
    Delete,
}

impl fmt::Display for ApplyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// A provider record rejected during normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Feed page the record arrived on.
    pub page: u32,
    /// Zero-based position of the record within its page.
    pub position: usize,
    /// Why the record was rejected.
    pub error: ValidationError,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page {} record {}: {}",
            self.page, self.position, self.error
        )
    }
}

/// A catalog write that failed while the rest of the plan was applied.
#[derive(Debug)]
pub struct ApplyFailure {
    /// Attempted operation.
    pub operation: ApplyOperation,
    /// Listing the operation targeted.
    pub external_id: ExternalId,
    /// Store error returned for the write.
    pub error: StoreError,
}

impl fmt::Display for ApplyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} failed: {}",
            self.operation, self.external_id, self.error
        )
    }
}

/// Outcome of a completed sync run.
#[derive(Debug)]
pub struct SyncReport {
    /// Listings inserted.
    pub created: usize,
    /// Listings replaced with changed content.
    pub updated: usize,
    /// Listings removed because the feed no longer carries them.
    pub deleted: usize,
    /// Listings present on both sides with identical content.
    pub unchanged: usize,
    /// Feed pages retrieved, including a final empty page.
    pub pages_fetched: u32,
    /// Provider records received.
    pub listings_fetched: usize,
    /// Records rejected during normalisation.
    pub validation_failures: Vec<ValidationFailure>,
    /// Optional fields dropped during normalisation.
    pub warnings: Vec<NormalizationWarning>,
    /// Writes that failed during apply.
    pub apply_failures: Vec<ApplyFailure>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub(crate) fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            created: 0,
            updated: 0,
            deleted: 0,
            unchanged: 0,
            pages_fetched: 0,
            listings_fetched: 0,
            validation_failures: Vec::new(),
            warnings: Vec::new(),
            apply_failures: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }

    /// Total number of successful catalog writes.
    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Whether every record normalised and every write succeeded.
    pub fn is_clean(&self) -> bool {
        self.validation_failures.is_empty() && self.apply_failures.is_empty()
    }

    /// Render the counts followed by at most `limit` error messages.
    ///
    /// Apply failures are listed before validation failures; warnings are
    /// counted but never listed.
    pub fn summary(&self, limit: usize) -> String {
        let mut out = format!(
            "created {}, updated {}, deleted {}, unchanged {} ({} listing(s) from {} page(s))",
            self.created,
            self.updated,
            self.deleted,
            self.unchanged,
            self.listings_fetched,
            self.pages_fetched,
        );
        out.push_str(&format!(
            "\n{} validation failure(s), {} warning(s), {} apply failure(s)",
            self.validation_failures.len(),
            self.warnings.len(),
            self.apply_failures.len(),
        ));

        let messages = self
            .apply_failures
            .iter()
            .map(ToString::to_string)
            .chain(self.validation_failures.iter().map(ToString::to_string));
        let total = self.apply_failures.len() + self.validation_failures.len();
        for message in messages.take(limit) {
            out.push_str("\n  - ");
            out.push_str(&message);
        }
        if total > limit {
            out.push_str(&format!("\n  ... and {} more", total - limit));
        }
        out
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary(DEFAULT_SUMMARY_ERRORS))
    }
}
