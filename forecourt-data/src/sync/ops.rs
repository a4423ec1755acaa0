use chrono::{DateTime, Utc};
use forecourt_core::{
    ExternalId, ListingStore, NormalizedSet, StoreError, SyncPlan, ValidationError, reconcile,
};
use tokio_util::sync::CancellationToken;

use super::{ApplyFailure, ApplyOperation, SyncError, SyncLog, SyncReport, ValidationFailure};
use crate::feed::{FeedCredentials, FeedSource, FetchOptions, fetch_all};
use crate::normalize::{Normalized, Normalizer};

/// Settings for a single sync run.
#[derive(Debug, Default, Clone)]
pub struct SyncOptions<'a> {
    /// Pagination and retry settings for the feed.
    pub fetch: FetchOptions,
    /// Normaliser to apply; the vehicle normaliser when `None`.
    pub normalizer: Option<&'a Normalizer>,
    /// Token observed until the apply phase starts.
    pub cancellation: Option<&'a CancellationToken>,
    /// Audit log receiving the run outcome.
    pub log: Option<&'a SyncLog>,
}

impl<'a> SyncOptions<'a> {
    /// Replace the feed settings.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    /// Normalise with `normalizer` instead of the vehicle normaliser.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: &'a Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Abort the run when `token` is cancelled before changes are applied.
    #[must_use]
    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Record the outcome of the run in `log`.
    #[must_use]
    pub fn with_log(mut self, log: &'a SyncLog) -> Self {
        self.log = Some(log);
        self
    }
}

/// Bring `store` in line with the listings currently exposed by `source`.
///
/// The whole feed is fetched and normalised before the catalog is read, so a
/// fetch failure never leaves a partially applied plan behind. Records that
/// fail normalisation are reported and skipped. Once the plan is applied,
/// creates run first, then updates, then deletes; a failing write is recorded
/// in the report and the remaining writes still run.
///
/// Fatal errors are returned only for authentication, fetch and catalog
/// read failures, or a cancellation observed before the apply phase. None of
/// these modify the store.
pub async fn run_sync<S, T>(
    source: &S,
    credentials: &FeedCredentials,
    store: &mut T,
    options: SyncOptions<'_>,
) -> Result<SyncReport, SyncError>
where
    S: FeedSource + ?Sized,
    T: ListingStore + ?Sized,
{
    let started_at = Utc::now();
    let outcome = execute(source, credentials, store, &options, started_at).await;
    match &outcome {
        Ok(report) => log::info!("sync finished: {}", report.summary(0)),
        Err(err) => log::error!("sync aborted: {err}"),
    }
    if let Some(sync_log) = options.log {
        let recorded = match &outcome {
            Ok(report) => sync_log.record(report),
            Err(err) => sync_log.record_failure(started_at, Utc::now(), err),
        };
        if let Err(err) = recorded {
            log::warn!("failed to record sync run in {:?}: {err}", sync_log.path());
        }
    }
    outcome
}

async fn execute<S, T>(
    source: &S,
    credentials: &FeedCredentials,
    store: &mut T,
    options: &SyncOptions<'_>,
    started_at: DateTime<Utc>,
) -> Result<SyncReport, SyncError>
where
    S: FeedSource + ?Sized,
    T: ListingStore + ?Sized,
{
    let fallback;
    let normalizer = match options.normalizer {
        Some(normalizer) => normalizer,
        None => {
            fallback = Normalizer::vehicle();
            &fallback
        }
    };
    let mut report = SyncReport::new(started_at);
    let mut incoming = NormalizedSet::new();

    let mut pager = fetch_all(source, credentials, options.fetch.clone())?;
    while let Some(page) = pager.next_page().await? {
        ensure_not_cancelled(options.cancellation)?;
        for (position, raw) in page.listings.iter().enumerate() {
            report.listings_fetched += 1;
            let error = match normalizer.normalize(raw) {
                Ok(Normalized { listing, warnings }) => match incoming.insert(listing) {
                    Ok(()) => {
                        report.warnings.extend(warnings);
                        continue;
                    }
                    Err(duplicate) => ValidationError::DuplicateExternalId {
                        external_id: duplicate.rejected.external_id().clone(),
                    },
                },
                Err(error) => error,
            };
            log::warn!(
                "skipping record {position} of page {}: {error}",
                page.number
            );
            report.validation_failures.push(ValidationFailure {
                page: page.number,
                position,
                error,
            });
        }
    }
    report.pages_fetched = pager.pages_fetched();

    let stored = store
        .list_all()
        .map_err(|source| SyncError::LoadCatalog { source })?;
    let plan = reconcile(incoming, stored);
    ensure_not_cancelled(options.cancellation)?;

    log::info!(
        "applying plan: {} create(s), {} update(s), {} delete(s), {} duplicate(s), {} unchanged",
        plan.to_create.len(),
        plan.to_update.len(),
        plan.to_delete.len(),
        plan.duplicates.len(),
        plan.unchanged
    );
    apply(store, plan, &mut report);
    report.finished_at = Utc::now();
    Ok(report)
}

fn ensure_not_cancelled(token: Option<&CancellationToken>) -> Result<(), SyncError> {
    if token.is_some_and(CancellationToken::is_cancelled) {
        return Err(SyncError::Cancelled);
    }
    Ok(())
}

fn apply<T: ListingStore + ?Sized>(store: &mut T, plan: SyncPlan, report: &mut SyncReport) {
    report.unchanged = plan.unchanged;

    for listing in plan.to_create {
        let external_id = listing.external_id().clone();
        match store.create(listing) {
            Ok(_) => report.created += 1,
            Err(error) => record_failure(report, ApplyOperation::Create, external_id, error),
        }
    }

    for update in plan.to_update {
        let external_id = update.external_id().clone();
        log::debug!(
            "updating {external_id}: changed {}",
            update.changed_fields().join(", ")
        );
        match store.update(update.stored.key, update.incoming) {
            Ok(_) => report.updated += 1,
            Err(error) => record_failure(report, ApplyOperation::Update, external_id, error),
        }
    }

    for stored in plan.to_delete.into_iter().chain(plan.duplicates) {
        let external_id = stored.external_id().clone();
        match store.delete(stored.key) {
            Ok(()) => report.deleted += 1,
            Err(error) => record_failure(report, ApplyOperation::Delete, external_id, error),
        }
    }
}

fn record_failure(
    report: &mut SyncReport,
    operation: ApplyOperation,
    external_id: ExternalId,
    error: StoreError,
) {
    log::warn!("{operation} of {external_id} failed: {error}");
    report.apply_failures.push(ApplyFailure {
        operation,
        external_id,
        error,
    });
}
