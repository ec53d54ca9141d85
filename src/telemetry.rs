//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: completion provider name (e.g. "groq")
//! - `status`: outcome: "ok" or "error"

/// Total completion requests received by the gateway.
pub const REQUESTS_TOTAL: &str = "huginn_requests_total";

/// Total entries pushed onto the single-flight queue.
pub const QUEUED_TOTAL: &str = "huginn_queued_total";

/// Total queue entries executed.
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const COMPLETIONS_TOTAL: &str = "huginn_completions_total";

/// Duration of one queue entry, from dequeue to completion signal.
///
/// Labels: `provider`.
pub const COMPLETION_DURATION_SECONDS: &str = "huginn_completion_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`.
pub const RETRIES_TOTAL: &str = "huginn_retries_total";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total response cache misses.
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Total page fetches through the text extraction service.
///
/// Labels: `outcome` ("ok" or the failure kind).
pub const PAGE_FETCHES_TOTAL: &str = "huginn_page_fetches_total";

/// Total events broadcast to connected peers.
///
/// Labels: `event` (wire name of the event).
pub const BROADCASTS_TOTAL: &str = "huginn_broadcasts_total";
