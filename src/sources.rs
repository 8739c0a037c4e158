//! Trusted-source filtering.
//!
//! Samples in the external store may originate from arbitrary third-party
//! applications. Aggregation only trusts origins whose bundle identifier is
//! prefixed by the platform's own health agent, so duplicated or fabricated
//! third-party data does not inflate totals.
//!
//! The enumeration is re-issued for every aggregate/query call, with no
//! cache, at the cost of one extra store round trip per call. That is a
//! preserved behavior of the system this crate replaces, not an optimization
//! target.

use std::collections::HashSet;

use tracing::warn;

use crate::backends::HealthStore;
use crate::model::{MetricType, SourceId, SourceSet};

/// Bundle-identifier prefix of the platform health agent.
pub const TRUSTED_SOURCE_PREFIX: &str = "com.apple.health";

/// Enumerate the origins that wrote samples of `metric` and keep the trusted
/// ones.
///
/// Returns `None` (meaning **accept all sources**, never an error) when the
/// enumeration call fails or reports no sources at all. When the enumeration
/// succeeds but no origin carries the trusted prefix, the result is an empty
/// set, which matches nothing (faithful to the predicate semantics of the
/// original platform query).
pub async fn trusted_sources(
    store: &dyn HealthStore,
    metric: MetricType,
    prefix: &str,
) -> SourceSet {
    let enumerated = match store.sources(metric).await {
        Ok(sources) => sources,
        Err(error) => {
            warn!(?metric, %error, "source enumeration failed; accepting all sources");
            return None;
        }
    };

    if enumerated.is_empty() {
        return None;
    }

    let trusted: HashSet<SourceId> = enumerated
        .into_iter()
        .filter(|source| source.as_str().starts_with(prefix))
        .collect();

    Some(trusted)
}
