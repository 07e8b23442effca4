//! Conflicting cache directive detection.

use std::fmt;

use edge_core::{Diagnostic, RouteRenderMode};

use crate::directive::{CacheMode, FetchCallSpec};

/// A conflict between the directives of one fetch call.
///
/// The variants are mutually exclusive: the first two need an explicit
/// cache mode, the last needs none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheConflict {
    /// `cache: force-cache` with `revalidate: 0`.
    ForceCacheWithZeroRevalidate,
    /// `cache: no-store` with a positive `revalidate`.
    NoStoreWithRevalidate(u32),
    /// A `force-dynamic` route with a positive `revalidate` and no cache mode.
    ForceDynamicWithRevalidate(u32),
}

impl CacheConflict {
    /// Get the warning text for this conflict.
    pub fn message(&self) -> String {
        match self {
            Self::ForceCacheWithZeroRevalidate => {
                "Specified \"cache: force-cache\" and \"revalidate: 0\", only one should be specified."
                    .to_string()
            }
            Self::NoStoreWithRevalidate(n) => format!(
                "Specified \"cache: no-store\" and \"revalidate: {}\", only one should be specified.",
                n
            ),
            Self::ForceDynamicWithRevalidate(n) => format!(
                "Specified \"dynamic: 'force-dynamic'\" and \"revalidate: {}\" without explicitly caching the fetch. This fetch will be treated as an uncached fetch.",
                n
            ),
        }
    }
}

impl fmt::Display for CacheConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Evaluate the conflict rules against a fetch call, first match wins.
pub fn find_conflict(spec: &FetchCallSpec, mode: RouteRenderMode) -> Option<CacheConflict> {
    match (spec.explicit_cache_mode, spec.revalidate_seconds) {
        (CacheMode::ForceCache, Some(0)) => Some(CacheConflict::ForceCacheWithZeroRevalidate),
        (CacheMode::NoStore, Some(n)) if n > 0 => Some(CacheConflict::NoStoreWithRevalidate(n)),
        (CacheMode::Unset, Some(n)) if n > 0 && mode == RouteRenderMode::ForceDynamic => {
            Some(CacheConflict::ForceDynamicWithRevalidate(n))
        }
        _ => None,
    }
}

/// Produce the diagnostic for a fetch call, if its directives conflict.
///
/// The message does not depend on whether the call used a plain URL or a
/// request-like object.
pub fn detect_conflict(spec: &FetchCallSpec, mode: RouteRenderMode) -> Option<Diagnostic> {
    find_conflict(spec, mode).map(|conflict| to_diagnostic(spec, conflict))
}

pub(crate) fn to_diagnostic(spec: &FetchCallSpec, conflict: CacheConflict) -> Diagnostic {
    Diagnostic::new(
        spec.key.as_str(),
        spec.method.clone(),
        spec.url.clone(),
        conflict.message(),
    )
}
