//! Effective caching decisions for fetch calls.

use edge_core::{Diagnostic, RouteRenderMode};
use serde::{Deserialize, Serialize};

use crate::conflict::{find_conflict, to_diagnostic, CacheConflict};
use crate::directive::{CacheMode, FetchCallSpec};

/// `s-maxage` advertised for results cached without a TTL.
pub const INDEFINITE_MAX_AGE: u32 = 31_536_000;

/// The caching decision a fetch call will actually use.
///
/// Advisory output for the data-fetch execution layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveCachePlan {
    /// Whether the result may be stored in the data cache.
    pub cached: bool,
    /// Time-to-live in seconds; `None` when cached means indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u32>,
    /// Cache tags for invalidation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl EffectiveCachePlan {
    /// A plan that bypasses the data cache.
    pub fn uncached() -> Self {
        Self {
            cached: false,
            ttl_seconds: None,
            tags: Vec::new(),
        }
    }

    /// A plan that caches until explicitly revalidated.
    pub fn indefinitely() -> Self {
        Self {
            cached: true,
            ttl_seconds: None,
            tags: Vec::new(),
        }
    }

    /// A plan that caches for `ttl` seconds.
    pub fn for_seconds(ttl: u32) -> Self {
        Self {
            cached: true,
            ttl_seconds: Some(ttl),
            tags: Vec::new(),
        }
    }

    /// Attach cache tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Generate a Cache-Control value describing this plan.
    pub fn cache_control_header(&self) -> String {
        if !self.cached {
            return "no-store".to_string();
        }
        format!("s-maxage={}", self.ttl_seconds.unwrap_or(INDEFINITE_MAX_AGE))
    }
}

/// Compute the effective caching decision for a fetch call.
///
/// Deterministic in its inputs. An explicit cache mode decides cached vs.
/// uncached and a conflicting revalidate value is ignored; a conflicting
/// revalidate on a `force-dynamic` route yields an uncached fetch.
pub fn plan_cache(spec: &FetchCallSpec, mode: RouteRenderMode) -> EffectiveCachePlan {
    plan_with_conflict(spec, mode, find_conflict(spec, mode))
}

fn plan_with_conflict(
    spec: &FetchCallSpec,
    mode: RouteRenderMode,
    conflict: Option<CacheConflict>,
) -> EffectiveCachePlan {
    let plan = match (spec.explicit_cache_mode, conflict) {
        (CacheMode::NoStore, _) => EffectiveCachePlan::uncached(),
        (CacheMode::ForceCache, Some(_)) => EffectiveCachePlan::indefinitely(),
        (CacheMode::ForceCache, None) => match spec.revalidate_seconds {
            Some(ttl) if ttl > 0 => EffectiveCachePlan::for_seconds(ttl),
            _ => EffectiveCachePlan::indefinitely(),
        },
        (CacheMode::Unset, Some(_)) => EffectiveCachePlan::uncached(),
        (CacheMode::Unset, None) if !spec.is_cacheable_method() => {
            EffectiveCachePlan::uncached()
        }
        (CacheMode::Unset, None) => match spec.revalidate_seconds {
            Some(0) => EffectiveCachePlan::uncached(),
            Some(ttl) => EffectiveCachePlan::for_seconds(ttl),
            None if mode.is_per_request() => EffectiveCachePlan::uncached(),
            None => EffectiveCachePlan::indefinitely(),
        },
    };

    if plan.cached {
        plan.with_tags(spec.tags.clone())
    } else {
        plan
    }
}

/// Outcome of resolving one fetch call's directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResolution {
    /// The caching decision.
    pub plan: EffectiveCachePlan,
    /// The conflict found, if any.
    pub conflict: Option<CacheConflict>,
    /// The diagnostic to emit, if any.
    pub diagnostic: Option<Diagnostic>,
}

/// Conflict-check and plan a fetch call in one pass.
pub fn resolve(spec: &FetchCallSpec, mode: RouteRenderMode) -> FetchResolution {
    let conflict = find_conflict(spec, mode);
    FetchResolution {
        plan: plan_with_conflict(spec, mode, conflict),
        conflict,
        diagnostic: conflict.map(|c| to_diagnostic(spec, c)),
    }
}
