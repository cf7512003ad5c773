use serde::{Deserialize, Serialize};

/// Per-endpoint result limits
///
/// The soft limit applies when a request names no limit; the hard limit caps
/// every request, including explicit ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitPolicy {
    pub soft_limit: Option<u64>,
    pub hard_limit: Option<u64>,
}

impl LimitPolicy {
    pub fn new(soft_limit: Option<u64>, hard_limit: Option<u64>) -> Self {
        LimitPolicy {
            soft_limit,
            hard_limit,
        }
    }

    /// `min(requested ?? soft ?? unbounded, hard)`
    pub fn effective_limit(&self, requested: Option<u64>) -> Option<u64> {
        let wanted = requested.or(self.soft_limit);
        match (wanted, self.hard_limit) {
            (Some(w), Some(h)) => Some(w.min(h)),
            (None, Some(h)) => Some(h),
            (w, None) => w,
        }
    }

    /// Fill unset limits from `defaults`.
    pub fn or(self, defaults: LimitPolicy) -> Self {
        LimitPolicy {
            soft_limit: self.soft_limit.or(defaults.soft_limit),
            hard_limit: self.hard_limit.or(defaults.hard_limit),
        }
    }
}
