#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::{
    constants::{CAPABLE_TIER_MIN_CHARS, FAST_TIER_MAX_CHARS},
    types::{BackendTier, SourceType},
};

/// Length thresholds of the tier decision table, in characters of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    /// Plain text shorter than this goes to the fast tier.
    pub fast_max_chars:    usize,
    /// Evidence longer than this goes to the capable tier.
    pub capable_min_chars: usize,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            fast_max_chars:    FAST_TIER_MAX_CHARS,
            capable_min_chars: CAPABLE_TIER_MIN_CHARS,
        }
    }
}

/// Picks the backend tier for one assessment. First matching row wins:
///
/// 1. repository or website evidence: capable
/// 2. a reference example is present: capable
/// 3. evidence longer than `capable_min_chars`: capable
/// 4. plain text shorter than `fast_max_chars`: fast
/// 5. anything else: balanced
pub fn select_backend(
    source_type: SourceType,
    evidence_length: usize,
    has_reference_example: bool,
    policy: &TierPolicy,
) -> BackendTier {
    if source_type.is_remote() || has_reference_example {
        BackendTier::Capable
    } else if evidence_length > policy.capable_min_chars {
        BackendTier::Capable
    } else if evidence_length < policy.fast_max_chars && source_type == SourceType::Text {
        BackendTier::Fast
    } else {
        BackendTier::Balanced
    }
}
