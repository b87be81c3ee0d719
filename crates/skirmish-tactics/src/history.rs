//! Bounded per-cluster verdict history.
//!
//! One entry is recorded each time the policy runs for a cluster. Entries form
//! a contiguous run of frames: recording after a gap starts a new fight and
//! discards what came before.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use skirmish_core::constants::HISTORY_CAPACITY;
use skirmish_core::result::CombatSimResult;

use crate::policy::ForcedReason;

/// One recorded policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub result: CombatSimResult,
    /// Whether the policy recommended engaging.
    pub engaged: bool,
    /// Override that made the engagement unconditional.
    #[serde(default)]
    pub forced: Option<ForcedReason>,
}

/// Stability of the trailing window, newest entry first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StabilityCounts {
    /// Entries in the window that recommended attacking.
    pub attack_frames: usize,
    /// Entries in the window that recommended regrouping.
    pub regroup_frames: usize,
    /// Length of the leading run agreeing with the newest entry.
    pub consecutive: usize,
}

/// Fixed-capacity, frame-ordered verdict log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictHistory {
    entries: VecDeque<Verdict>,
    capacity: usize,
}

impl Default for VerdictHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl VerdictHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a verdict for `result.frame`.
    pub fn push(&mut self, result: CombatSimResult, engaged: bool) {
        self.record(Verdict {
            result,
            engaged,
            forced: None,
        });
    }

    /// Record an engaged verdict that an override imposed.
    pub fn push_forced(&mut self, result: CombatSimResult, reason: ForcedReason) {
        self.record(Verdict {
            result,
            engaged: true,
            forced: Some(reason),
        });
    }

    fn record(&mut self, verdict: Verdict) {
        if let Some(last) = self.entries.back() {
            if last.result.frame.checked_add(1) != Some(verdict.result.frame) {
                self.entries.clear();
            }
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(verdict);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Most recent verdict.
    pub fn last(&self) -> Option<&Verdict> {
        self.entries.back()
    }

    /// Verdict recorded just before the most recent one.
    pub fn previous(&self) -> Option<&Verdict> {
        self.entries.iter().rev().nth(1)
    }

    /// Up to `limit` verdicts, newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &Verdict> {
        self.entries.iter().rev().take(limit)
    }

    /// Measure how settled the trailing `limit` verdicts are.
    pub fn consecutive_sim_results(&self, limit: usize) -> StabilityCounts {
        let mut counts = StabilityCounts::default();
        let Some(newest) = self.entries.back() else {
            return counts;
        };

        let mut in_run = true;
        for verdict in self.recent(limit) {
            if in_run {
                if verdict.engaged == newest.engaged {
                    counts.consecutive += 1;
                } else {
                    in_run = false;
                }
            }
            if verdict.engaged {
                counts.attack_frames += 1;
            } else {
                counts.regroup_frames += 1;
            }
        }
        counts
    }
}
