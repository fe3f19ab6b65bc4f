//! Per-object transition statistics

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated under the object mutex
#[derive(Debug, Default)]
pub(crate) struct TransitionCounters {
    promotions: AtomicU64,
    demotions: AtomicU64,
    groups_created: AtomicU64,
    destructions: AtomicU64,
}

impl TransitionCounters {
    pub(crate) fn record_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_demotion(&self) {
        self.demotions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_group(&self) {
        self.groups_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_destruction(&self) {
        self.destructions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ObjectStats {
        ObjectStats {
            promotions: self.promotions.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
            groups_created: self.groups_created.load(Ordering::Relaxed),
            destructions: self.destructions.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of an object's lifetime transitions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObjectStats {
    /// Weak to strong conversions
    pub promotions: u64,
    /// Strong to weak conversions
    pub demotions: u64,
    /// Shared-owner groups created
    pub groups_created: u64,
    /// Times the object was destroyed (0 or 1)
    pub destructions: u64,
}

impl ObjectStats {
    /// Every promotion has been matched by a demotion
    pub fn is_balanced(&self) -> bool {
        self.promotions == self.demotions
    }
}

impl std::ops::AddAssign for ObjectStats {
    fn add_assign(&mut self, other: Self) {
        self.promotions += other.promotions;
        self.demotions += other.demotions;
        self.groups_created += other.groups_created;
        self.destructions += other.destructions;
    }
}
