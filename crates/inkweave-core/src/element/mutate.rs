//! Version bookkeeping for element mutation.

use super::Element;
use crate::Random;
use web_time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Mark an element as edited: increment `version`, draw a fresh
/// `versionNonce` and refresh the `updated` timestamp.
pub fn bump_version(element: &mut Element, rng: &mut Random) {
    element.version += 1;
    element.version_nonce = rng.random_integer();
    element.updated = now_ms();
}

impl Element {
    /// Apply `f` and bump the version, the one way callers mutate elements.
    pub fn mutate(&mut self, rng: &mut Random, f: impl FnOnce(&mut Element)) {
        f(self);
        bump_version(self, rng);
    }

    /// Soft delete.
    pub fn mark_deleted(&mut self, rng: &mut Random) {
        self.mutate(rng, |el| el.is_deleted = true);
    }
}
