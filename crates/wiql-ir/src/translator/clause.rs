//! In-progress clause accumulation

use crate::fragment::Fragment;

/// Fragments of the where/order clause currently being assembled
#[derive(Debug, Default)]
pub(crate) enum ClauseState {
    #[default]
    Idle,
    Accumulating(Vec<Fragment>),
}

impl ClauseState {
    pub(crate) fn push(&mut self, fragment: Fragment) {
        match self {
            ClauseState::Idle => *self = ClauseState::Accumulating(vec![fragment]),
            ClauseState::Accumulating(fragments) => fragments.push(fragment),
        }
    }

    /// Drop anything accumulated so far
    pub(crate) fn reset(&mut self) {
        *self = ClauseState::Idle;
    }

    /// Close the clause. Consumes the state; callers continue with a fresh `Idle`.
    pub(crate) fn flush(self) -> Option<Fragment> {
        match self {
            ClauseState::Idle => None,
            ClauseState::Accumulating(fragments) => Some(Fragment::Compound(fragments)),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_idle(&self) -> bool {
        matches!(self, ClauseState::Idle)
    }
}
