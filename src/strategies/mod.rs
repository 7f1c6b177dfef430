//! word-combination strategies that drive the iteration epoch
//!
//! all strategies expose one operation: load the next combination of words
//! into the caller's value slots, and say when the overall epoch is
//! exhausted
use std::fmt::Debug;

use tracing::warn;

use crate::config::Mode;
use crate::cursor::WordCursor;

mod clusterbomb;
mod pitchfork;
mod singular;

pub use clusterbomb::Clusterbomb;
pub use pitchfork::Pitchfork;
pub use singular::Singular;

/// state machine over N word cursors deciding which combination of words is
/// loaded into the next request
pub trait Strategy: Debug {
    /// load the next combination into `values`, one value per output slot,
    /// and advance the underlying cursors
    ///
    /// returns `true` when the iteration epoch is exhausted, in which case
    /// `values` is left untouched and no further combinations will ever be
    /// produced
    fn load_next(&mut self, values: &mut [Vec<u8>]) -> bool;

    /// total number of combinations this strategy will produce before
    /// exhaustion; computed once at startup for progress accounting
    fn cardinality(&self) -> usize;

    /// short human-readable strategy name
    fn name(&self) -> &'static str;
}

/// build the strategy selected by `mode` over the given cursors
///
/// the cursor registry must already be repaired (padded or truncated) to
/// match the template's placeholder count; singular additionally collapses
/// the registry down to its first cursor
#[must_use]
pub fn build(mode: Mode, mut cursors: Vec<WordCursor>) -> Box<dyn Strategy> {
    match mode {
        Mode::Singular => {
            if cursors.len() > 1 {
                warn!(
                    extra = cursors.len() - 1,
                    "singular mode uses exactly one word-list; ignoring the rest"
                );
            }

            let cursor = cursors.into_iter().next().unwrap_or_else(WordCursor::dummy);

            Box::new(Singular::new(cursor))
        }
        Mode::Pitchfork => Box::new(Pitchfork::new(ensure_non_empty(&mut cursors))),
        Mode::Clusterbomb => Box::new(Clusterbomb::new(ensure_non_empty(&mut cursors))),
    }
}

// a strategy over zero cursors has nothing to iterate; substitute the
// one-word dummy so the epoch arithmetic stays well-defined
fn ensure_non_empty(cursors: &mut Vec<WordCursor>) -> Vec<WordCursor> {
    if cursors.is_empty() {
        warn!("no word-lists were registered; substituting the one-word dummy list");
        cursors.push(WordCursor::dummy());
    }

    std::mem::take(cursors)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::WordCursor;

    /// cursor over the given words, newline-joined
    pub(crate) fn cursor_of(words: &[&str]) -> WordCursor {
        WordCursor::new(words.join("\n").into_bytes())
    }

    /// drive a strategy to exhaustion, collecting every produced combination
    pub(crate) fn collect_all(
        strategy: &mut dyn super::Strategy,
        slots: usize,
    ) -> Vec<Vec<Vec<u8>>> {
        let mut combinations = Vec::new();

        loop {
            let mut values = vec![Vec::new(); slots];

            if strategy.load_next(&mut values) {
                break;
            }

            combinations.push(values);
        }

        combinations
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::cursor_of;
    use super::*;

    #[test]
    fn build_dispatches_on_mode() {
        let cursors = vec![cursor_of(&["a", "b"])];

        assert_eq!(build(Mode::Singular, cursors.clone()).name(), "singular");
        assert_eq!(build(Mode::Pitchfork, cursors.clone()).name(), "pitchfork");
        assert_eq!(build(Mode::Clusterbomb, cursors).name(), "clusterbomb");
    }

    #[test]
    fn empty_registry_degrades_to_single_dummy() {
        let mut strategy = build(Mode::Clusterbomb, Vec::new());

        assert_eq!(strategy.cardinality(), 1);

        let mut values = vec![Vec::new()];
        assert!(!strategy.load_next(&mut values));
        assert_eq!(values[0], b"FUZZ");

        assert!(strategy.load_next(&mut values));
    }
}
