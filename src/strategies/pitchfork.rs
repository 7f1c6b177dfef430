//! parallel, independently-wrapping iteration over word-lists
use tracing::{instrument, trace};

use super::Strategy;
use crate::cursor::WordCursor;

/// each of the N cursors contributes its own value to the matching output
/// slot; all cursors advance independently, wrapping on their own schedule
///
/// the epoch ends once the longest cursor (largest word count, located once
/// at startup) completes a wraparound. shorter cursors will have silently
/// repeated from their own start by then — that asymmetry is intentional,
/// not a synchronization bug
///
/// # Examples
///
/// with cursors `["user1", "user2", "user3"]` and `["pass1", "pass2"]`:
///
/// `["user1", "pass1"]`
/// `["user2", "pass2"]`
/// `["user3", "pass1"]`
#[derive(Clone, Debug)]
pub struct Pitchfork {
    cursors: Vec<WordCursor>,
    longest: usize,
    finished: bool,
}

impl Pitchfork {
    /// create a new `Pitchfork` strategy over the given cursors
    ///
    /// # Panics
    ///
    /// panics if `cursors` is empty; [`build`] guarantees at least one
    ///
    /// [`build`]: super::build
    #[must_use]
    pub fn new(cursors: Vec<WordCursor>) -> Self {
        assert!(!cursors.is_empty());

        // position of the cursor with the largest word count; ties go to the
        // first such cursor (`max_by_key` would keep the last)
        let mut longest = 0;

        for (position, cursor) in cursors.iter().enumerate() {
            if cursor.len() > cursors[longest].len() {
                longest = position;
            }
        }

        Self {
            cursors,
            longest,
            finished: false,
        }
    }
}

impl Strategy for Pitchfork {
    #[instrument(skip_all, level = "trace")]
    fn load_next(&mut self, values: &mut [Vec<u8>]) -> bool {
        if self.finished {
            trace!("strategy has run to completion");
            return true;
        }

        for (slot, cursor) in self.cursors.iter().enumerate() {
            values[slot] = cursor.current().to_vec();
        }

        for (slot, cursor) in self.cursors.iter_mut().enumerate() {
            let wrapped = cursor.advance();

            if wrapped && slot == self.longest {
                self.finished = true;
            }
        }

        false
    }

    fn cardinality(&self) -> usize {
        self.cursors[self.longest].len()
    }

    fn name(&self) -> &'static str {
        "pitchfork"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{collect_all, cursor_of};
    use super::*;

    /// with cursor sizes (a, b), exactly max(a, b) requests are generated
    #[test]
    fn produces_max_cursor_length_requests() {
        let mut strategy = Pitchfork::new(vec![
            cursor_of(&["u1", "u2", "u3", "u4", "u5"]),
            cursor_of(&["p1", "p2", "p3"]),
        ]);

        assert_eq!(strategy.cardinality(), 5);
        assert_eq!(collect_all(&mut strategy, 2).len(), 5);
    }

    /// the shorter cursor repeats from its own start, not from the other
    /// cursor's position
    #[test]
    fn shorter_cursor_wraps_from_its_own_start() {
        let mut strategy = Pitchfork::new(vec![
            cursor_of(&["u1", "u2", "u3", "u4", "u5"]),
            cursor_of(&["p1", "p2", "p3"]),
        ]);

        let combinations = collect_all(&mut strategy, 2);

        let expected: Vec<(&[u8], &[u8])> = vec![
            (b"u1", b"p1"),
            (b"u2", b"p2"),
            (b"u3", b"p3"),
            (b"u4", b"p1"), // shorter list restarted at p1
            (b"u5", b"p2"),
        ];

        for (combination, (user, pass)) in combinations.iter().zip(expected) {
            assert_eq!(combination[0], user);
            assert_eq!(combination[1], pass);
        }
    }

    /// equal-length cursors advance in lockstep and finish together
    #[test]
    fn equal_length_cursors_advance_in_lockstep() {
        let mut strategy =
            Pitchfork::new(vec![cursor_of(&["a", "b"]), cursor_of(&["1", "2"])]);

        let combinations = collect_all(&mut strategy, 2);

        assert_eq!(combinations.len(), 2);
        assert_eq!(combinations[0], vec![b"a".to_vec(), b"1".to_vec()]);
        assert_eq!(combinations[1], vec![b"b".to_vec(), b"2".to_vec()]);
    }

    /// with several equally-long cursors the epoch still spans exactly one
    /// pass of that shared length, whichever of them carries the end signal
    #[test]
    fn tied_longest_cursors_finish_together() {
        let mut strategy = Pitchfork::new(vec![
            cursor_of(&["s1", "s2"]),
            cursor_of(&["a1", "a2", "a3"]),
            cursor_of(&["b1", "b2", "b3"]),
        ]);

        assert_eq!(strategy.cardinality(), 3);

        let combinations = collect_all(&mut strategy, 3);

        assert_eq!(combinations.len(), 3);
        // the short cursor wrapped, the tied long ones each ran one pass
        assert_eq!(
            combinations[2],
            vec![b"s1".to_vec(), b"a3".to_vec(), b"b3".to_vec()]
        );
    }

    /// a single cursor behaves like an ordered walk of the list
    #[test]
    fn single_cursor_walks_in_order() {
        let mut strategy = Pitchfork::new(vec![cursor_of(&["x", "y", "z"])]);

        let combinations = collect_all(&mut strategy, 1);

        assert_eq!(combinations.len(), 3);
        assert_eq!(combinations[2][0], b"z");
    }
}
