//! single-cursor strategy: one word-list feeds every output slot
use tracing::{instrument, trace};

use super::Strategy;
use crate::cursor::WordCursor;

/// every output slot receives the same single cursor's current word
///
/// the epoch is exhausted once the cursor completes a full wraparound, so a
/// cursor of N words produces exactly N requests
///
/// # Examples
///
/// if the cursor holds `["admin", "guest"]` and the template has two
/// placeholders, the produced combinations are:
///
/// `["admin", "admin"]`
/// `["guest", "guest"]`
#[derive(Clone, Debug)]
pub struct Singular {
    cursor: WordCursor,
    finished: bool,
}

impl Singular {
    /// create a new `Singular` strategy over a single cursor
    #[must_use]
    pub const fn new(cursor: WordCursor) -> Self {
        Self {
            cursor,
            finished: false,
        }
    }
}

impl Strategy for Singular {
    #[instrument(skip_all, level = "trace")]
    fn load_next(&mut self, values: &mut [Vec<u8>]) -> bool {
        if self.finished {
            trace!("strategy has run to completion");
            return true;
        }

        let word = self.cursor.current().to_vec();

        for value in values.iter_mut() {
            value.clone_from(&word);
        }

        if self.cursor.advance() {
            self.finished = true;
        }

        false
    }

    fn cardinality(&self) -> usize {
        self.cursor.len()
    }

    fn name(&self) -> &'static str {
        "singular"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{collect_all, cursor_of};
    use super::*;

    /// exactly N requests are generated where N is the cursor's word count,
    /// and every output slot in every request holds the identical value
    #[test]
    fn produces_word_count_requests_with_identical_slots() {
        let mut strategy = Singular::new(cursor_of(&["one", "two", "three"]));

        assert_eq!(strategy.cardinality(), 3);

        let combinations = collect_all(&mut strategy, 2);

        assert_eq!(combinations.len(), 3);

        for combination in &combinations {
            assert_eq!(combination[0], combination[1]);
        }

        assert_eq!(combinations[0][0], b"one");
        assert_eq!(combinations[1][0], b"two");
        assert_eq!(combinations[2][0], b"three");
    }

    /// exhaustion is sticky; further calls keep returning done
    #[test]
    fn exhaustion_is_permanent() {
        let mut strategy = Singular::new(cursor_of(&["only"]));

        let mut values = vec![Vec::new()];

        assert!(!strategy.load_next(&mut values));
        assert!(strategy.load_next(&mut values));
        assert!(strategy.load_next(&mut values));
    }
}
