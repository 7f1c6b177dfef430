//! cartesian-product iteration over word-lists
use tracing::{instrument, trace};

use super::Strategy;
use crate::cursor::WordCursor;

/// odometer/carry semantics over N cursors
///
/// the first cursor advances on every call; when it wraps back to its first
/// word the carry propagates to the next cursor, which advances once, and so
/// on. the epoch is exhausted only when every cursor simultaneously returns
/// to index 0 after an advance, which happens exactly once, after the
/// product of all cursor lengths. this enumerates the full cartesian product
/// exactly once, in lexicographic order with the first cursor as the
/// fastest-changing digit
///
/// # Examples
///
/// with cursors `["user", "admin"]` and `["pass1", "pass2"]`:
///
/// `["user",  "pass1"]`
/// `["admin", "pass1"]`
/// `["user",  "pass2"]`
/// `["admin", "pass2"]`
#[derive(Clone, Debug)]
pub struct Clusterbomb {
    cursors: Vec<WordCursor>,
    finished: bool,
}

impl Clusterbomb {
    /// create a new `Clusterbomb` strategy over the given cursors
    ///
    /// # Panics
    ///
    /// panics if `cursors` is empty; [`build`] guarantees at least one
    ///
    /// [`build`]: super::build
    #[must_use]
    pub fn new(cursors: Vec<WordCursor>) -> Self {
        assert!(!cursors.is_empty());

        Self {
            cursors,
            finished: false,
        }
    }
}

impl Strategy for Clusterbomb {
    #[instrument(skip_all, level = "trace")]
    fn load_next(&mut self, values: &mut [Vec<u8>]) -> bool {
        if self.finished {
            trace!("strategy has run to completion");
            return true;
        }

        for (slot, cursor) in self.cursors.iter().enumerate() {
            values[slot] = cursor.current().to_vec();
        }

        // odometer: advance the first digit; a wraparound carries into the
        // next digit. carry falling off the last digit means every cursor is
        // back at index 0 and the product is complete
        let mut carry = true;

        for cursor in &mut self.cursors {
            if !carry {
                break;
            }

            carry = cursor.advance();
        }

        if carry {
            self.finished = true;
        }

        false
    }

    fn cardinality(&self) -> usize {
        self.cursors
            .iter()
            .map(WordCursor::len)
            .fold(1, usize::saturating_mul)
    }

    fn name(&self) -> &'static str {
        "clusterbomb"
    }
}
