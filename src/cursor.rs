//! circular cursors over newline-delimited word-list buffers
use std::fs;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};

use crate::error::StrikeFuzzError;
use crate::DEFAULT_MARKER;

/// circular, mutable iteration cursor over one word-list
///
/// the backing buffer is a flat sequence of newline-delimited byte runs; the
/// cursor tracks the extent of the current word and wraps back to the first
/// word after the last one. wrapping (index returning to 0) is the cursor's
/// only epoch-complete signal
///
/// # Examples
///
/// ```
/// # use strikefuzz::cursor::WordCursor;
/// let mut cursor = WordCursor::new(b"admin\nguest\nroot".to_vec());
///
/// assert_eq!(cursor.len(), 3);
/// assert_eq!(cursor.current(), b"admin");
///
/// assert!(!cursor.advance());
/// assert_eq!(cursor.current(), b"guest");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WordCursor {
    words: Vec<u8>,
    word_len: usize,
    index: usize,
    total_count: usize,
    offset: usize,
}

impl WordCursor {
    /// create a cursor over a raw byte buffer, scanning it once to count
    /// newline-delimited words and locate the first word's extent
    ///
    /// a buffer containing zero delimiters is a single word spanning the
    /// whole buffer; a final trailing newline does not start a new word. a
    /// buffer with no words at all degrades to the one-word dummy list so
    /// that downstream index arithmetic never needs a null check
    #[must_use]
    pub fn new(words: Vec<u8>) -> Self {
        let mut total_count = words.iter().filter(|&&byte| byte == b'\n').count();

        if !matches!(words.last(), None | Some(b'\n')) {
            // buffer doesn't end on a delimiter, the final run is a word too
            total_count += 1;
        }

        if total_count == 0 {
            warn!("word-list is empty; substituting the one-word dummy list");
            return Self::dummy();
        }

        let mut cursor = Self {
            words,
            word_len: 0,
            index: 0,
            total_count,
            offset: 0,
        };

        cursor.word_len = cursor.scan_word_len();

        cursor
    }

    /// create a cursor whose single word is the literal placeholder text
    ///
    /// used when a backing source can't be opened, or when the engine needs
    /// to pad out a placeholder/word-list count mismatch
    #[must_use]
    pub fn dummy() -> Self {
        Self {
            words: DEFAULT_MARKER.as_bytes().to_vec(),
            word_len: DEFAULT_MARKER.len(),
            index: 0,
            total_count: 1,
            offset: 0,
        }
    }

    /// create a cursor from the word-list file at `file_path`
    ///
    /// # Errors
    ///
    /// returns an error if the file can't be read; callers that want the
    /// degraded-but-running behavior should fall back to [`WordCursor::dummy`]
    #[instrument(skip_all, level = "trace")]
    pub fn from_file<P>(file_path: P) -> Result<Self, StrikeFuzzError>
    where
        P: AsRef<Path>,
    {
        let words = fs::read(&file_path).map_err(|source| {
            error!(
                file = file_path.as_ref().to_string_lossy().to_string(),
                "could not open file while creating a word cursor: {}", source
            );

            StrikeFuzzError::WordlistOpenError {
                source,
                path: file_path.as_ref().to_string_lossy().to_string(),
            }
        })?;

        Ok(Self::new(words))
    }

    // length of the word starting at `self.offset`, i.e. distance to the
    // next delimiter or the end of the buffer
    fn scan_word_len(&self) -> usize {
        self.words[self.offset..]
            .iter()
            .position(|&byte| byte == b'\n')
            .unwrap_or(self.words.len() - self.offset)
    }

    /// the word currently under the cursor
    #[must_use]
    pub fn current(&self) -> &[u8] {
        &self.words[self.offset..self.offset + self.word_len]
    }

    /// step the cursor to the next word, wrapping `index` modulo the total
    /// word count; returns `true` when the step wrapped back to the first
    /// word, which completes the cursor's iteration epoch
    pub fn advance(&mut self) -> bool {
        self.index = (self.index + 1) % self.total_count;

        if self.index == 0 {
            self.offset = 0;
        } else {
            // skip the current word plus its trailing delimiter
            self.offset += self.word_len + 1;
        }

        self.word_len = self.scan_word_len();

        self.index == 0
    }

    /// number of words in the backing buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.total_count
    }

    /// true if the cursor holds no words; never observable after
    /// construction, kept for api completeness
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// zero-based position of the current word
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}
