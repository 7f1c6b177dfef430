//! plain-text result and progress output
use std::io::{self, Write};

use crate::pool::ResponseStats;
use crate::progress::ProgressTracker;

/// writes one line per surviving response to stdout and a periodic status
/// line to stderr
///
/// deliberately free of terminal color and cursor tricks; downstream tools
/// are expected to consume the result lines as-is
#[derive(Clone, Debug, Default)]
pub struct Reporter {
    quiet: bool,
}

impl Reporter {
    /// create a reporter; `quiet` suppresses the periodic status line
    #[must_use]
    pub const fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// write one classified response
    pub fn report(&self, values: &[Vec<u8>], stats: &ResponseStats) {
        let rendered: Vec<String> = values
            .iter()
            .map(|value| String::from_utf8_lossy(value).into_owned())
            .collect();

        let joined = rendered.join(" :: ");

        let line = if let Some(error) = &stats.transport_error {
            format!(
                "{joined:<24} [Error: {error}, Duration: {}ms]",
                stats.duration_ms
            )
        } else {
            format!(
                "{joined:<24} [Status: {}, Size: {}, Words: {}, Lines: {}, Duration: {}ms]",
                stats.status_code,
                stats.size_bytes,
                stats.word_count,
                stats.line_count,
                stats.duration_ms
            )
        };

        // a broken stdout pipe is the consumer's business, not a fuzzing error
        let _ = writeln!(io::stdout(), "{line}");
    }

    /// write the periodic status line
    pub fn progress(&self, tracker: &ProgressTracker) {
        if self.quiet {
            return;
        }

        let _ = write!(
            io::stderr(),
            "\r:: Progress: [{}/{}] :: {:.2}% :: {:.0} req/sec :: Errors: {} ",
            tracker.completed(),
            tracker.total_requests(),
            tracker.percentage(),
            tracker.rate(),
            tracker.errors()
        );
        let _ = io::stderr().flush();
    }

    /// terminate the status line once the run is over
    pub fn finish(&self, tracker: &ProgressTracker) {
        if self.quiet {
            return;
        }

        self.progress(tracker);
        let _ = writeln!(io::stderr());
    }
}
