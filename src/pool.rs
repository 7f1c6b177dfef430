//! fixed-size pool of reusable request-context slots
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// statistics harvested from one completed request
///
/// reset to zero whenever the owning context returns to `Free`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResponseStats {
    /// http status code, 0 when no status was obtained
    pub status_code: u16,

    /// response body size in bytes
    pub size_bytes: usize,

    /// whitespace-separated word count of the response body
    pub word_count: usize,

    /// newline count of the response body
    pub line_count: usize,

    /// request round-trip time in milliseconds, including the body read
    pub duration_ms: u64,

    /// transport-level failure (connection refused, timeout, tls, ...);
    /// responses carrying one bypass filtering and are always reported
    pub transport_error: Option<String>,
}

impl ResponseStats {
    /// derive stats from a received status code and body
    #[must_use]
    pub fn from_response(status_code: u16, body: &[u8], duration_ms: u64) -> Self {
        Self {
            status_code,
            size_bytes: body.len(),
            word_count: body
                .split(|byte| byte.is_ascii_whitespace())
                .filter(|run| !run.is_empty())
                .count(),
            line_count: body.iter().filter(|&&byte| byte == b'\n').count(),
            duration_ms,
            transport_error: None,
        }
    }

    /// stats for a request that never produced an http status
    #[must_use]
    pub fn from_transport_error(message: String, duration_ms: u64) -> Self {
        Self {
            duration_ms,
            transport_error: Some(message),
            ..Self::default()
        }
    }
}

/// lifecycle of a pool slot; a context in `InUse` is, by construction,
/// exactly one in-flight transport request
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SlotState {
    /// available for the next admission
    #[default]
    Free,

    /// bound to an in-flight request
    InUse,
}

/// one reusable slot: the resolved placeholder values of the request it
/// currently carries, plus the statistics of its response
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RequestContext {
    state: SlotState,
    values: Vec<Vec<u8>>,
    stats: ResponseStats,
}

impl RequestContext {
    /// slot lifecycle state
    #[must_use]
    pub const fn state(&self) -> SlotState {
        self.state
    }

    /// resolved placeholder values of the in-flight request
    #[must_use]
    pub fn values(&self) -> &[Vec<u8>] {
        &self.values
    }

    /// bind the resolved values for this use cycle
    pub fn set_values(&mut self, values: Vec<Vec<u8>>) {
        self.values = values;
    }

    /// response statistics recorded on completion
    #[must_use]
    pub const fn stats(&self) -> &ResponseStats {
        &self.stats
    }

    /// record the completed response's statistics
    pub fn set_stats(&mut self, stats: ResponseStats) {
        self.stats = stats;
    }
}

/// fixed-capacity set of reusable request contexts bounding concurrency
///
/// pool size equals the configured concurrency limit; contexts are created
/// once at startup and reused for the life of the engine
///
/// # Examples
///
/// ```
/// # use strikefuzz::pool::ContextPool;
/// let mut pool = ContextPool::new(2);
///
/// let first = pool.claim().unwrap();
/// let second = pool.claim().unwrap();
///
/// // saturated; callers retry later instead of blocking
/// assert!(pool.claim().is_none());
///
/// pool.release(first);
/// assert_eq!(pool.claim(), Some(first));
/// ```
#[derive(Clone, Debug)]
pub struct ContextPool {
    contexts: Vec<RequestContext>,
}

impl ContextPool {
    /// create a pool of `size` free contexts
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            contexts: vec![RequestContext::default(); size.max(1)],
        }
    }

    /// claim the first free context, or `None` when the pool is saturated;
    /// never blocks
    #[instrument(skip_all, level = "trace")]
    pub fn claim(&mut self) -> Option<usize> {
        let slot = self
            .contexts
            .iter()
            .position(|context| context.state == SlotState::Free)?;

        self.contexts[slot].state = SlotState::InUse;

        Some(slot)
    }

    /// zero the slot's statistics and owned value buffers, then mark it free
    #[instrument(skip_all, level = "trace")]
    pub fn release(&mut self, slot: usize) {
        let context = &mut self.contexts[slot];

        context.stats = ResponseStats::default();
        context.values.clear();
        context.state = SlotState::Free;
    }

    /// mutable access to a claimed slot
    #[must_use]
    pub fn get_mut(&mut self, slot: usize) -> &mut RequestContext {
        &mut self.contexts[slot]
    }

    /// shared access to a slot
    #[must_use]
    pub fn get(&self, slot: usize) -> &RequestContext {
        &self.contexts[slot]
    }

    /// number of contexts currently bound to in-flight requests
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.contexts
            .iter()
            .filter(|context| context.state == SlotState::InUse)
            .count()
    }

    /// pool capacity, i.e. the configured concurrency limit
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.contexts.len()
    }

    /// true when every context is in use
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.in_use() == self.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// at no point can more contexts be claimed than the configured limit
    #[test]
    fn claims_never_exceed_capacity() {
        let mut pool = ContextPool::new(3);

        assert_eq!(pool.claim(), Some(0));
        assert_eq!(pool.claim(), Some(1));
        assert_eq!(pool.claim(), Some(2));
        assert_eq!(pool.claim(), None);

        assert_eq!(pool.in_use(), 3);
        assert!(pool.is_saturated());
    }

    /// releasing a context resets all `ResponseStats` fields to zero; a
    /// freshly claimed context after one full use cycle is pristine
    #[test]
    fn release_zeroes_stats_and_values() {
        let mut pool = ContextPool::new(1);

        let slot = pool.claim().unwrap();

        let context = pool.get_mut(slot);
        context.set_values(vec![b"admin".to_vec()]);
        context.set_stats(ResponseStats::from_response(200, b"hello world\n", 42));

        assert_eq!(pool.get(slot).stats().status_code, 200);

        pool.release(slot);

        let slot = pool.claim().unwrap();
        let context = pool.get(slot);

        assert_eq!(context.stats(), &ResponseStats::default());
        assert!(context.values().is_empty());

        pool.release(slot);
    }

    /// stats derivation counts bytes, whitespace-separated words, and newlines
    #[test]
    fn stats_derivation_from_body() {
        let stats = ResponseStats::from_response(404, b"not found\ntry again\n", 7);

        assert_eq!(stats.status_code, 404);
        assert_eq!(stats.size_bytes, 20);
        assert_eq!(stats.word_count, 4);
        assert_eq!(stats.line_count, 2);
        assert_eq!(stats.duration_ms, 7);
        assert!(stats.transport_error.is_none());
    }

    /// transport errors carry no status but keep their timing
    #[test]
    fn stats_from_transport_error() {
        let stats = ResponseStats::from_transport_error("connection refused".to_string(), 13);

        assert_eq!(stats.status_code, 0);
        assert_eq!(stats.duration_ms, 13);
        assert_eq!(stats.transport_error.as_deref(), Some("connection refused"));
    }

    /// a zero-size pool still holds one slot so the engine can progress
    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut pool = ContextPool::new(0);

        assert_eq!(pool.capacity(), 1);
        assert!(pool.claim().is_some());
    }
}
