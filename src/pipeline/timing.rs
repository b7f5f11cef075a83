//! Pass timing: bounded readback polling and per-pass durations.
//!
//! Timestamp results arrive asynchronously. Instead of spinning until every
//! query is available, readback is polled a bounded number of times within a
//! wall-clock budget; if either runs out the frame's timings are reported as
//! unavailable and rendering carries on.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::schedule::PassKind;

/// Upper bounds for one timing readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingPolicy {
    /// Polls before giving up
    pub max_attempts: u32,
    /// Wall-clock budget for all polls, microseconds
    pub timeout_micros: u64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 64,
            timeout_micros: 2_000,
        }
    }
}

impl TimingPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_micros(self.timeout_micros)
    }

    /// At least one attempt and a budget of at most one second.
    pub fn sanitized(self) -> Self {
        Self {
            max_attempts: self.max_attempts.max(1),
            timeout_micros: self.timeout_micros.min(1_000_000),
        }
    }
}

/// Call `poll` until it yields a value, the attempts run out or the budget expires.
pub fn poll_with_policy<T>(policy: &TimingPolicy, mut poll: impl FnMut() -> Option<T>) -> Option<T> {
    let start = Instant::now();
    let timeout = policy.timeout();
    for attempt in 0..policy.max_attempts.max(1) {
        if let Some(value) = poll() {
            return Some(value);
        }
        if start.elapsed() >= timeout {
            tracing::debug!(attempt, "timing readback timed out");
            return None;
        }
        std::hint::spin_loop();
    }
    tracing::debug!(attempts = policy.max_attempts, "timing readback not ready");
    None
}

/// Source of resolved timestamp ticks, two per timed GPU pass.
pub trait QueryReadback {
    /// Ticks once all queries of the frame are available, `None` while pending.
    fn try_read(&mut self) -> Option<Vec<u64>>;

    /// Nanoseconds per tick.
    fn period_ns(&self) -> f32;
}

/// Poll `readback` under `policy` and convert whatever arrived.
pub fn read_timings(readback: &mut dyn QueryReadback, policy: &TimingPolicy) -> FrameTimings {
    let period = readback.period_ns();
    match poll_with_policy(policy, || readback.try_read()) {
        Some(ticks) => FrameTimings::from_ticks(&ticks, period),
        None => FrameTimings::unavailable(),
    }
}

/// Milliseconds per pass; `None` where no measurement is available.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTimings {
    passes: [Option<f32>; PassKind::ALL.len()],
}

impl FrameTimings {
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Pair `ticks[2k]`/`ticks[2k + 1]` with pass `k`. Pairs that are missing
    /// or run backwards stay unavailable.
    pub fn from_ticks(ticks: &[u64], period_ns: f32) -> Self {
        let mut out = Self::default();
        for (pass, pair) in PassKind::ALL.iter().zip(ticks.chunks_exact(2)) {
            if let [start, end] = *pair {
                if end >= start && start != 0 {
                    out.set(*pass, Some((end - start) as f32 * period_ns / 1_000_000.0));
                }
            }
        }
        out
    }

    pub fn get(&self, pass: PassKind) -> Option<f32> {
        self.passes[pass.index()]
    }

    pub fn set(&mut self, pass: PassKind, millis: Option<f32>) {
        self.passes[pass.index()] = millis;
    }

    pub fn iter(&self) -> impl Iterator<Item = (PassKind, Option<f32>)> + '_ {
        PassKind::ALL.iter().map(move |p| (*p, self.get(*p)))
    }

    pub fn is_available(&self) -> bool {
        self.passes.iter().any(Option::is_some)
    }
}
