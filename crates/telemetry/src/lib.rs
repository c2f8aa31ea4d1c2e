//! Token, cache, and latency accounting for remote model calls.
//!
//! The meter is owned by the orchestrator and mutated from its single
//! control flow, so unlike a cross-thread telemetry engine it needs no
//! interior locking. It keeps monotonically increasing totals alongside a
//! snapshot of the most recent call.

use codevet_core::provider::Usage;
use serde::Serialize;
use std::time::Duration;

/// Accumulated counters since the meter was created.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Totals {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_creation_tokens: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Counters for the most recent call.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CallStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_creation_tokens: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Accumulates per-call usage into running totals and retains the latest
/// call's values separately.
#[derive(Debug, Default, Clone)]
pub struct UsageMeter {
    total: Totals,
    current: CallStats,
}

impl UsageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed remote call.
    pub fn record(&mut self, usage: &Usage, elapsed: Duration) {
        self.total.requests += 1;
        self.total.input_tokens += usage.input_tokens;
        self.total.output_tokens += usage.output_tokens;
        self.total.cache_read_tokens += usage.cache_read_tokens;
        self.total.cache_creation_tokens += usage.cache_creation_tokens;
        self.total.elapsed += elapsed;

        self.current = CallStats {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cache_read_tokens: usage.cache_read_tokens,
            cache_creation_tokens: usage.cache_creation_tokens,
            elapsed,
        };
    }

    pub fn requests(&self) -> u64 {
        self.total.requests
    }

    pub fn total(&self) -> &Totals {
        &self.total
    }

    pub fn current(&self) -> &CallStats {
        &self.current
    }

    /// Cumulative cache-hit rate: cache-read tokens over all prompt
    /// tokens, as a percentage.
    pub fn overall_cache_hit_rate(&self) -> f64 {
        hit_rate(self.total.cache_read_tokens, self.total.input_tokens)
    }

    /// Cache-hit rate for the most recent call, as a percentage.
    pub fn current_cache_hit_rate(&self) -> f64 {
        hit_rate(self.current.cache_read_tokens, self.current.input_tokens)
    }

    /// Formatted performance report shown after each turn.
    pub fn report(&self) -> String {
        let t = &self.total;
        let c = &self.current;
        let avg = |value: u64| {
            if t.requests == 0 {
                0.0
            } else {
                value as f64 / t.requests as f64
            }
        };
        let avg_time = if t.requests == 0 {
            0.0
        } else {
            t.elapsed.as_secs_f64() / t.requests as f64
        };

        format!(
            "\
Cache Performance Report:
-------------------------
Current Interaction:
  Input Tokens: {}
  Output Tokens: {}
  Cache Read Tokens: {}
  Cache Write Tokens: {}
  Current Cache Hit Rate: {:.1}%
  Response Time: {:.2} seconds

Overall Metrics:
  Total Requests: {}
  Total Input Tokens: {}
  Total Output Tokens: {}
  Total Cache Read Tokens: {}
  Total Cache Write Tokens: {}
  Overall Cache Hit Rate: {:.1}%
  Total Time Taken: {:.2} seconds

Average per Request:
  Avg Input Tokens: {:.2}
  Avg Output Tokens: {:.2}
  Avg Response Time: {:.2} seconds",
            c.input_tokens,
            c.output_tokens,
            c.cache_read_tokens,
            c.cache_creation_tokens,
            self.current_cache_hit_rate(),
            c.elapsed.as_secs_f64(),
            t.requests,
            t.input_tokens,
            t.output_tokens,
            t.cache_read_tokens,
            t.cache_creation_tokens,
            self.overall_cache_hit_rate(),
            t.elapsed.as_secs_f64(),
            avg(t.input_tokens),
            avg(t.output_tokens),
            avg_time,
        )
    }
}

fn hit_rate(cache_read: u64, input: u64) -> f64 {
    let denominator = cache_read + input;
    if denominator == 0 {
        0.0
    } else {
        cache_read as f64 / denominator as f64 * 100.0
    }
}
