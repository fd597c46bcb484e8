// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for the submission path.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome label for a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    Denied,
    Error,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::Error => "error",
        }
    }
}

/// Service metrics backed by an owned registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    decisions: IntCounterVec,
    records_cleaned: IntCounter,
    posts_created: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let decisions = IntCounterVec::new(
            Opts::new(
                "ghostblog_rate_limit_decisions_total",
                "Rate limit checks on post submission, by outcome",
            ),
            &["outcome"],
        )?;
        let records_cleaned = IntCounter::new(
            "ghostblog_rate_limit_records_cleaned_total",
            "Expired rate limit records removed by the cleanup task",
        )?;
        let posts_created =
            IntCounter::new("ghostblog_posts_created_total", "Blog posts accepted")?;

        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(records_cleaned.clone()))?;
        registry.register(Box::new(posts_created.clone()))?;

        Ok(Self {
            registry,
            decisions,
            records_cleaned,
            posts_created,
        })
    }

    pub fn record_decision(&self, outcome: Outcome) {
        self.decisions.with_label_values(&[outcome.label()]).inc();
    }

    pub fn record_cleanup(&self, removed: u64) {
        self.records_cleaned.inc_by(removed);
    }

    pub fn record_post_created(&self) {
        self.posts_created.inc();
    }

    pub fn decisions(&self, outcome: Outcome) -> u64 {
        self.decisions.with_label_values(&[outcome.label()]).get()
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
