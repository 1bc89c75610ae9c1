use actix::prelude::*;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::errors::NotificationKind;

const RETENTION: Duration = Duration::from_secs(300);

// --- Messages ---

/// Round trip of one remote generation call, in milliseconds.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ReportGenerationLatency(pub f64);

/// Fallback content was shown instead of generated content.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ReportFallback(pub NotificationKind);

#[derive(Message)]
#[rtype(result = "SystemHealth")]
pub struct GetSystemHealth;

// --- Data Structures ---

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct LatencyMetrics {
    pub p95_ms: f64,
    pub mean_ms: f64,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct TimeWindowMetrics {
    pub generation: LatencyMetrics,
    pub generated: usize,
    pub quota_fallbacks: usize,
    pub failure_fallbacks: usize,
}

#[derive(Message, Serialize, Clone, Debug)]
#[rtype(result = "()")]
pub struct SystemHealth {
    pub thirty_seconds: TimeWindowMetrics,
    pub one_minute: TimeWindowMetrics,
    pub five_minutes: TimeWindowMetrics,
}

struct MetricDataPoint<T> {
    timestamp: Instant,
    value: T,
}

// --- Actor ---

#[derive(Default)]
pub struct HealthActor {
    latency_data: VecDeque<MetricDataPoint<f64>>,
    fallback_data: VecDeque<MetricDataPoint<NotificationKind>>,
}

impl HealthActor {
    pub fn new() -> Self {
        Self::default()
    }

    fn prune(&mut self, now: Instant) {
        while self
            .latency_data
            .front()
            .is_some_and(|dp| now.duration_since(dp.timestamp) > RETENTION)
        {
            self.latency_data.pop_front();
        }
        while self
            .fallback_data
            .front()
            .is_some_and(|dp| now.duration_since(dp.timestamp) > RETENTION)
        {
            self.fallback_data.pop_front();
        }
    }

    fn calculate_window_metrics(&self, now: Instant, window: Duration) -> TimeWindowMetrics {
        let mut values: Vec<f64> = self
            .latency_data
            .iter()
            .filter(|dp| now.duration_since(dp.timestamp) < window)
            .map(|dp| dp.value)
            .collect();

        let generation = if values.is_empty() {
            LatencyMetrics::default()
        } else {
            values.sort_by(|a, b| a.total_cmp(b));
            let p95_index = (values.len() as f64 * 0.95).floor() as usize;
            LatencyMetrics {
                p95_ms: values[p95_index.min(values.len() - 1)],
                mean_ms: values.iter().sum::<f64>() / values.len() as f64,
            }
        };

        let recent_fallbacks: Vec<NotificationKind> = self
            .fallback_data
            .iter()
            .filter(|dp| now.duration_since(dp.timestamp) < window)
            .map(|dp| dp.value)
            .collect();
        let quota_fallbacks = recent_fallbacks
            .iter()
            .filter(|kind| **kind == NotificationKind::QuotaExhausted)
            .count();
        let failure_fallbacks = recent_fallbacks.len() - quota_fallbacks;

        TimeWindowMetrics {
            generated: values.len(),
            generation,
            quota_fallbacks,
            failure_fallbacks,
        }
    }
}

impl Actor for HealthActor {
    type Context = Context<Self>;
}

// --- Handlers ---

impl Handler<ReportGenerationLatency> for HealthActor {
    type Result = ();
    fn handle(&mut self, msg: ReportGenerationLatency, _ctx: &mut Context<Self>) {
        let now = Instant::now();
        self.prune(now);
        self.latency_data.push_back(MetricDataPoint { timestamp: now, value: msg.0 });
    }
}

impl Handler<ReportFallback> for HealthActor {
    type Result = ();
    fn handle(&mut self, msg: ReportFallback, _ctx: &mut Context<Self>) {
        let now = Instant::now();
        self.prune(now);
        self.fallback_data.push_back(MetricDataPoint { timestamp: now, value: msg.0 });
    }
}

impl Handler<GetSystemHealth> for HealthActor {
    type Result = MessageResult<GetSystemHealth>;

    fn handle(&mut self, _msg: GetSystemHealth, _ctx: &mut Context<Self>) -> Self::Result {
        let now = Instant::now();
        MessageResult(SystemHealth {
            thirty_seconds: self.calculate_window_metrics(now, Duration::from_secs(30)),
            one_minute: self.calculate_window_metrics(now, Duration::from_secs(60)),
            five_minutes: self.calculate_window_metrics(now, RETENTION),
        })
    }
}
