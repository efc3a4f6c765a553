//! Per-pipeline metrics aggregation.

use super::Observer;
use crate::core::{EventType, PipelineEvent};
use crate::errors::ObserverError;
use crate::utils::Timestamp;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Statistics accumulated for one pipeline id across all of its runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetrics {
    /// The pipeline these metrics belong to.
    pub pipeline_id: String,
    /// Number of runs started.
    pub runs: u64,
    /// Items that finished in any way.
    pub total_items: u64,
    /// Items that succeeded.
    pub successful_items: u64,
    /// Items that failed.
    pub failed_items: u64,
    /// Items that were skipped.
    pub skipped_items: u64,
    /// Start of the first run.
    pub first_started_at: Option<Timestamp>,
    /// End of the most recent run.
    pub last_ended_at: Option<Timestamp>,
    /// Wall-clock time during which at least one run was active.
    pub busy_time: Duration,
    /// Failure counts keyed by processor name.
    pub error_counts: HashMap<String, u64>,
    #[serde(skip)]
    active_runs: u32,
    #[serde(skip)]
    active_since: Option<Timestamp>,
}

impl PipelineMetrics {
    fn new(pipeline_id: &str) -> Self {
        Self {
            pipeline_id: pipeline_id.to_string(),
            runs: 0,
            total_items: 0,
            successful_items: 0,
            failed_items: 0,
            skipped_items: 0,
            first_started_at: None,
            last_ended_at: None,
            busy_time: Duration::ZERO,
            error_counts: HashMap::new(),
            active_runs: 0,
            active_since: None,
        }
    }

    /// Fraction of finished items that succeeded.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        ratio(self.successful_items, self.total_items)
    }

    /// Fraction of finished items that failed.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        ratio(self.failed_items, self.total_items)
    }

    /// Throughput over busy time, `None` before any run has finished.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn items_per_second(&self) -> Option<f64> {
        let seconds = self.busy_time.as_secs_f64();
        (seconds > 0.0).then(|| self.total_items as f64 / seconds)
    }

    /// Returns true while a run is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active_runs > 0
    }

    fn apply(&mut self, event: &PipelineEvent) {
        match event.event_type {
            EventType::PipelineStarted => {
                self.runs += 1;
                self.first_started_at.get_or_insert(event.timestamp);
                if self.active_runs == 0 {
                    self.active_since = Some(event.timestamp);
                }
                self.active_runs += 1;
            }
            EventType::PipelineCompleted | EventType::PipelineFailed => {
                self.last_ended_at = Some(event.timestamp);
                self.active_runs = self.active_runs.saturating_sub(1);
                if self.active_runs == 0 {
                    if let Some(since) = self.active_since.take() {
                        self.busy_time += (event.timestamp - since).to_std().unwrap_or_default();
                    }
                }
            }
            EventType::ItemCompleted => {
                self.total_items += 1;
                let skipped = event
                    .metadata_value("result")
                    .and_then(serde_json::Value::as_str)
                    == Some("skipped");
                if skipped {
                    self.skipped_items += 1;
                } else {
                    self.successful_items += 1;
                }
            }
            EventType::ItemFailed => {
                self.total_items += 1;
                self.failed_items += 1;
                let processor = event.processor_name.as_deref().unwrap_or("unknown");
                *self.error_counts.entry(processor.to_string()).or_insert(0) += 1;
            }
            EventType::ItemStarted => {}
        }
    }

    /// Converts the metrics to a dictionary representation, including
    /// derived rates.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("pipeline_id".to_string(), serde_json::json!(self.pipeline_id));
        map.insert("runs".to_string(), serde_json::json!(self.runs));
        map.insert("total_items".to_string(), serde_json::json!(self.total_items));
        map.insert("successful_items".to_string(), serde_json::json!(self.successful_items));
        map.insert("failed_items".to_string(), serde_json::json!(self.failed_items));
        map.insert("skipped_items".to_string(), serde_json::json!(self.skipped_items));
        map.insert(
            "first_started_at".to_string(),
            serde_json::json!(self.first_started_at.map(|t| t.to_rfc3339())),
        );
        map.insert(
            "last_ended_at".to_string(),
            serde_json::json!(self.last_ended_at.map(|t| t.to_rfc3339())),
        );
        map.insert("busy_seconds".to_string(), serde_json::json!(self.busy_time.as_secs_f64()));
        map.insert("success_rate".to_string(), serde_json::json!(self.success_rate()));
        map.insert("error_rate".to_string(), serde_json::json!(self.error_rate()));
        map.insert("items_per_second".to_string(), serde_json::json!(self.items_per_second()));
        map.insert("error_counts".to_string(), serde_json::json!(self.error_counts));
        map
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Observer that aggregates [`PipelineMetrics`] per pipeline id.
///
/// Metrics accumulate across runs and are kept until cleared.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: DashMap<String, PipelineMetrics>,
}

impl MetricsCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the metrics for `pipeline_id`.
    #[must_use]
    pub fn get_metrics(&self, pipeline_id: &str) -> Option<PipelineMetrics> {
        self.metrics.get(pipeline_id).map(|entry| entry.value().clone())
    }

    /// Returns a copy of every pipeline's metrics.
    #[must_use]
    pub fn all_metrics(&self) -> Vec<PipelineMetrics> {
        let mut all: Vec<_> = self.metrics.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by(|a, b| a.pipeline_id.cmp(&b.pipeline_id));
        all
    }

    /// Clears metrics for one pipeline, or all of them.
    pub fn clear_metrics(&self, pipeline_id: Option<&str>) {
        match pipeline_id {
            Some(id) => {
                self.metrics.remove(id);
            }
            None => self.metrics.clear(),
        }
    }
}

impl Observer for MetricsCollector {
    fn on_event(&self, event: &PipelineEvent) -> Result<(), ObserverError> {
        self.metrics
            .entry(event.pipeline_id.clone())
            .or_insert_with(|| PipelineMetrics::new(&event.pipeline_id))
            .apply(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn run(collector: &MetricsCollector, id: &str, outcomes: &[&str]) {
        let start = PipelineEvent::pipeline_started(id, outcomes.len());
        let started_at = start.timestamp;
        collector.on_event(&start).unwrap();

        for (n, outcome) in outcomes.iter().enumerate() {
            let item = n.to_string();
            let event = match *outcome {
                "failed" => PipelineEvent::item_failed(id, &item, "validate", "bad"),
                result => PipelineEvent::item_completed(id, &item, result),
            };
            collector.on_event(&event).unwrap();
        }

        let mut end = PipelineEvent::new(EventType::PipelineCompleted, id);
        end.timestamp = started_at + ChronoDuration::seconds(2);
        collector.on_event(&end).unwrap();
    }

    #[test]
    fn test_counts_and_rates() {
        let collector = MetricsCollector::new();
        run(&collector, "orders", &["success", "success", "skipped", "failed"]);

        let metrics = collector.get_metrics("orders").unwrap();
        assert_eq!(metrics.runs, 1);
        assert_eq!(metrics.total_items, 4);
        assert_eq!(metrics.successful_items, 2);
        assert_eq!(metrics.skipped_items, 1);
        assert_eq!(metrics.failed_items, 1);
        assert_eq!(metrics.error_counts.get("validate"), Some(&1));
        assert!((metrics.success_rate() - 0.5).abs() < f64::EPSILON);
        assert!((metrics.error_rate() - 0.25).abs() < f64::EPSILON);
        assert!((metrics.items_per_second().unwrap() - 2.0).abs() < 1e-9);
        assert!(!metrics.is_running());
    }

    #[test]
    fn test_accumulates_across_runs() {
        let collector = MetricsCollector::new();
        run(&collector, "orders", &["success"]);
        run(&collector, "orders", &["success", "success"]);

        let metrics = collector.get_metrics("orders").unwrap();
        assert_eq!(metrics.runs, 2);
        assert_eq!(metrics.total_items, 3);
        assert_eq!(metrics.busy_time, Duration::from_secs(4));
    }

    #[test]
    fn test_separate_pipelines_and_clear() {
        let collector = MetricsCollector::new();
        run(&collector, "a", &["success"]);
        run(&collector, "b", &["failed"]);

        assert_eq!(collector.all_metrics().len(), 2);
        collector.clear_metrics(Some("a"));
        assert!(collector.get_metrics("a").is_none());
        assert!(collector.get_metrics("b").is_some());
        collector.clear_metrics(None);
        assert!(collector.all_metrics().is_empty());
    }

    #[test]
    fn test_empty_rates_are_zero() {
        let collector = MetricsCollector::new();
        collector
            .on_event(&PipelineEvent::pipeline_started("idle", 0))
            .unwrap();
        let metrics = collector.get_metrics("idle").unwrap();
        assert!(metrics.success_rate().abs() < f64::EPSILON);
        assert!(metrics.items_per_second().is_none());
        assert!(metrics.is_running());
    }
}
