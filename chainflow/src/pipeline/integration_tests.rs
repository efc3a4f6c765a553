//! End-to-end tests for pipeline execution.

#[cfg(test)]
mod tests {
    use crate::commands::{CommandHistory, ExecutePipelineCommand};
    use crate::core::{EventType, Item, Payload, ProcessingResult, Step};
    use crate::decorators::{CacheConfig, EvictionPolicy, ProcessorExt, RetryConfig};
    use crate::errors::{ChainflowError, HistoryError, ProcessorErrorKind};
    use crate::events::{CollectingObserver, EventBus, MetricsCollector, Observer};
    use crate::io::{MemorySink, MemorySource, Sink, Source};
    use crate::pipeline::{BatchSummary, PipelineBuilder, PipelineConfig};
    use crate::processors::{
        CounterProcessor, DeduplicationProcessor, FnProcessor, TransformProcessor,
        UpperCaseTransform,
    };
    use crate::testing::{
        assert_failed_at, assert_history, assert_item_ids, assert_skipped, assert_success,
        numbered_items, CountingProcessor, FailingObserver, FailingProcessor, FlakyProcessor,
        PanickingObserver, PanickingProcessor, RecordingProcessor,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn keyed_item(id: &str, key: i64) -> Item {
        let mut payload = Payload::new();
        payload.insert("key".to_string(), json!(key));
        Item::with_id(id, payload)
    }

    fn item_ids(ids: &[&str]) -> Vec<Item> {
        ids.iter().map(|id| Item::with_id(*id, Payload::new())).collect()
    }

    #[test]
    fn test_results_preserve_input_order() {
        let pipeline = PipelineBuilder::new("order")
            .processor(FnProcessor::new("skip-odd", |ctx| {
                let value = ctx.item.payload_value("value").and_then(serde_json::Value::as_u64);
                Ok(match value {
                    Some(v) if v % 2 == 1 => Step::skip("odd"),
                    _ => Step::Continue,
                })
            }))
            .build()
            .unwrap();

        let contexts = pipeline.execute(numbered_items(5));

        assert_item_ids(&contexts, &["item-0", "item-1", "item-2", "item-3", "item-4"]);
        let results: Vec<_> = contexts.iter().map(|c| c.result).collect();
        assert_eq!(
            results,
            vec![
                ProcessingResult::Success,
                ProcessingResult::Skipped,
                ProcessingResult::Success,
                ProcessingResult::Skipped,
                ProcessingResult::Success,
            ]
        );
    }

    #[test]
    fn test_every_processor_sees_item_in_chain_order() {
        let first = Arc::new(RecordingProcessor::new("first"));
        let second = Arc::new(RecordingProcessor::new("second"));
        let pipeline = PipelineBuilder::new("chain")
            .processor(Arc::clone(&first))
            .processor(TransformProcessor::new(UpperCaseTransform))
            .processor(Arc::clone(&second))
            .build()
            .unwrap();

        let mut payload = Payload::new();
        payload.insert("name".to_string(), json!("ada"));
        let ctx = pipeline.execute_single(Item::with_id("a", payload));

        assert_success(&ctx);
        assert_history(&ctx, &["first", "uppercase", "second"]);
        assert_eq!(ctx.item.payload_value("name"), Some(&json!("ADA")));
        assert_eq!(first.seen(), vec!["a"]);
        assert_eq!(second.seen(), vec!["a"]);
    }

    #[test]
    fn test_failure_stops_chain_but_not_batch() {
        let after = Arc::new(CountingProcessor::new("after"));
        let pipeline = PipelineBuilder::new("failing")
            .processor(FnProcessor::new("reject-b", |ctx| {
                if ctx.item_id() == "b" {
                    Err(crate::errors::ProcessorError::validation("reject-b", "no b"))
                } else {
                    Ok(Step::Continue)
                }
            }))
            .processor(Arc::clone(&after))
            .build()
            .unwrap();

        let contexts = pipeline.execute(item_ids(&["a", "b", "c"]));

        assert_success(&contexts[0]);
        assert_failed_at(&contexts[1], "reject-b");
        assert_eq!(
            contexts[1].error.as_ref().map(|e| e.kind),
            Some(ProcessorErrorKind::Validation)
        );
        assert_success(&contexts[2]);
        assert_eq!(after.call_count(), 2);
        assert_eq!(
            BatchSummary::from_contexts(&contexts),
            BatchSummary {
                successful: 2,
                failed: 1,
                skipped: 0
            }
        );
    }

    #[test]
    fn test_state_persists_across_runs_until_cleared() {
        let pipeline = PipelineBuilder::new("stateful")
            .processor(CounterProcessor::new("count"))
            .build()
            .unwrap();

        pipeline.execute(numbered_items(3));
        pipeline.execute(numbered_items(2));
        assert_eq!(pipeline.state().get("count"), Some(json!(5)));

        pipeline.clear_state();
        pipeline.execute(numbered_items(1));
        assert_eq!(pipeline.state().get("count"), Some(json!(1)));
    }

    #[test]
    fn test_deduplication_across_runs() {
        let pipeline = PipelineBuilder::new("dedup")
            .processor(DeduplicationProcessor::default())
            .processor(CounterProcessor::default())
            .build()
            .unwrap();

        let first = pipeline.execute(item_ids(&["a", "b", "a"]));
        assert_success(&first[0]);
        assert_success(&first[1]);
        assert_skipped(&first[2], Some("duplicate"));

        let second = pipeline.execute(item_ids(&["b", "c"]));
        assert_skipped(&second[0], Some("duplicate"));
        assert_success(&second[1]);

        assert_eq!(
            pipeline.state().get(DeduplicationProcessor::DEFAULT_KEY),
            Some(json!(["a", "b", "c"]))
        );
        assert_eq!(
            pipeline.state().get(CounterProcessor::DEFAULT_KEY),
            Some(json!(3))
        );
    }

    #[test]
    fn test_cache_refresh_on_hit_eviction() {
        let inner = Arc::new(CountingProcessor::new("work"));
        let cache = Arc::new(
            Arc::clone(&inner)
                .cached(CacheConfig::new().with_capacity(3))
                .with_key_fn(|item| {
                    item.payload_value("key").map(ToString::to_string).unwrap_or_default()
                }),
        );
        let pipeline = PipelineBuilder::new("cached")
            .processor(Arc::clone(&cache))
            .build()
            .unwrap();

        let items: Vec<_> = [10, 20, 30, 10, 40]
            .iter()
            .enumerate()
            .map(|(i, key)| keyed_item(&format!("i{i}"), *key))
            .collect();
        let contexts = pipeline.execute(items);

        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["10", "30", "40"]);
        assert_eq!(inner.call_count(), 4);
        assert_eq!(contexts[3].item.id, "i3");
        assert_eq!(contexts[3].item.metadata_value("cache_hit"), Some(&json!(true)));
        assert_eq!(contexts[0].item.metadata_value("cache_hit"), Some(&json!(false)));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 4);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 3);
    }

    #[test]
    fn test_cache_insertion_order_eviction() {
        let cache = Arc::new(
            CountingProcessor::new("work")
                .cached(
                    CacheConfig::new()
                        .with_capacity(3)
                        .with_eviction(EvictionPolicy::InsertionOrder),
                )
                .with_key_fn(|item| {
                    item.payload_value("key").map(ToString::to_string).unwrap_or_default()
                }),
        );
        let pipeline = PipelineBuilder::new("cached")
            .processor(Arc::clone(&cache))
            .build()
            .unwrap();

        let items: Vec<_> = [10, 20, 30, 10, 40]
            .iter()
            .enumerate()
            .map(|(i, key)| keyed_item(&format!("i{i}"), *key))
            .collect();
        pipeline.execute(items);

        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["20", "30", "40"]);
    }

    #[test]
    fn test_retry_makes_max_retries_plus_one_attempts() {
        let flaky = Arc::new(FlakyProcessor::new("flaky", usize::MAX));
        let pipeline = PipelineBuilder::new("retrying")
            .processor(
                Arc::clone(&flaky).retrying(
                    RetryConfig::new()
                        .with_max_retries(3)
                        .with_initial_delay_ms(0),
                ),
            )
            .build()
            .unwrap();

        let ctx = pipeline.execute_single(Item::with_id("x", Payload::new()));

        assert_eq!(flaky.call_count(), 4);
        assert_failed_at(&ctx, "retry(flaky)");
        assert_eq!(ctx.item.metadata_value("retry_count"), Some(&json!(3)));
        assert!(ctx.error.as_ref().is_some_and(|e| e.message == "attempt 4 failed"));
    }

    #[test]
    fn test_retry_recovers_from_transient_failures() {
        let flaky = Arc::new(FlakyProcessor::new("flaky", 2));
        let pipeline = PipelineBuilder::new("retrying")
            .processor(Arc::clone(&flaky).retrying(RetryConfig::new().with_initial_delay_ms(1)))
            .build()
            .unwrap();

        let ctx = pipeline.execute_single(Item::with_id("x", Payload::new()));

        assert_success(&ctx);
        assert_eq!(flaky.call_count(), 3);
        assert_eq!(ctx.item.metadata_value("retry_count"), Some(&json!(2)));
    }

    #[test]
    fn test_event_sequence_for_mixed_batch() {
        let bus = Arc::new(EventBus::new());
        let collector = Arc::new(CollectingObserver::new());
        bus.subscribe(collector.clone());

        let pipeline = PipelineBuilder::new("events")
            .processor(FnProcessor::new("route", |ctx| match ctx.item_id() {
                "skip" => Ok(Step::skip("not wanted")),
                "fail" => Err(crate::errors::ProcessorError::internal("route", "boom")),
                _ => Ok(Step::Continue),
            }))
            .with_event_bus(Arc::clone(&bus))
            .build()
            .unwrap();

        pipeline.execute(item_ids(&["ok", "skip", "fail"]));

        assert_eq!(
            collector.event_types(),
            vec![
                EventType::PipelineStarted,
                EventType::ItemStarted,
                EventType::ItemCompleted,
                EventType::ItemStarted,
                EventType::ItemCompleted,
                EventType::ItemStarted,
                EventType::ItemFailed,
                EventType::PipelineFailed,
            ]
        );

        let events = collector.events();
        assert_eq!(events[4].metadata_value("result"), Some(&json!("skipped")));
        assert_eq!(events[4].metadata_value("skip_reason"), Some(&json!("not wanted")));
        assert_eq!(events[6].processor_name.as_deref(), Some("route"));
        let finished = &events[7];
        assert_eq!(finished.metadata_value("total"), Some(&json!(3)));
        assert_eq!(finished.metadata_value("failed"), Some(&json!(1)));
        assert_eq!(finished.metadata_value("skipped"), Some(&json!(1)));
    }

    #[test]
    fn test_item_events_can_be_disabled() {
        let bus = Arc::new(EventBus::new());
        let collector = Arc::new(CollectingObserver::new());
        bus.subscribe(collector.clone());

        let pipeline = PipelineBuilder::new("quiet")
            .processor(CountingProcessor::new("work"))
            .with_event_bus(bus)
            .with_config(PipelineConfig::default().with_item_events(false))
            .build()
            .unwrap();
        pipeline.execute(numbered_items(3));

        assert_eq!(
            collector.event_types(),
            vec![EventType::PipelineStarted, EventType::PipelineCompleted]
        );
    }

    #[test]
    fn test_faulty_observers_do_not_affect_processing() {
        let bus = Arc::new(EventBus::new());
        let failing = Arc::new(FailingObserver::new());
        let collector = Arc::new(CollectingObserver::new());
        bus.subscribe(Arc::new(PanickingObserver));
        bus.subscribe(failing.clone());
        bus.subscribe(collector.clone());

        let pipeline = PipelineBuilder::new("isolated")
            .processor(CountingProcessor::new("work"))
            .with_event_bus(bus)
            .build()
            .unwrap();
        let contexts = pipeline.execute(numbered_items(2));

        assert!(contexts.iter().all(|c| c.is_success()));
        assert_eq!(collector.len(), 6);
        assert_eq!(failing.call_count(), 6);
    }

    #[test]
    fn test_panicking_processor_becomes_failure() {
        let pipeline = PipelineBuilder::new("panics")
            .processor(PanickingProcessor::new("bomb"))
            .build()
            .unwrap();

        let contexts = pipeline.execute(item_ids(&["a", "b"]));

        for ctx in &contexts {
            assert_failed_at(ctx, "bomb");
            let err = ctx.error.as_ref().unwrap();
            assert_eq!(err.kind, ProcessorErrorKind::Internal);
            assert!(err.message.starts_with("panicked: "));
        }
    }

    #[test]
    fn test_metrics_collector_aggregates_runs() {
        let bus = Arc::new(EventBus::new());
        let metrics = Arc::new(MetricsCollector::new());
        bus.subscribe(metrics.clone());

        let pipeline = PipelineBuilder::new("measured")
            .processor(DeduplicationProcessor::default())
            .processor(FailingProcessor::new("explode", "boom"))
            .with_event_bus(Arc::clone(&bus))
            .build()
            .unwrap();
        pipeline.execute(item_ids(&["a", "a"]));
        pipeline.execute(item_ids(&["b"]));

        let m = metrics.get_metrics("measured").unwrap();
        assert_eq!(m.runs, 2);
        assert_eq!(m.total_items, 3);
        assert_eq!(m.failed_items, 2);
        assert_eq!(m.skipped_items, 1);
        assert_eq!(m.error_counts.get("explode"), Some(&2));
        assert!(!m.is_running());
        assert!(m.last_ended_at >= m.first_started_at);
    }

    #[test]
    fn test_undo_redo_through_history() {
        let pipeline = Arc::new(
            PipelineBuilder::new("undoable")
                .processor(CounterProcessor::new("n"))
                .build()
                .unwrap(),
        );
        let mut history = CommandHistory::new();

        let results = history
            .execute(Box::new(ExecutePipelineCommand::new(
                Arc::clone(&pipeline),
                numbered_items(5),
            )))
            .unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(pipeline.state().get("n"), Some(json!(5)));

        history.undo().unwrap();
        assert_eq!(pipeline.state().get("n"), None);
        assert!(matches!(
            history.undo(),
            Err(ChainflowError::History(HistoryError::NothingToUndo))
        ));

        history.redo().unwrap();
        assert_eq!(pipeline.state().get("n"), Some(json!(5)));
        assert!(matches!(
            history.redo(),
            Err(ChainflowError::History(HistoryError::NothingToRedo))
        ));
    }

    #[test]
    fn test_source_to_sink_closes_both() {
        let pipeline = PipelineBuilder::new("io")
            .processor(CounterProcessor::default())
            .build()
            .unwrap();
        let mut source = MemorySource::new(numbered_items(3));
        let mut sink = MemorySink::new();

        let contexts = pipeline.execute_source_to_sink(&mut source, &mut sink).unwrap();

        assert_eq!(contexts.len(), 3);
        assert!(source.is_closed());
        assert!(sink.is_closed());
        assert_item_ids(sink.results(), &["item-0", "item-1", "item-2"]);

        // Closing twice is harmless.
        source.close().unwrap();
        sink.close().unwrap();
    }

    #[test]
    fn test_observer_can_be_unsubscribed_mid_stream() {
        let bus = Arc::new(EventBus::new());
        let collector = Arc::new(CollectingObserver::new());
        let handle: Arc<dyn Observer> = collector.clone();
        bus.subscribe(Arc::clone(&handle));

        let pipeline = PipelineBuilder::new("unsub")
            .processor(CountingProcessor::new("work"))
            .with_event_bus(Arc::clone(&bus))
            .build()
            .unwrap();
        pipeline.execute(numbered_items(1));
        assert!(bus.unsubscribe(&handle));
        pipeline.execute(numbered_items(1));

        assert_eq!(collector.len(), 4);
    }

    #[test]
    fn test_shared_pipeline_across_threads() {
        const THREADS: usize = 4;
        const ITEMS: usize = 25;

        let bus = Arc::new(EventBus::new());
        let collector = Arc::new(CollectingObserver::new());
        bus.subscribe(collector.clone());

        let pipeline = Arc::new(
            PipelineBuilder::new("threaded")
                .processor(CounterProcessor::default())
                .with_event_bus(Arc::clone(&bus))
                .build()
                .unwrap(),
        );

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                let pipeline = Arc::clone(&pipeline);
                scope.spawn(move || {
                    let contexts = pipeline.execute(numbered_items(ITEMS));
                    assert_eq!(contexts.len(), ITEMS);
                    assert!(contexts.iter().all(|ctx| ctx.is_success()));
                });
            }
        });

        assert_eq!(
            pipeline.state().get(CounterProcessor::DEFAULT_KEY),
            Some(json!(THREADS * ITEMS))
        );
        assert_eq!(collector.len(), (2 + 2 * ITEMS) * THREADS);
        assert_eq!(collector.events_of_type(EventType::PipelineStarted).len(), THREADS);
        assert_eq!(collector.events_of_type(EventType::PipelineCompleted).len(), THREADS);
        assert_eq!(
            collector.events_of_type(EventType::ItemCompleted).len(),
            THREADS * ITEMS
        );
    }
}
