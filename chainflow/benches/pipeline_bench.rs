//! Benchmarks for pipeline execution.

use chainflow::prelude::*;
use chainflow::processors::UpperCaseTransform;
use chainflow::testing::numbered_items;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn pipeline_benchmark(c: &mut Criterion) {
    let plain = PipelineBuilder::new("plain")
        .processor(TransformProcessor::new(UpperCaseTransform))
        .processor(CounterProcessor::default())
        .build()
        .unwrap();

    c.bench_function("execute_1000_plain", |b| {
        b.iter_batched(
            || numbered_items(1000),
            |items| black_box(plain.execute(items)),
            BatchSize::SmallInput,
        );
    });

    let decorated = PipelineBuilder::new("decorated")
        .processor(
            TransformProcessor::new(UpperCaseTransform)
                .cached(CacheConfig::new().with_capacity(100))
                .timed(),
        )
        .processor(DeduplicationProcessor::default())
        .build()
        .unwrap();

    c.bench_function("execute_1000_cached_dedup", |b| {
        b.iter_batched(
            || {
                decorated.clear_state();
                numbered_items(1000)
            },
            |items| black_box(decorated.execute(items)),
            BatchSize::SmallInput,
        );
    });
}

fn event_bench(c: &mut Criterion) {
    let bus = std::sync::Arc::new(EventBus::new());
    bus.subscribe(std::sync::Arc::new(MetricsCollector::new()));
    let pipeline = PipelineBuilder::new("observed")
        .processor(CounterProcessor::default())
        .with_event_bus(bus)
        .build()
        .unwrap();

    c.bench_function("execute_1000_with_metrics", |b| {
        b.iter_batched(
            || numbered_items(1000),
            |items| black_box(pipeline.execute(items)),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, pipeline_benchmark, event_bench);
criterion_main!(benches);
