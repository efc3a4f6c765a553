//! Testing utilities for chainflow pipelines.
//!
//! This module provides:
//! - Mock processors and observers with call tracking
//! - Item fixtures
//! - Assertions on processing contexts

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_failed, assert_failed_at, assert_history, assert_item_ids, assert_skipped,
    assert_success,
};
pub use fixtures::{numbered_items, sample_item, ItemFixture};
pub use mocks::{
    CountingProcessor, FailingObserver, FailingProcessor, FlakyProcessor, PanickingObserver,
    PanickingProcessor, RecordingProcessor, SkippingProcessor,
};
