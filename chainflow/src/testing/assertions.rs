//! Assertions on processing contexts.

use crate::core::{ProcessingContext, ProcessingResult};

/// Asserts that the context finished successfully.
pub fn assert_success(ctx: &ProcessingContext) {
    assert!(
        ctx.is_success(),
        "Expected success for '{}', got {} (error: {:?}, skip: {:?})",
        ctx.item_id(),
        ctx.result,
        ctx.error,
        ctx.skip_reason
    );
}

/// Asserts that the context failed.
pub fn assert_failed(ctx: &ProcessingContext) {
    assert!(
        ctx.is_failure() && ctx.error.is_some(),
        "Expected failure for '{}', got {}",
        ctx.item_id(),
        ctx.result
    );
}

/// Asserts that the context failed in the named processor.
pub fn assert_failed_at(ctx: &ProcessingContext, processor: &str) {
    assert_failed(ctx);
    assert_eq!(
        ctx.history.last().map(String::as_str),
        Some(processor),
        "Expected '{}' to fail in '{processor}', history: {:?}",
        ctx.item_id(),
        ctx.history
    );
}

/// Asserts that the context was skipped, optionally with a reason substring.
pub fn assert_skipped(ctx: &ProcessingContext, reason_contains: Option<&str>) {
    assert_eq!(
        ctx.result,
        ProcessingResult::Skipped,
        "Expected '{}' to be skipped",
        ctx.item_id()
    );
    if let Some(expected) = reason_contains {
        let reason = ctx.skip_reason.as_deref().unwrap_or_default();
        assert!(
            reason.contains(expected),
            "Expected skip reason containing '{expected}', got '{reason}'"
        );
    }
}

/// Asserts the exact list of processors the context passed through.
pub fn assert_history(ctx: &ProcessingContext, expected: &[&str]) {
    let actual: Vec<&str> = ctx.history.iter().map(String::as_str).collect();
    assert_eq!(actual, expected, "Unexpected history for '{}'", ctx.item_id());
}

/// Asserts the item ids of a batch result, in order.
pub fn assert_item_ids(contexts: &[ProcessingContext], expected: &[&str]) {
    let actual: Vec<&str> = contexts.iter().map(ProcessingContext::item_id).collect();
    assert_eq!(actual, expected, "Unexpected result order");
}
