//! Tests for processing contexts.

use super::*;
use crate::errors::ProcessorError;
use crate::state::SharedState;
use pretty_assertions::assert_eq;
use serde_json::json;

fn context(id: &str) -> ProcessingContext {
    ProcessingContext::new(Item::with_id(id, Payload::new()), SharedState::new())
}

#[test]
fn test_new_context_is_pending() {
    let ctx = context("1");
    assert_eq!(ctx.result, ProcessingResult::Pending);
    assert!(ctx.error.is_none());
    assert!(ctx.history.is_empty());
    assert_eq!(ctx.item_id(), "1");
}

#[test]
fn test_mark_failure_records_error() {
    let mut ctx = context("1");
    ctx.mark_failure(ProcessorError::internal("p", "boom"));

    assert!(ctx.is_failure());
    assert_eq!(ctx.error.as_ref().map(|e| e.message.as_str()), Some("boom"));
}

#[test]
fn test_mark_success_clears_error() {
    let mut ctx = context("1");
    ctx.mark_failure(ProcessorError::internal("p", "boom"));
    ctx.mark_success();

    assert!(ctx.is_success());
    assert!(ctx.error.is_none());
}

#[test]
fn test_mark_skipped() {
    let mut ctx = context("1");
    ctx.mark_skipped("duplicate");

    assert!(ctx.is_skipped());
    assert_eq!(ctx.skip_reason.as_deref(), Some("duplicate"));
}

#[test]
fn test_history_order() {
    let mut ctx = context("1");
    ctx.record("a");
    ctx.record("b");
    assert_eq!(ctx.history, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_contexts_share_state() {
    let state = SharedState::new();
    let a = ProcessingContext::new(Item::with_id("a", Payload::new()), state.clone());
    let b = ProcessingContext::new(Item::with_id("b", Payload::new()), state);

    a.state().set("seen", json!(["a"]));
    assert_eq!(b.state().get("seen"), Some(json!(["a"])));
    assert!(a.state().same_instance(b.state()));
}
