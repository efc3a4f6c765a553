//! Utility functions for id generation and timestamp handling.

mod timestamps;
mod uuid_utils;

pub use timestamps::{duration_ms, iso_timestamp, now_utc, Timestamp};
pub use uuid_utils::{generate_item_id, generate_uuid, generate_uuid_v7};
