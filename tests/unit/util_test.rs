//! Tests for utility functions

use std::time::{SystemTime, UNIX_EPOCH};
use taskgate::util::{init_tracing, now_secs};

#[test]
fn test_now_secs_tracks_system_clock() {
    let before = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    let secs = now_secs();
    let after = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    assert!(before <= secs && secs <= after);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}
