//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

/// Poll interval while waiting on a condition.
pub const TICK_WAIT: Duration = Duration::from_millis(10);

/// Polls before a wait gives up (5 seconds at the default tick).
pub const MAX_WAIT_CYCLES: usize = 500;

/// Poll `condition` until it holds or the wait budget runs out.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..MAX_WAIT_CYCLES {
        if condition() {
            return true;
        }
        tokio::time::sleep(TICK_WAIT).await;
    }
    condition()
}
