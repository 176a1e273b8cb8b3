// ABOUTME: Per-request cancellation for outbound calls
// ABOUTME: Dropping the handler future (client disconnect) cancels the token via its guard

use tokio_util::sync::{CancellationToken, DropGuard};

/// Token for this request's outbound calls plus the guard that cancels it on drop.
/// Hold the guard for the lifetime of the handler.
pub fn request_cancellation() -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (token, guard)
}
