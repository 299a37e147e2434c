use std::time::Duration;

use ride_core::protocol::ServerEvent;
use ride_core::registry::Outbound;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Waits for the next event frame, skipping nothing. Panics on timeout or close.
pub async fn next_event(rx: &mut UnboundedReceiver<Outbound>) -> ServerEvent {
    match timeout(EVENT_TIMEOUT, rx.recv()).await {
        Ok(Some(Outbound::Event(event))) => event,
        Ok(Some(Outbound::Close { code, reason })) => {
            panic!("channel closed with {code}: {reason}")
        }
        Ok(None) => panic!("channel dropped"),
        Err(_) => panic!("no event within {EVENT_TIMEOUT:?}"),
    }
}

/// Waits for the next frame of any kind.
pub async fn next_frame(rx: &mut UnboundedReceiver<Outbound>) -> Outbound {
    timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("frame before timeout")
        .expect("channel open")
}

/// Asserts nothing arrives within a short grace period.
pub async fn assert_quiet(rx: &mut UnboundedReceiver<Outbound>) {
    if let Ok(Some(frame)) = timeout(Duration::from_millis(100), rx.recv()).await {
        panic!("unexpected frame {frame:?}");
    }
}
