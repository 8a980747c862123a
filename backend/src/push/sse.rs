use actix_web::web::Bytes;
use futures::Stream;
use shared::PushEvent;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, Interval, interval_at};

use super::registry::SessionRegistry;

pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
const KEEP_ALIVE_FRAME: &[u8] = b": keep-alive\n\n";

/// Body of `GET /api/events`. Ends when the registry drops the connection
/// and unregisters itself when the client goes away.
pub struct PushStream {
    receiver: UnboundedReceiver<PushEvent>,
    heartbeat: Interval,
    registry: SessionRegistry,
    session_id: String,
    connection_id: u64,
}

impl PushStream {
    pub(crate) fn new(
        receiver: UnboundedReceiver<PushEvent>,
        registry: SessionRegistry,
        session_id: String,
        connection_id: u64,
    ) -> Self {
        Self {
            receiver,
            heartbeat: interval_at(Instant::now() + KEEP_ALIVE_INTERVAL, KEEP_ALIVE_INTERVAL),
            registry,
            session_id,
            connection_id,
        }
    }
}

pub fn encode_frame(event: &PushEvent) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(event)?;
    Ok(Bytes::from(format!("data: {}\n\n", json)))
}

impl Stream for PushStream {
    type Item = Result<Bytes, actix_web::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                let frame =
                    encode_frame(&event).map_err(actix_web::error::ErrorInternalServerError);
                return Poll::Ready(Some(frame));
            }
            Poll::Ready(None) => return Poll::Ready(None),
            Poll::Pending => {}
        }

        match self.heartbeat.poll_tick(cx) {
            Poll::Ready(_) => Poll::Ready(Some(Ok(Bytes::from_static(KEEP_ALIVE_FRAME)))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for PushStream {
    fn drop(&mut self) {
        self.registry
            .disconnect(&self.session_id, self.connection_id);
    }
}
