//! Server-sent events transport for reload clients.
//!
//! Each request to the reload endpoint becomes a [`ReloadClient`] backed by a
//! small bounded channel. The client is owned by the response body stream, so
//! it is unregistered as soon as the connection goes away.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header::{self, HeaderName};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::client::{DeliveryError, ReloadClient, ReloadSink};
use crate::state::AppState;

/// Messages a client may have queued before pushes start failing.
const CLIENT_BUFFER: usize = 8;

/// Interval between keep-alive comments.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Sink feeding one client's response stream.
pub(crate) struct ChannelSink(mpsc::Sender<&'static str>);

impl ReloadSink for ChannelSink {
    fn push(&self, message: &'static str) -> Result<(), DeliveryError> {
        self.0.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Open a reload stream for the requesting browser session.
pub(crate) async fn reload_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (tx, mut rx) = mpsc::channel(CLIENT_BUFFER);

    let mut client = ReloadClient::connect(Arc::clone(&state.broadcaster));
    client.open(Box::new(ChannelSink(tx)));

    let events = async_stream::stream! {
        // Dropped together with the body, which closes the client
        let _client = client;
        while let Some(message) = rx.recv().await {
            yield Ok::<_, Infallible>(Event::default().data(message));
        }
    };

    (
        [
            (header::CONNECTION, "keep-alive"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_reports_full_buffer() {
        let (tx, _rx) = mpsc::channel(1);
        let sink = ChannelSink(tx);

        assert_eq!(sink.push("reload"), Ok(()));
        assert_eq!(sink.push("reload"), Err(DeliveryError::Full));
    }

    #[test]
    fn test_channel_sink_reports_closed_receiver() {
        let (tx, rx) = mpsc::channel(1);
        let sink = ChannelSink(tx);
        drop(rx);

        assert_eq!(sink.push("reload"), Err(DeliveryError::Closed));
    }
}
