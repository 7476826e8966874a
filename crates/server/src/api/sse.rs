//! Server-sent event feeds for live queue displays.
//!
//! Each connection subscribes to the status broadcaster with its own cursor.
//! The first event is a fresh snapshot; after that the connection receives
//! the messages of its feed plus heartbeats. A subscriber that falls behind
//! skips ahead to the oldest retained message. Every feed ends once the
//! broadcaster closes feeds for shutdown.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use queuedesk_core::{Feed, StreamMessage};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::metrics::{
    SSE_CONNECTIONS_ACTIVE, SSE_CONNECTIONS_TOTAL, SSE_LAG_EVENTS, SSE_MESSAGES_SENT,
};
use crate::state::AppState;

/// Full queue status plus every counter.
pub async fn queue_updates(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    open_feed(&state, Feed::QueueUpdates)
}

/// Counters, tickets being served and the next few waiting.
pub async fn counter_display(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    open_feed(&state, Feed::CounterDisplay)
}

fn feed_label(feed: Feed) -> &'static str {
    match feed {
        Feed::QueueUpdates => "queue_updates",
        Feed::CounterDisplay => "counter_display",
    }
}

/// Decrements the active gauge when the client goes away.
struct ConnectionGuard {
    feed: Feed,
}

impl ConnectionGuard {
    fn open(feed: Feed) -> Self {
        SSE_CONNECTIONS_TOTAL
            .with_label_values(&[feed_label(feed)])
            .inc();
        SSE_CONNECTIONS_ACTIVE.inc();
        info!(feed = feed_label(feed), "SSE client connected");
        Self { feed }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
        info!(feed = feed_label(self.feed), "SSE client disconnected");
    }
}

struct FeedState {
    feed: Feed,
    rx: broadcast::Receiver<StreamMessage>,
    pending: Option<StreamMessage>,
    _guard: ConnectionGuard,
}

fn open_feed(state: &AppState, feed: Feed) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let broadcaster = state.broadcaster();

    // Subscribe before snapshotting so nothing published in between is lost
    let rx = broadcaster.subscribe();
    let snapshot = match feed {
        Feed::QueueUpdates => broadcaster.queue_snapshot(),
        Feed::CounterDisplay => broadcaster.display_snapshot(),
    };
    let pending = match snapshot {
        Ok(message) => Some(message),
        Err(e) => {
            error!("Failed to build initial snapshot: {}", e);
            None
        }
    };

    let feed_state = FeedState {
        feed,
        rx,
        pending,
        _guard: ConnectionGuard::open(feed),
    };

    let stream = stream::unfold(feed_state, |mut s| async move {
        if let Some(message) = s.pending.take() {
            return Some((to_event(&message), s));
        }
        loop {
            match s.rx.recv().await {
                Ok(message) if message.belongs_to(s.feed) => {
                    return Some((to_event(&message), s));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        feed = feed_label(s.feed),
                        "SSE client lagged, skipped {} messages", skipped
                    );
                    SSE_LAG_EVENTS.inc();
                }
                Err(RecvError::Closed) => {
                    debug!("Broadcaster closed, ending SSE stream");
                    return None;
                }
            }
        }
    })
    .take_until(broadcaster.feeds_closed());

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Unnamed event with a JSON payload, so plain `onmessage` handlers see it.
fn to_event(message: &StreamMessage) -> Result<Event, Infallible> {
    SSE_MESSAGES_SENT
        .with_label_values(&[message.event_name()])
        .inc();
    let event = match serde_json::to_string(message) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            error!("Failed to serialize StreamMessage: {}", e);
            Event::default().comment("serialization failed")
        }
    };
    Ok(event)
}
