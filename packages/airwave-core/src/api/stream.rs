//! Audio streaming handler.
//!
//! Every request becomes a listener: a registry connection plus a delivery
//! task that writes handed-off chunks into a streaming response body.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, State},
    http::header,
    response::Response,
};
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::api::AppState;
use crate::error::{AirwaveError, AirwaveResult};
use crate::protocol_constants::{APP_NAME, HANDOFF_SLOT_CAPACITY, STREAM_CONTENT_TYPE};
use crate::stream::ChunkSink;

type BodyItem = Result<Bytes, io::Error>;

/// Feeds an axum streaming body.
///
/// Writes fail once hyper drops the body, which is how a disconnected
/// listener is noticed.
struct BodySink {
    tx: mpsc::Sender<BodyItem>,
}

fn client_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected")
}

#[async_trait]
impl ChunkSink for BodySink {
    async fn write_chunk(&mut self, chunk: Bytes) -> io::Result<()> {
        self.tx.send(Ok(chunk)).await.map_err(|_| client_gone())
    }

    /// Waits until the transport has taken the pending chunk.
    async fn flush(&mut self) -> io::Result<()> {
        self.tx.reserve().await.map(drop).map_err(|_| client_gone())
    }
}

pub(super) async fn stream_audio(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> AirwaveResult<Response> {
    let connection = state.registry.connect(remote_addr.to_string());
    let (tx, rx) = mpsc::channel::<BodyItem>(HANDOFF_SLOT_CAPACITY);

    let response = Response::builder()
        .header(header::CONTENT_TYPE, STREAM_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("icy-name", APP_NAME)
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .map_err(|e| AirwaveError::Internal(e.to_string()))?;

    log::info!(
        "[Stream] {} has connected to the audio stream as {} (listeners: {})",
        remote_addr,
        connection.id(),
        state.registry.member_count()
    );

    tokio::spawn(async move {
        let mut sink = BodySink { tx };
        connection.deliver(&mut sink).await;
    });

    Ok(response)
}
