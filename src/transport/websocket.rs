//! WebSocket adapter serving `/ws/training/{session_id}`.

use std::borrow::Cow;
use std::sync::Arc;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::channel::ChannelSubscriber;
use super::codec::{Frame, encode};
use super::errors::TransportError;
use super::types::{ControlCommand, SESSION_NOT_FOUND};
use crate::session::{SessionError, SessionRegistry};

pub const PATH_PREFIX: &str = "/ws/training/";

/// Messages buffered between a session and its socket writer.
const OUTBOUND_CAPACITY: usize = 64;

type Sink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Session id named by a stream path, if any.
pub fn session_id_from_path(path: &str) -> Option<Uuid> {
    path.strip_prefix(PATH_PREFIX)
        .map(|rest| rest.trim_end_matches('/'))
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

/// Accepts connections until the listener fails.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
) -> Result<(), TransportError> {
    info!(addr = ?listener.local_addr().ok(), "accepting stream connections");
    loop {
        let (stream, peer) = listener.accept().await?;
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, registry).await {
                warn!(%peer, error = %err, "stream connection failed");
            }
        });
    }
}

/// Binds one socket to one session: updates flow out as text frames,
/// `START`/`STOP` frames flow in as lifecycle calls.
pub async fn handle_connection(
    stream: TcpStream,
    registry: Arc<SessionRegistry>,
) -> Result<(), TransportError> {
    let mut path = String::new();
    let socket = accept_hdr_async(
        stream,
        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            path = request.uri().path().to_string();
            Ok(response)
        },
    )
    .await?;
    let (mut sink, mut source) = socket.split();

    let session = match session_id_from_path(&path).map(|id| registry.get(id)) {
        Some(Ok(session)) => session,
        _ => {
            debug!(%path, "rejecting stream for unknown session");
            close(&mut sink, SESSION_NOT_FOUND, "Session not found".to_string()).await?;
            return Ok(());
        }
    };
    let session_id = session.id();

    let (subscriber, mut outbound) = ChannelSubscriber::channel(OUTBOUND_CAPACITY);
    let subscriber_id = session.attach(Arc::new(subscriber));

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            match encode(&message)? {
                Frame::Text(text) => sink.send(Message::Text(text)).await?,
                Frame::Close { code, reason } => {
                    close(&mut sink, code, reason).await?;
                    break;
                }
            }
        }
        Ok::<_, TransportError>(())
    });

    while let Some(frame) = source.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!(session_id = %session_id, error = %err, "stream read failed");
                break;
            }
        };
        let Some(command) = ControlCommand::parse(&text) else {
            debug!(session_id = %session_id, command = %text, "ignoring unknown command");
            continue;
        };
        let result = match command {
            ControlCommand::Start => registry.start(session_id).await,
            ControlCommand::Stop => registry.stop(session_id).await,
        };
        match result {
            Ok(()) => {}
            Err(SessionError::NotFound(_)) => break,
            Err(err) => warn!(session_id = %session_id, ?command, error = %err, "command failed"),
        }
    }

    session.detach(subscriber_id);
    writer.abort();
    info!(session_id = %session_id, "stream closed");
    Ok(())
}

async fn close(sink: &mut Sink, code: u16, reason: String) -> Result<(), TransportError> {
    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: Cow::Owned(reason),
    };
    sink.send(Message::Close(Some(frame))).await?;
    Ok(())
}
