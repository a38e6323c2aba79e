//! Per-connection reader and writer tasks.
//!
//! Each accepted socket is split in two: the reader task buffers bytes
//! across reads, reassembles complete newline-terminated lines, decodes
//! them, and feeds the engine; the writer task drains the connection's
//! outbound event queue onto the socket. Undecodable lines are logged
//! and discarded without touching the connection.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use dropfour_protocol::{ClientCommand, ProtocolError, ServerEvent};

use crate::registry::ConnId;
use crate::server::ServerState;

/// Drop guard that runs the disconnect cleanup when the handler exits,
/// including on panic. `Drop` is synchronous, so the engine lock is
/// taken in a fire-and-forget task; `Engine::disconnect` is idempotent.
struct DisconnectGuard {
    conn: ConnId,
    state: Arc<ServerState>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn = self.conn;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.engine.lock().await.disconnect(conn);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(stream: TcpStream, state: Arc<ServerState>) {
    let conn = ConnId::next();
    tracing::debug!(%conn, "handling new connection");

    let (read_half, mut write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Writer task: the engine only ever pushes onto the queue, so a
    // stalled peer is absorbed here instead of stalling anyone else.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let line = format!("{event}\n");
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let _guard = DisconnectGuard { conn, state: Arc::clone(&state) };

    let max_line = state.config.max_line_len;
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        // The read itself is capped, so an unterminated stream can never
        // grow the buffer past the line limit.
        let read = (&mut reader)
            .take(max_line as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await;
        match read {
            Ok(0) => {
                tracing::debug!(%conn, "connection closed");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%conn, error = %e, "read error");
                break;
            }
        }

        if buf.last() != Some(&b'\n') && buf.len() > max_line {
            let err = ProtocolError::LineTooLong(max_line);
            tracing::warn!(%conn, error = %err, "discarding line");
            if !skip_past_newline(&mut reader).await {
                break;
            }
            continue;
        }
        let Ok(text) = std::str::from_utf8(&buf) else {
            tracing::warn!(%conn, "discarding non-utf8 line");
            continue;
        };
        let trimmed = text.trim_end_matches('\n').trim_end_matches('\r');
        if trimmed.is_empty() {
            continue;
        }
        let command: ClientCommand = match trimmed.parse() {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(%conn, error = %e, "discarding line");
                continue;
            }
        };

        state.engine.lock().await.handle(conn, command, &tx, Instant::now());
    }

    // The registry holds a clone of `tx`, so the writer's queue only
    // closes once the engine lets go of it. Disconnect here, on the
    // normal path; the guard still covers panics and `disconnect` is
    // idempotent.
    state.engine.lock().await.disconnect(conn);

    // Dropping our sender lets the writer drain the queue and exit.
    drop(tx);
    let _ = writer.await;
}

/// Discards input up to and including the next newline, without buffering
/// it. Returns `false` on EOF or a read error.
async fn skip_past_newline<R: AsyncBufRead + Unpin>(reader: &mut R) -> bool {
    loop {
        let (consumed, found) = {
            let available = match reader.fill_buf().await {
                Ok(chunk) => chunk,
                Err(_) => return false,
            };
            if available.is_empty() {
                return false;
            }
            match available.iter().position(|&byte| byte == b'\n') {
                Some(index) => (index + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(consumed);
        if found {
            return true;
        }
    }
}
