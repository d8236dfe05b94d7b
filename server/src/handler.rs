//! Per-connection read loop
//!
//! Reads newline-delimited frames, parses them into commands and applies them
//! to the shared game state. Malformed frames are dropped without a reply.
//! However the loop ends, the connection goes through the disconnect
//! transition exactly once (later calls are no-ops).

use crate::game::{GameState, SharedState};
use crate::registry::ConnectionId;
use log::debug;
use shared::{Command, MAX_FRAME_LEN};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::oneshot;
use tokio::time::timeout;

// Frame body, optional '\r', and the '\n' delimiter.
const READ_LIMIT: u64 = MAX_FRAME_LEN as u64 + 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Line(String),
    /// Oversized or not UTF-8; already skipped up to its delimiter
    Discarded,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Reads the next frame, never buffering more than one frame's worth
pub async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader).take(READ_LIMIT).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(Frame::Eof);
    }

    let terminated = buf.last() == Some(&b'\n');
    if !terminated && read as u64 >= READ_LIMIT {
        // Skip the rest of the oversized frame
        loop {
            buf.clear();
            let read = (&mut *reader).take(READ_LIMIT).read_until(b'\n', buf).await?;
            if read == 0 || buf.last() == Some(&b'\n') {
                break;
            }
        }
        return Ok(Frame::Discarded);
    }

    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
        buf.pop();
    }
    match std::str::from_utf8(buf.as_slice()) {
        Ok(line) => Ok(Frame::Line(line.to_string())),
        Err(_) => Ok(Frame::Discarded),
    }
}

/// Applies one frame to the game state
pub fn dispatch(state: &mut GameState, id: ConnectionId, frame: &str) -> Flow {
    match Command::parse(frame) {
        Ok(Command::Connect { name }) => state.connect(id, &name),
        Ok(Command::SetWord { name, word }) => state.set_word(id, &name, &word),
        Ok(Command::Guess { name, letter }) => state.guess(id, &name, letter),
        Ok(Command::Disconnect { name }) => {
            debug!("Connection {} ({}) asked to disconnect", id, name);
            return Flow::Close;
        }
        Err(e) => debug!("Ignoring frame from connection {}: {}", id, e),
    }
    Flow::Continue
}

async fn next_frame<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    idle_timeout: Option<Duration>,
) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    match idle_timeout {
        Some(limit) => match timeout(limit, read_frame(reader, buf)).await {
            Ok(frame) => frame,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connection idle")),
        },
        None => read_frame(reader, buf).await,
    }
}

/// Runs until the peer closes, sends `DISCONNECT`, idles out, or the server
/// drops the connection (signalled through `closed`)
pub async fn handle_connection<R>(
    id: ConnectionId,
    reader: R,
    mut closed: oneshot::Receiver<()>,
    state: SharedState,
    idle_timeout: Option<Duration>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(MAX_FRAME_LEN);

    loop {
        let frame = tokio::select! {
            _ = &mut closed => {
                debug!("Connection {} dropped by the server", id);
                break;
            }
            frame = next_frame(&mut reader, &mut buf, idle_timeout) => frame,
        };

        match frame {
            Ok(Frame::Line(line)) => {
                debug!("Received from connection {}: {}", id, line);
                let flow = {
                    let mut state = state.lock().await;
                    dispatch(&mut state, id, &line)
                };
                if flow == Flow::Close {
                    break;
                }
            }
            Ok(Frame::Discarded) => {
                debug!("Discarded malformed frame from connection {}", id)
            }
            Ok(Frame::Eof) => break,
            Err(e) => {
                debug!("Read error on connection {}: {}", id, e);
                break;
            }
        }
    }

    state.lock().await.disconnect(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::PlayerDirectory;
    use crate::round::Phase;
    use tokio::sync::mpsc;
    use tokio_test::io::Builder;

    fn shared_game() -> SharedState {
        GameState::with_directory(PlayerDirectory::with_seed(1)).into_shared()
    }

    #[tokio::test]
    async fn test_read_frame_splits_lines() {
        let mut reader = BufReader::new(
            Builder::new()
                .read(b"CONNECT:A\nGUESS:A:")
                .read(b"b\r\n")
                .build(),
        );
        let mut buf = Vec::new();

        assert_eq!(
            read_frame(&mut reader, &mut buf).await.unwrap(),
            Frame::Line("CONNECT:A".to_string())
        );
        assert_eq!(
            read_frame(&mut reader, &mut buf).await.unwrap(),
            Frame::Line("GUESS:A:b".to_string())
        );
        assert_eq!(read_frame(&mut reader, &mut buf).await.unwrap(), Frame::Eof);
    }

    #[tokio::test]
    async fn test_read_frame_unterminated_tail() {
        let mut reader = BufReader::new(Builder::new().read(b"DISCONNECT:A").build());
        let mut buf = Vec::new();

        assert_eq!(
            read_frame(&mut reader, &mut buf).await.unwrap(),
            Frame::Line("DISCONNECT:A".to_string())
        );
        assert_eq!(read_frame(&mut reader, &mut buf).await.unwrap(), Frame::Eof);
    }

    #[tokio::test]
    async fn test_read_frame_discards_oversized() {
        let mut input = vec![b'x'; MAX_FRAME_LEN * 3];
        input.extend_from_slice(b"\nCONNECT:A\n");
        let mut reader = BufReader::new(Builder::new().read(&input).build());
        let mut buf = Vec::new();

        assert_eq!(
            read_frame(&mut reader, &mut buf).await.unwrap(),
            Frame::Discarded
        );
        assert_eq!(
            read_frame(&mut reader, &mut buf).await.unwrap(),
            Frame::Line("CONNECT:A".to_string())
        );
    }

    #[tokio::test]
    async fn test_read_frame_rejects_invalid_utf8() {
        let mut reader = BufReader::new(Builder::new().read(b"\xff\xfe\nCONNECT:A\n").build());
        let mut buf = Vec::new();

        assert_eq!(
            read_frame(&mut reader, &mut buf).await.unwrap(),
            Frame::Discarded
        );
        assert_eq!(
            read_frame(&mut reader, &mut buf).await.unwrap(),
            Frame::Line("CONNECT:A".to_string())
        );
    }

    #[test]
    fn test_dispatch_ignores_garbage() {
        let mut game = GameState::with_directory(PlayerDirectory::with_seed(1));
        let (tx, mut rx) = mpsc::channel(8);
        let (id, _closed) = game.register("127.0.0.1:9000".parse().unwrap(), tx);

        assert_eq!(dispatch(&mut game, id, "HELLO"), Flow::Continue);
        assert_eq!(dispatch(&mut game, id, "CONNECT"), Flow::Continue);
        assert_eq!(dispatch(&mut game, id, "GUESS:A:"), Flow::Continue);
        assert!(rx.try_recv().is_err());

        assert_eq!(dispatch(&mut game, id, "CONNECT:A"), Flow::Continue);
        assert_eq!(rx.try_recv().unwrap(), "WAITWORD:A\n");
        assert_eq!(dispatch(&mut game, id, "DISCONNECT:A"), Flow::Close);
    }

    #[tokio::test]
    async fn test_handler_plays_and_cleans_up() {
        let state = shared_game();
        let (a_tx, mut a_rx) = mpsc::channel(64);
        let (b_tx, _b_rx) = mpsc::channel(64);
        let (a_id, a_closed) = state
            .lock()
            .await
            .register("127.0.0.1:9001".parse().unwrap(), a_tx);
        let (b_id, _b_closed) = state
            .lock()
            .await
            .register("127.0.0.1:9002".parse().unwrap(), b_tx);
        {
            let mut game = state.lock().await;
            game.connect(a_id, "A");
            game.connect(b_id, "B");
        }

        let reader = Builder::new()
            .read(b"CONNECT:A\n")
            .read(b"garbage\n")
            .read(b"SETWORD:A:cat\n")
            .build();
        handle_connection(a_id, reader, a_closed, state.clone(), None).await;

        let game = state.lock().await;
        // The handler hit EOF and tore the connection down
        assert!(game.registry().get(a_id).is_none());
        assert!(!game.directory().is_active("A"));
        assert_eq!(game.round().phase(), Phase::Guessing);
        assert_eq!(game.round().secret_word(), "CAT");
        assert_eq!(game.round().current_guesser(), "B");
        assert_eq!(a_rx.recv().await.unwrap(), "WAITWORD:A\n");
    }

    #[tokio::test]
    async fn test_handler_stops_on_disconnect_frame() {
        let state = shared_game();
        let (tx, _rx) = mpsc::channel(64);
        let (id, closed) = state
            .lock()
            .await
            .register("127.0.0.1:9001".parse().unwrap(), tx);

        let reader = Builder::new().read(b"CONNECT:A\nDISCONNECT:A\n").build();
        handle_connection(id, reader, closed, state.clone(), None).await;

        let game = state.lock().await;
        assert!(game.registry().is_empty());
        assert_eq!(game.round(), &crate::round::RoundState::new());
        assert_eq!(game.directory().len(), 1);
    }

    #[tokio::test]
    async fn test_handler_idle_timeout() {
        let state = shared_game();
        let (tx, _rx) = mpsc::channel(64);
        let (id, closed) = state
            .lock()
            .await
            .register("127.0.0.1:9001".parse().unwrap(), tx);

        let reader = Builder::new()
            .read(b"CONNECT:A\n")
            .wait(Duration::from_secs(5))
            .build();
        handle_connection(
            id,
            reader,
            closed,
            state.clone(),
            Some(Duration::from_millis(50)),
        )
        .await;

        assert!(state.lock().await.registry().is_empty());
    }
}
