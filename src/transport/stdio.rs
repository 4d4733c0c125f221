//! Line-delimited JSON over stdio.
//!
//! # Important
//!
//! - **Never use `println!`**: it may add `\r\n` on Windows
//! - Logging goes to stderr only

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::interaction::Interaction;

/// Write a line to stdout.
///
/// Writes the string followed by a single `\n` and flushes. Only used for
/// the control line, before the response writer task owns stdout.
pub fn write_stdout_line(line: &str) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(line.as_bytes())?;
    handle.write_all(b"\n")?;
    handle.flush()?;
    Ok(())
}

/// Read interactions from `reader` until EOF and forward them to `tx`.
///
/// Blank lines are ignored; lines that do not parse are logged and skipped.
/// Returns early if the receiving side goes away. Returns the number of
/// interactions forwarded.
pub async fn read_interactions<R>(reader: R, tx: mpsc::Sender<Interaction>) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let interaction: Interaction = match serde_json::from_str(line) {
            Ok(i) => i,
            Err(e) => {
                tracing::warn!("Skipping malformed interaction: {}", e);
                continue;
            }
        };

        if tx.send(interaction).await.is_err() {
            tracing::debug!("Dispatcher gone, stopping reader");
            break;
        }
        forwarded += 1;
    }

    Ok(forwarded)
}

/// Spawn a task reading interactions from stdin.
///
/// The returned receiver closes at stdin EOF.
pub fn spawn_stdin_reader(
    capacity: usize,
) -> (mpsc::Receiver<Interaction>, JoinHandle<Result<usize>>) {
    let (tx, rx) = mpsc::channel(capacity);
    let task = tokio::spawn(read_interactions(BufReader::new(tokio::io::stdin()), tx));
    (rx, task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_stdout_line_does_not_panic() {
        let result = write_stdout_line(r#"{"op":"noop"}"#);
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_read_skips_blank_and_malformed_lines() {
        let input = concat!(
            r#"{"type":"command","id":"1","path":"/ping"}"#,
            "\n",
            "\n",
            "not json\n",
            r#"{"type":"bogus","id":"2","path":"/ping"}"#,
            "\n",
            r#"{"type":"autocomplete","id":"3","path":"/wiki","options":{"query":"Fi"}}"#,
            "\n",
        );
        let (tx, mut rx) = mpsc::channel(8);

        let forwarded = read_interactions(input.as_bytes(), tx).await.unwrap();
        assert_eq!(forwarded, 2);

        assert_eq!(rx.recv().await.unwrap().id(), "1");
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, Interaction::Autocomplete(_)));
        assert_eq!(second.data().options.string("query"), Some("Fi"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_read_stops_when_receiver_dropped() {
        let input = concat!(
            r#"{"type":"command","id":"1","path":"/ping"}"#,
            "\n",
            r#"{"type":"command","id":"2","path":"/ping"}"#,
            "\n",
        );
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let forwarded = read_interactions(input.as_bytes(), tx).await.unwrap();
        assert_eq!(forwarded, 0);
    }
}
