// SPDX-License-Identifier: MIT

//! Wire framing for the control socket (§6.2): one JSON value per line.
//! Simpler than a length-prefixed frame because the control socket only
//! ever carries one request in flight per connection.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("connection closed before a full message was read")]
    UnexpectedEof,
}

/// Serialize `value` to a single JSON line (no trailing newline).
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Parse a single JSON line.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write `value` as one newline-terminated JSON frame.
pub async fn write_message<W, T>(mut writer: W, value: &T) -> Result<(), ProtocolError>
where
    W: tokio::io::AsyncWrite + Unpin,
    T: Serialize,
{
    let mut bytes = encode(value)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one newline-terminated JSON frame.
pub async fn read_message<R, T>(reader: R) -> Result<T, ProtocolError>
where
    R: tokio::io::AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let n = BufReader::new(reader).read_line(&mut line).await?;
    if n == 0 {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(decode(line.trim_end_matches('\n').as_bytes())?)
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
