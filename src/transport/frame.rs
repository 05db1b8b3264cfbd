//! Length-prefixed framing.
//!
//! ```text
//! +----------------------+---------------------------+
//! | length: u32 (LE)     | payload: [u8; length]     |
//! +----------------------+---------------------------+
//! ```
//!
//! A zero length prefix is how a closing node signals end of stream, so a
//! zero-length frame is never delivered as an empty payload.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{OefSdkError, Result};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Write one frame and flush it.
///
/// The prefix and payload go out as one buffer; `write_all` keeps writing
/// until the stream has accepted every byte.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let length =
        u32::try_from(payload.len()).map_err(|_| OefSdkError::FrameTooLarge(payload.len()))?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame and return its payload.
///
/// Fails with [`OefSdkError::ConnectionClosed`] on EOF (before or inside a
/// frame) and on a zero length prefix.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader.read_exact(&mut prefix).await.map_err(eof_as_closed)?;

    let length = u32::from_le_bytes(prefix);
    if length == 0 {
        return Err(OefSdkError::ConnectionClosed);
    }

    // Grow with the data actually received instead of trusting the prefix
    // for a single up-front allocation.
    let mut payload = Vec::with_capacity((length as usize).min(64 * 1024));
    let read = (&mut *reader)
        .take(u64::from(length))
        .read_to_end(&mut payload)
        .await?;

    if read != length as usize {
        tracing::debug!("Stream ended after {} of {} payload bytes", read, length);
        return Err(OefSdkError::ConnectionClosed);
    }

    Ok(payload)
}

fn eof_as_closed(err: std::io::Error) -> OefSdkError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        OefSdkError::ConnectionClosed
    } else {
        OefSdkError::Io(err)
    }
}
