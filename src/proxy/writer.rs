//! Writer loop: drains the outbound queue onto the socket.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use crate::codec;
use crate::error::Result;
use crate::protocol::Envelope;
use crate::transport::write_frame;

/// Write queued envelopes, in order, until the queue closes or the session
/// is cancelled.
///
/// An envelope that fails to encode is logged and skipped. A write failure
/// ends the loop with that error; whatever is still queued is discarded.
/// The write half is shut down once on every exit path.
pub(crate) async fn run<W>(
    mut writer: W,
    mut queue: UnboundedReceiver<Envelope>,
    cancel: CancellationToken,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let result = drain(&mut writer, &mut queue, &cancel).await;

    queue.close();
    if let Err(e) = writer.shutdown().await {
        tracing::debug!("Write half shutdown failed: {}", e);
    }

    result
}

async fn drain<W>(
    writer: &mut W,
    queue: &mut UnboundedReceiver<Envelope>,
    cancel: &CancellationToken,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let envelope = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            next = queue.recv() => match next {
                Some(envelope) => envelope,
                None => return Ok(()),
            },
        };

        let payload = match codec::encode(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    "Dropping {} envelope {}: {}",
                    envelope.payload.name(),
                    envelope.msg_id,
                    e
                );
                continue;
            },
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            written = write_frame(writer, &payload) => written?,
        }

        tracing::trace!(
            "Sent {} envelope {} ({} bytes)",
            envelope.payload.name(),
            envelope.msg_id,
            payload.len()
        );
    }
}
