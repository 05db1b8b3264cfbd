//! Client side of the connection handshake.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec;
use crate::error::{OefSdkError, Result};
use crate::protocol::{Answer, Connected, Identify, Phrase};
use crate::transport::{read_frame, write_frame};

/// Identify as `public_key`, answer the node's phrase and wait for its
/// verdict. Nothing else may be on the wire until this returns.
pub(crate) async fn perform<R, W>(reader: &mut R, writer: &mut W, public_key: &str) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let identify = Identify {
        public_key: public_key.to_string(),
    };
    write_frame(writer, &codec::encode(&identify)?).await?;

    let phrase: Phrase = codec::decode(&read_frame(reader).await?)
        .map_err(|e| OefSdkError::Handshake(format!("Malformed phrase: {e}")))?;
    let Some(text) = phrase.text() else {
        return Err(OefSdkError::Handshake(
            "Node refused the agent or sent no phrase".to_string(),
        ));
    };
    tracing::debug!("Received handshake phrase ({} chars)", text.len());

    let answer = Answer {
        answer: text.to_string(),
    };
    write_frame(writer, &codec::encode(&answer)?).await?;

    let connected: Connected = codec::decode(&read_frame(reader).await?)
        .map_err(|e| OefSdkError::Handshake(format!("Malformed connection status: {e}")))?;
    if !connected.status {
        return Err(OefSdkError::Handshake(
            "Node rejected the answer".to_string(),
        ));
    }

    Ok(())
}
