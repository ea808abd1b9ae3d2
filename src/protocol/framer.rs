//! Response framing.
//!
//! Every response is a status line `"%3d %-8d\n"` (status code, then the body
//! length in bytes left-aligned in an 8-wide field), the body, and a trailing
//! newline. Clients parse the length field to know how much body to read, so
//! the layout must be reproduced byte for byte.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::protocol::status::ResponseStatus;

/// A single CLI response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: ResponseStatus,
    pub body: String,
}

impl Response {
    pub fn new(status: ResponseStatus, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(ResponseStatus::Ok, body)
    }

    /// Encode this response for the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        frame(self.status, &self.body)
    }
}

/// Build the exact byte sequence for `status` and `body`.
pub fn frame(status: ResponseStatus, body: &str) -> Vec<u8> {
    let status_line = format!("{:3} {:<8}\n", status.code(), body.len());
    let mut buf = Vec::with_capacity(status_line.len() + body.len() + 1);
    buf.extend_from_slice(status_line.as_bytes());
    buf.extend_from_slice(body.as_bytes());
    buf.push(b'\n');
    buf
}

/// Write a framed response and flush it before returning.
pub async fn write_response<W>(writer: &mut W, response: &Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&response.to_bytes()).await?;
    writer.flush().await
}
