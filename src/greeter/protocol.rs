//! greetd IPC protocol types
//!
//! Every message is a `u32` payload length in native byte order followed by
//! that many bytes of UTF-8 JSON. Messages are tagged by their `type` field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Environment variable greetd sets to the path of its socket
pub const GREETD_SOCK_ENV: &str = "GREETD_SOCK";

/// Upper bound on a single frame, guards against a corrupt length header
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Requests sent from the greeter to greetd
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Open a login conversation for a user
    CreateSession { username: String },
    /// Answer the last auth message. `None` acknowledges info/error messages.
    PostAuthMessageResponse { response: Option<String> },
    /// Start the given command once authenticated
    StartSession {
        cmd: Vec<String>,
        #[serde(default)]
        env: Vec<String>,
    },
    /// Abandon the current conversation
    CancelSession,
}

impl Request {
    /// Short name used in logs; never includes request contents.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::CreateSession { .. } => "create_session",
            Request::PostAuthMessageResponse { .. } => "post_auth_message_response",
            Request::StartSession { .. } => "start_session",
            Request::CancelSession => "cancel_session",
        }
    }
}

// Responses may carry a password, so Debug output is redacted.
impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::CreateSession { username } => f
                .debug_struct("CreateSession")
                .field("username", username)
                .finish(),
            Request::PostAuthMessageResponse { response } => f
                .debug_struct("PostAuthMessageResponse")
                .field("response", &response.as_ref().map(|_| "<redacted>"))
                .finish(),
            Request::StartSession { cmd, env } => f
                .debug_struct("StartSession")
                .field("cmd", cmd)
                .field("env", env)
                .finish(),
            Request::CancelSession => f.write_str("CancelSession"),
        }
    }
}

/// Kind of error reported by greetd
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Credentials were rejected
    AuthError,
    /// Anything else
    Error,
}

/// Kind of message in an authentication conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMessageType {
    /// Prompt whose answer may be echoed
    Visible,
    /// Prompt whose answer must be hidden
    Secret,
    /// Informational text
    Info,
    /// Error text, the conversation continues
    Error,
}

impl AuthMessageType {
    /// Returns true if greetd expects an answer from the user.
    pub fn is_prompt(&self) -> bool {
        matches!(self, AuthMessageType::Visible | AuthMessageType::Secret)
    }
}

/// Responses sent from greetd to the greeter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Success,
    Error {
        error_type: ErrorType,
        description: String,
    },
    AuthMessage {
        auth_message_type: AuthMessageType,
        auth_message: String,
    },
}

/// Write a single length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds limit", payload.len()),
        ));
    }
    let len = payload.len() as u32;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Read a single length-prefixed frame.
///
/// Returns `Ok(None)` if the peer closed the connection before a new frame began.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_ne_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}
