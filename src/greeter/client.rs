//! Async client for the greetd IPC socket
//!
//! The GreetdClient speaks the raw request/response protocol. Interpreting a
//! multi-step authentication conversation is left to the bridge.

use crate::greeter::protocol::{read_frame, write_frame, Request, Response, GREETD_SOCK_ENV};
use crate::session::SessionLaunch;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::net::UnixStream;
use tracing::{debug, info, warn};

/// Timeout for requests that do not wait on the user or PAM
pub const CONTROL_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when communicating with greetd
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to greetd at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("greetd socket is not configured (is {} set?)", GREETD_SOCK_ENV)]
    SocketNotConfigured,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("greetd returned error: {0}")]
    DaemonError(String),

    #[error("Unexpected response from greetd")]
    UnexpectedResponse,

    #[error("Connection closed by greetd")]
    ConnectionClosed,

    #[error("Connection to greetd is out of sync after an interrupted request")]
    Desynchronized,
}

/// Resolve the greetd socket from the environment
pub fn socket_path_from_env() -> Option<PathBuf> {
    std::env::var_os(GREETD_SOCK_ENV).map(PathBuf::from)
}

/// Client for communicating with greetd
///
/// greetd answers requests strictly in order on one stream. Once an exchange
/// is interrupted half way, a reply may still be in flight, so the client
/// refuses further requests until [`GreetdClient::reconnect`] opens a fresh
/// stream.
pub struct GreetdClient {
    stream: UnixStream,
    socket_path: PathBuf,
    control_timeout: Duration,
    desynchronized: bool,
}

async fn open_stream(socket_path: &Path) -> Result<UnixStream, ClientError> {
    debug!("Connecting to greetd at {:?}", socket_path);

    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|source| ClientError::ConnectionFailed {
            path: socket_path.to_path_buf(),
            source,
        })?;

    debug!("Connected to greetd at {:?}", socket_path);
    Ok(stream)
}

impl GreetdClient {
    /// Connect to greetd at the specified socket path
    pub async fn connect_to(socket_path: PathBuf) -> Result<Self, ClientError> {
        let stream = open_stream(&socket_path).await?;

        Ok(Self {
            stream,
            socket_path,
            control_timeout: CONTROL_TIMEOUT,
            desynchronized: false,
        })
    }

    /// Set the deadline for `start_session` and `cancel_session`
    pub fn with_control_timeout(mut self, timeout: Duration) -> Self {
        self.control_timeout = timeout;
        self
    }

    /// Get the socket path this client is connected to
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Whether an interrupted exchange left the stream unusable
    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    /// Replace the stream with a fresh connection.
    ///
    /// greetd drops any session owned by the old connection when it closes.
    pub async fn reconnect(&mut self) -> Result<(), ClientError> {
        self.stream = open_stream(&self.socket_path).await?;
        self.desynchronized = false;
        info!("Reconnected to greetd at {:?}", self.socket_path);
        Ok(())
    }

    /// Send a request and wait for the response without a deadline.
    ///
    /// Used for conversation steps, which may block on PAM for as long as
    /// PAM decides.
    async fn send_request(&mut self, request: Request) -> Result<Response, ClientError> {
        if self.desynchronized {
            return Err(ClientError::Desynchronized);
        }

        let result = self.exchange(request).await;
        if matches!(result, Err(ClientError::Io(_)) | Err(ClientError::ConnectionClosed)) {
            self.desynchronized = true;
        }
        result
    }

    async fn exchange(&mut self, request: Request) -> Result<Response, ClientError> {
        debug!("Sending greetd request: {}", request.kind());

        let payload = serde_json::to_vec(&request)?;
        drop(request);
        write_frame(&mut self.stream, &payload).await?;
        drop(payload);

        let frame = read_frame(&mut self.stream)
            .await?
            .ok_or(ClientError::ConnectionClosed)?;
        let response: Response = serde_json::from_slice(&frame)?;

        debug!("Received greetd response: {:?}", response);
        Ok(response)
    }

    /// Send a request with a custom timeout
    async fn send_request_with_timeout(
        &mut self,
        request: Request,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        let result = tokio::time::timeout(timeout, self.send_request(request)).await;

        match result {
            Ok(inner_result) => inner_result,
            Err(_) => {
                warn!("greetd did not answer within {:?}", timeout);
                self.desynchronized = true;
                Err(ClientError::Timeout)
            }
        }
    }

    /// Open an authentication conversation for `username`
    pub async fn create_session(&mut self, username: &str) -> Result<Response, ClientError> {
        self.send_request(Request::CreateSession {
            username: username.to_string(),
        })
        .await
    }

    /// Answer the current auth message
    ///
    /// `None` acknowledges an info or error message.
    pub async fn post_auth_message_response(
        &mut self,
        response: Option<String>,
    ) -> Result<Response, ClientError> {
        self.send_request(Request::PostAuthMessageResponse { response })
            .await
    }

    /// Start a session in the authenticated conversation
    pub async fn start_session(&mut self, launch: SessionLaunch) -> Result<(), ClientError> {
        let request = Request::StartSession {
            cmd: launch.cmd,
            env: launch.env,
        };
        let response = self
            .send_request_with_timeout(request, self.control_timeout)
            .await?;

        match response {
            Response::Success => Ok(()),
            Response::Error { description, .. } => Err(ClientError::DaemonError(description)),
            Response::AuthMessage { .. } => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Abandon the current conversation
    pub async fn cancel_session(&mut self) -> Result<(), ClientError> {
        let response = self
            .send_request_with_timeout(Request::CancelSession, self.control_timeout)
            .await?;

        match response {
            Response::Success => Ok(()),
            Response::Error { description, .. } => Err(ClientError::DaemonError(description)),
            Response::AuthMessage { .. } => Err(ClientError::UnexpectedResponse),
        }
    }
}
