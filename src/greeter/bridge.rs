//! Bridge between the UI loop and greetd
//!
//! The UI thread never awaits. GreetdBridge queues commands for a worker
//! thread that owns the async GreetdClient, and the worker reports outcomes
//! back through the UI's event channel as [`GreeterEvent`]s. Commands are
//! processed strictly in the order they were issued.

use crate::greeter::client::{GreetdClient, CONTROL_TIMEOUT};
use crate::greeter::protocol::Response;
use crate::greeter::{ClientError, GreeterClient, GreeterError, GreeterEvent, GreeterResult};
use crate::session::{Session, SessionLaunch};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Extra time `start_session` waits on the worker beyond greetd's own deadline
const START_SESSION_GRACE: Duration = Duration::from_secs(5);

/// Default wrapper that gives X11 sessions an X server
pub fn default_x11_wrapper() -> Vec<String> {
    vec!["startx".to_string(), "/usr/bin/env".to_string()]
}

/// Authentication flags shared between the caller and the worker.
///
/// The worker updates them before it emits the event reporting the change,
/// so the UI always observes them in a consistent state.
#[derive(Debug, Default)]
struct AuthFlags {
    authenticated: AtomicBool,
    in_authentication: AtomicBool,
}

impl AuthFlags {
    fn set(&self, authenticated: bool, in_authentication: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
        self.in_authentication.store(in_authentication, Ordering::SeqCst);
    }
}

/// Commands sent from the UI thread to the worker
enum BridgeCommand {
    Authenticate {
        username: String,
    },
    Respond {
        secret: String,
    },
    StartSession {
        launch: SessionLaunch,
        reply: mpsc::Sender<GreeterResult<()>>,
    },
    Shutdown,
}

/// Where the worker is in greetd's conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversation {
    /// No greetd session open
    Closed,
    /// greetd is waiting for an answer to a prompt
    Prompting,
    /// greetd accepted the user; waiting for start_session
    Authenticated,
}

/// Synchronous [`GreeterClient`] backed by greetd
pub struct GreetdBridge {
    commands: UnboundedSender<BridgeCommand>,
    flags: Arc<AuthFlags>,
    x11_wrapper: Vec<String>,
    start_timeout: Duration,
}

impl GreetdBridge {
    /// Connect to greetd and start the worker thread.
    ///
    /// Events are delivered on `events`. Connection failures are returned
    /// immediately, before any worker is started.
    pub fn connect<E>(socket_path: PathBuf, events: mpsc::Sender<E>) -> GreeterResult<Self>
    where
        E: From<GreeterEvent> + Send + 'static,
    {
        Self::connect_with_timeout(socket_path, events, CONTROL_TIMEOUT)
    }

    /// Like [`GreetdBridge::connect`], with a custom deadline for greetd's
    /// `start_session` and `cancel_session` answers.
    pub fn connect_with_timeout<E>(
        socket_path: PathBuf,
        events: mpsc::Sender<E>,
        control_timeout: Duration,
    ) -> GreeterResult<Self>
    where
        E: From<GreeterEvent> + Send + 'static,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(GreeterError::Runtime)?;

        let client = runtime
            .block_on(GreetdClient::connect_to(socket_path))?
            .with_control_timeout(control_timeout);
        info!("Connected to greetd at {:?}", client.socket_path());

        let (commands, command_rx) = unbounded_channel();
        let flags = Arc::new(AuthFlags::default());
        let worker = BridgeWorker {
            client,
            flags: Arc::clone(&flags),
            events,
            conversation: Conversation::Closed,
        };

        thread::Builder::new()
            .name("greetd-bridge".to_string())
            .spawn(move || runtime.block_on(worker.run(command_rx)))
            .map_err(GreeterError::Runtime)?;

        Ok(Self {
            commands,
            flags,
            x11_wrapper: default_x11_wrapper(),
            start_timeout: control_timeout + START_SESSION_GRACE,
        })
    }

    /// Set the command prefix used to launch X11 sessions
    pub fn with_x11_wrapper(mut self, wrapper: Vec<String>) -> Self {
        self.x11_wrapper = wrapper;
        self
    }

    fn send(&self, command: BridgeCommand) -> GreeterResult<()> {
        self.commands
            .send(command)
            .map_err(|_| GreeterError::Disconnected)
    }
}

impl GreeterClient for GreetdBridge {
    fn authenticate(&mut self, username: &str) -> GreeterResult<()> {
        self.flags.set(false, true);
        self.send(BridgeCommand::Authenticate {
            username: username.to_string(),
        })
    }

    fn respond(&mut self, secret: &str) -> GreeterResult<()> {
        self.send(BridgeCommand::Respond {
            secret: secret.to_string(),
        })
    }

    fn start_session(&mut self, session: &Session) -> GreeterResult<()> {
        let (reply, reply_rx) = mpsc::channel();
        self.send(BridgeCommand::StartSession {
            launch: session.launch(&self.x11_wrapper),
            reply,
        })?;

        match reply_rx.recv_timeout(self.start_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(GreeterError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(GreeterError::Disconnected),
        }
    }

    fn is_authenticated(&self) -> bool {
        self.flags.authenticated.load(Ordering::SeqCst)
    }

    fn is_in_authentication(&self) -> bool {
        self.flags.in_authentication.load(Ordering::SeqCst)
    }
}

impl Drop for GreetdBridge {
    fn drop(&mut self) {
        let _ = self.commands.send(BridgeCommand::Shutdown);
    }
}

/// Worker side of the bridge, runs on its own thread
struct BridgeWorker<E> {
    client: GreetdClient,
    flags: Arc<AuthFlags>,
    events: mpsc::Sender<E>,
    conversation: Conversation,
}

impl<E> BridgeWorker<E>
where
    E: From<GreeterEvent> + Send + 'static,
{
    async fn run(mut self, mut commands: UnboundedReceiver<BridgeCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                BridgeCommand::Authenticate { username } => self.begin(&username).await,
                BridgeCommand::Respond { secret } => self.respond(secret).await,
                BridgeCommand::StartSession { launch, reply } => {
                    let result = self.start_session(launch).await;
                    let _ = reply.send(result);
                }
                BridgeCommand::Shutdown => {
                    debug!("Bridge worker shutting down");
                    break;
                }
            }
        }

        if self.conversation != Conversation::Closed {
            if let Err(e) = self.client.cancel_session().await {
                debug!("Failed to cancel greetd session on shutdown: {}", e);
            }
        }
    }

    fn emit(&self, event: GreeterEvent) {
        if self.events.send(event.into()).is_err() {
            debug!("Event receiver dropped, discarding greeter event");
        }
    }

    async fn begin(&mut self, username: &str) {
        if self.conversation != Conversation::Closed {
            debug!("Cancelling open greetd session before re-authenticating");
            if let Err(e) = self.client.cancel_session().await {
                warn!("Failed to cancel greetd session: {}", e);
            }
            self.conversation = Conversation::Closed;
        }

        if self.client.is_desynchronized() {
            warn!("greetd stream is out of sync, reconnecting");
            if let Err(e) = self.client.reconnect().await {
                self.transport_failed(e.to_string(), false);
                return;
            }
        }

        match self.client.create_session(username).await {
            Ok(response) => self.follow(response, false).await,
            Err(e) => self.transport_failed(e.to_string(), false),
        }
    }

    async fn respond(&mut self, secret: String) {
        match self.conversation {
            Conversation::Closed => {
                warn!("Password submitted with no open greetd session");
                self.flags.set(false, false);
                self.emit(GreeterEvent::AuthenticationComplete { success: false });
            }
            Conversation::Authenticated => {
                info!("greetd accepted the user without a password");
                self.flags.set(true, false);
                self.emit(GreeterEvent::AuthenticationComplete { success: true });
            }
            Conversation::Prompting => {
                let result = self.client.post_auth_message_response(Some(secret)).await;
                match result {
                    Ok(response) => self.follow(response, true).await,
                    Err(e) => self.transport_failed(e.to_string(), true),
                }
            }
        }
    }

    /// Walk the conversation until greetd needs an answer or reaches a verdict.
    ///
    /// `answering` is true when `response` is greetd's reaction to a secret
    /// the user submitted; only then does a verdict complete a round.
    async fn follow(&mut self, mut response: Response, answering: bool) {
        loop {
            match response {
                Response::Success => {
                    self.conversation = Conversation::Authenticated;
                    if answering {
                        self.flags.set(true, false);
                        self.emit(GreeterEvent::AuthenticationComplete { success: true });
                    }
                    return;
                }
                Response::Error {
                    error_type,
                    description,
                } => {
                    info!("greetd rejected authentication ({:?}): {}", error_type, description);
                    if let Err(e) = self.client.cancel_session().await {
                        debug!("Failed to cancel greetd session after error: {}", e);
                    }
                    self.conversation = Conversation::Closed;
                    self.flags.set(false, false);
                    if answering {
                        self.emit(GreeterEvent::AuthenticationComplete { success: false });
                    } else {
                        self.emit(GreeterEvent::Message { text: description });
                    }
                    return;
                }
                Response::AuthMessage {
                    auth_message_type,
                    auth_message,
                } if auth_message_type.is_prompt() => {
                    self.conversation = Conversation::Prompting;
                    if answering {
                        debug!("greetd asked a follow-up question");
                        self.emit(GreeterEvent::Prompt { text: auth_message });
                    } else {
                        debug!("greetd is waiting for the password");
                    }
                    return;
                }
                Response::AuthMessage { auth_message, .. } => {
                    self.emit(GreeterEvent::Message { text: auth_message });
                    response = match self.client.post_auth_message_response(None).await {
                        Ok(next) => next,
                        Err(e) => {
                            self.transport_failed(e.to_string(), answering);
                            return;
                        }
                    };
                }
            }
        }
    }

    fn transport_failed(&mut self, reason: String, answering: bool) {
        error!("Lost contact with greetd: {}", reason);
        self.conversation = Conversation::Closed;
        self.flags.set(false, false);
        if answering {
            self.emit(GreeterEvent::AuthenticationComplete { success: false });
        } else {
            self.emit(GreeterEvent::Message {
                text: format!("Login daemon error: {}", reason),
            });
        }
    }

    async fn start_session(&mut self, launch: SessionLaunch) -> GreeterResult<()> {
        if self.conversation != Conversation::Authenticated {
            return Err(GreeterError::Daemon("user is not authenticated".to_string()));
        }
        debug!("Starting session: {:?}", launch.cmd);
        match self.client.start_session(launch).await {
            Ok(()) => {
                self.conversation = Conversation::Closed;
                Ok(())
            }
            Err(ClientError::DaemonError(message)) => Err(GreeterError::Daemon(message)),
            Err(e) => {
                if self.client.is_desynchronized() {
                    error!("greetd stream broke while starting the session: {}", e);
                    self.conversation = Conversation::Closed;
                    self.flags.set(false, false);
                }
                Err(e.into())
            }
        }
    }
}
