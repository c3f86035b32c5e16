//! Session client handle and connection worker.
//!
//! `SessionClient::spawn` starts a background worker that exclusively owns
//! the transport channel and the reliability state machine: bounded
//! fixed-interval reconnection, the inactivity watchdog, send fallback, and
//! inbound dispatch. The handle communicates with the worker over a command
//! channel; all application callbacks run on the worker task.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::reconnect::ReconnectPolicy;
use crate::session::handler::{EventCallback, EventKind, MessageHandler};
use crate::session::proto::{classify_frame, InboundFrame, OutboundEnvelope};
use crate::transport::{
    Channel, ChannelEvent, ConnectMetadata, ConnectTarget, Connector, WsConnector,
};

const MSG_CONNECTION_CLOSED: &str = "connection closed.";
const MSG_NOT_OPEN: &str = "transport is not open";
const MSG_SEND_EXHAUSTED: &str = "could not send message: reconnect attempts exhausted";
const MSG_RECONNECT_SEND_FAILED: &str = "could not reconnect to deliver pending message";
const MSG_SEND_SUPERSEDED: &str = "pending message dropped: superseded by a newer send";
const MSG_ATTEMPTS_EXHAUSTED: &str = "reconnect attempts exhausted";

/// Errors surfaced directly to handle callers.
///
/// Delivery and reconnection failures are reported through the callbacks,
/// never through these.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The background worker has terminated, usually after `close()`.
    #[error("session worker is no longer running")]
    WorkerClosed,
}

/// Per-send overrides.
///
/// A send landing while a reconnect cycle is already underway rides that
/// cycle: `reconnect_target` redirects the next attempt, while
/// `max_reconnect_attempts` only matters when the client is parked after
/// ceiling exhaustion.
#[derive(Clone, Debug, Default)]
pub struct SendOptions {
    /// Overrides the reconnect ceiling used to reinitiate a parked client.
    pub max_reconnect_attempts: Option<u32>,
    /// Alternate target for this send's fallback cycle.
    pub reconnect_target: Option<ConnectTarget>,
}

enum Command {
    Send {
        payload: String,
        options: SendOptions,
    },
    SetConversationId(String),
    Close,
}

/// Handle to one logical conversation client.
///
/// Constructing the handle immediately initiates the first connection
/// attempt. Dropping the handle without calling [`close`](Self::close)
/// behaves like a manual close.
pub struct SessionClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    session_id: String,
    client_session_id: String,
}

impl SessionClient {
    /// Spawns a session worker over the websocket transport.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(config: SessionConfig, handler: Arc<dyn MessageHandler>) -> Self {
        Self::spawn_with(WsConnector, config, handler, None, None)
    }

    /// Spawns a session worker over a custom transport, with an optional
    /// event callback and an optional pre-known conversation id.
    pub fn spawn_with(
        connector: impl Connector + 'static,
        config: SessionConfig,
        handler: Arc<dyn MessageHandler>,
        events: Option<EventCallback>,
        conversation_id: Option<String>,
    ) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let client_session_id = Uuid::new_v4().to_string();
        debug!(
            session_id = %session_id,
            client_session_id = %client_session_id,
            "session created"
        );

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let target = ConnectTarget {
            address: config.address.clone(),
            port: config.port,
            route: config.route.clone(),
        };
        let policy = ReconnectPolicy::new(config.max_reconnect_attempts, config.reconnect_interval);
        let ctx = WorkerCtx {
            connector: Box::new(connector),
            config,
            policy,
            target,
            session_id: session_id.clone(),
            client_session_id: client_session_id.clone(),
            handler,
            events,
        };
        let state = SessionState {
            conversation_id,
            attempts: 0,
            pending: None,
            target_override: None,
        };
        tokio::spawn(session_worker(ctx, state, cmd_rx));

        Self {
            cmd_tx,
            session_id,
            client_session_id,
        }
    }

    /// Session identifier sent with every connection attempt.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Identifier distinguishing this client instance.
    pub fn client_session_id(&self) -> &str {
        &self.client_session_id
    }

    /// Queues a message for delivery.
    ///
    /// Delivery failures are reported through the message-error callback.
    pub fn send(&self, message: impl Into<String>) -> Result<(), SessionError> {
        self.send_with(message, SendOptions::default())
    }

    /// Queues a message with per-send overrides.
    pub fn send_with(
        &self,
        message: impl Into<String>,
        options: SendOptions,
    ) -> Result<(), SessionError> {
        self.cmd_tx
            .send(Command::Send {
                payload: message.into(),
                options,
            })
            .map_err(|_| SessionError::WorkerClosed)
    }

    /// Overrides the conversation id, eg when learned out-of-band.
    ///
    /// Empty values are ignored; a known id is never cleared.
    pub fn set_conversation_id(&self, id: impl Into<String>) -> Result<(), SessionError> {
        self.cmd_tx
            .send(Command::SetConversationId(id.into()))
            .map_err(|_| SessionError::WorkerClosed)
    }

    /// Closes the connection. Idempotent and terminal: no reconnection is
    /// attempted afterwards.
    pub fn close(&self) {
        let _ = self.cmd_tx.send(Command::Close);
    }
}

struct WorkerCtx {
    connector: Box<dyn Connector>,
    config: SessionConfig,
    policy: ReconnectPolicy,
    target: ConnectTarget,
    session_id: String,
    client_session_id: String,
    handler: Arc<dyn MessageHandler>,
    events: Option<EventCallback>,
}

impl WorkerCtx {
    fn emit(&self, kind: EventKind, message: &str) {
        if let Some(events) = &self.events {
            events(kind, message);
        }
    }

    fn log_debug(&self, message: &str) {
        if self.config.debug {
            debug!(session_id = %self.session_id, "{message}");
        }
    }

    fn metadata(&self, conversation_id: &Option<String>) -> ConnectMetadata {
        ConnectMetadata {
            session_id: self.session_id.clone(),
            client_session_id: self.client_session_id.clone(),
            conversation_id: conversation_id.clone(),
        }
    }
}

struct SessionState {
    conversation_id: Option<String>,
    attempts: u32,
    /// Serialized envelope awaiting transmission after a reconnect. At most
    /// one is retained; a newer failed send supersedes it.
    pending: Option<String>,
    /// Target for the next connect attempt only, from a send override.
    target_override: Option<ConnectTarget>,
}

enum OpenOutcome {
    /// Manual close or server conversation end; the worker exits.
    Terminal,
    /// Connection lost; eligible for reconnection.
    Lost,
}

enum ParkOutcome {
    Terminal,
    /// A send's ceiling admitted another reconnect cycle.
    Reinitiate,
}

enum Dispatch {
    Continue,
    EndConversation,
}

async fn session_worker(
    ctx: WorkerCtx,
    mut state: SessionState,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
) {
    loop {
        let target = state
            .target_override
            .take()
            .unwrap_or_else(|| ctx.target.clone());
        let metadata = ctx.metadata(&state.conversation_id);
        ctx.log_debug(&format!("connecting to {}", target.url()));

        match ctx.connector.connect(&target, &metadata).await {
            Ok(channel) => {
                state.attempts = 0;
                ctx.emit(
                    EventKind::Connection,
                    &format!(
                        "connection opened successfully. session id: {}",
                        ctx.session_id
                    ),
                );
                ctx.log_debug("connection opened");

                match run_open(&ctx, &mut state, &mut cmd_rx, channel).await {
                    OpenOutcome::Terminal => return,
                    OpenOutcome::Lost => {}
                }
            }
            Err(err) => {
                ctx.emit(EventKind::Error, &format!("connection failed: {err}"));
                ctx.log_debug(&format!("connection attempt failed: {err}"));
                // A send rides exactly one reconnect cycle.
                if state.pending.take().is_some() {
                    ctx.handler.on_error(MSG_RECONNECT_SEND_FAILED);
                }
            }
        }

        // Reconnect admission. Past the ceiling the worker parks,
        // disconnected and non-retrying, until a send reinitiates with a
        // ceiling that still admits an attempt.
        if !ctx.policy.admits(state.attempts) {
            match park(&ctx, &mut state, &mut cmd_rx).await {
                ParkOutcome::Terminal => return,
                ParkOutcome::Reinitiate => {}
            }
        }
        state.attempts += 1;
        ctx.emit(
            EventKind::Error,
            &format!("reconnect attempt #{}", state.attempts),
        );
        ctx.log_debug(&format!("reconnect attempt #{}", state.attempts));

        if !reconnect_delay(&ctx, &mut state, &mut cmd_rx).await {
            return;
        }
    }
}

/// One connected phase: pending retransmit, then the select loop over
/// commands, inbound events, and the inactivity deadline.
async fn run_open(
    ctx: &WorkerCtx,
    state: &mut SessionState,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    mut channel: Box<dyn Channel>,
) -> OpenOutcome {
    let mut idle_deadline = Instant::now() + ctx.config.inactivity_timeout;

    if let Some(wire) = state.pending.take() {
        match channel.send_text(wire.clone()).await {
            Ok(()) => {
                ctx.log_debug("pending message sent after reconnect");
                idle_deadline = Instant::now() + ctx.config.inactivity_timeout;
            }
            Err(err) => {
                state.pending = Some(wire);
                ctx.emit(EventKind::Error, &format!("send failed: {err}"));
                return OpenOutcome::Lost;
            }
        }
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                None | Some(Command::Close) => {
                    channel.close().await;
                    ctx.emit(EventKind::Close, MSG_CONNECTION_CLOSED);
                    ctx.log_debug("connection closed by client");
                    return OpenOutcome::Terminal;
                }
                Some(Command::SetConversationId(id)) => {
                    apply_conversation_id(state, id);
                }
                Some(Command::Send { payload, .. }) => {
                    let wire = match OutboundEnvelope::wrap(payload) {
                        Ok(wire) => wire,
                        Err(err) => {
                            ctx.handler.on_error(&format!("failed to encode message: {err}"));
                            continue;
                        }
                    };
                    match channel.send_text(wire.clone()).await {
                        Ok(()) => {
                            ctx.log_debug(&format!("message sent: {wire}"));
                            idle_deadline = Instant::now() + ctx.config.inactivity_timeout;
                        }
                        Err(err) => {
                            // Retransmitted after the reconnect this triggers.
                            state.pending = Some(wire);
                            ctx.emit(EventKind::Error, &format!("send failed: {err}"));
                            return OpenOutcome::Lost;
                        }
                    }
                }
            },
            event = channel.next_event() => match event {
                ChannelEvent::Text(text) => {
                    match dispatch_inbound(ctx, state, &text) {
                        Dispatch::Continue => {
                            idle_deadline = Instant::now() + ctx.config.inactivity_timeout;
                        }
                        Dispatch::EndConversation => {
                            ctx.log_debug("conversation ended by server, closing connection");
                            channel.close().await;
                            ctx.emit(EventKind::Close, MSG_CONNECTION_CLOSED);
                            return OpenOutcome::Terminal;
                        }
                    }
                }
                ChannelEvent::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => match dispatch_inbound(ctx, state, &text) {
                        Dispatch::Continue => {
                            idle_deadline = Instant::now() + ctx.config.inactivity_timeout;
                        }
                        Dispatch::EndConversation => {
                            ctx.log_debug("conversation ended by server, closing connection");
                            channel.close().await;
                            ctx.emit(EventKind::Close, MSG_CONNECTION_CLOSED);
                            return OpenOutcome::Terminal;
                        }
                    },
                    Err(err) => {
                        ctx.handler.on_error(&format!("failed to decode frame: {err}"));
                    }
                },
                ChannelEvent::Closed => {
                    ctx.emit(EventKind::Close, MSG_CONNECTION_CLOSED);
                    ctx.log_debug("connection closed by peer");
                    return OpenOutcome::Lost;
                }
                ChannelEvent::Error(err) => {
                    ctx.emit(EventKind::Error, &format!("connection error: {err}"));
                    ctx.log_debug(&format!("connection error: {err}"));
                    return OpenOutcome::Lost;
                }
            },
            _ = sleep_until(idle_deadline) => {
                ctx.log_debug("inactivity timeout reached, closing connection");
                channel.close().await;
                ctx.emit(EventKind::Close, "connection closed: inactivity timeout");
                return OpenOutcome::Lost;
            }
        }
    }
}

/// Classifies one decoded frame and applies its effect.
fn dispatch_inbound(ctx: &WorkerCtx, state: &mut SessionState, text: &str) -> Dispatch {
    match classify_frame(text, state.conversation_id.is_some()) {
        InboundFrame::ConversationIdAssignment(id) => {
            ctx.log_debug(&format!("conversation id received: {id}"));
            state.conversation_id = Some(id);
            Dispatch::Continue
        }
        InboundFrame::ConversationEnd => Dispatch::EndConversation,
        InboundFrame::Payload {
            learned_conversation_id,
        } => {
            if let Some(id) = learned_conversation_id {
                ctx.log_debug(&format!("conversation id received: {id}"));
                state.conversation_id = Some(id);
            }
            ctx.handler
                .on_success(text, state.conversation_id.as_deref());
            ctx.log_debug(&format!("message received: {text}"));
            Dispatch::Continue
        }
    }
}

/// Disconnected, non-retrying phase after ceiling exhaustion.
async fn park(
    ctx: &WorkerCtx,
    state: &mut SessionState,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
) -> ParkOutcome {
    ctx.emit(EventKind::Error, MSG_ATTEMPTS_EXHAUSTED);
    ctx.log_debug("maximum reconnect attempts reached");

    loop {
        match cmd_rx.recv().await {
            None | Some(Command::Close) => {
                ctx.log_debug("session closed while disconnected");
                return ParkOutcome::Terminal;
            }
            Some(Command::SetConversationId(id)) => {
                apply_conversation_id(state, id);
            }
            Some(Command::Send { payload, options }) => {
                ctx.handler.on_error(MSG_NOT_OPEN);
                let ceiling = options
                    .max_reconnect_attempts
                    .unwrap_or(ctx.config.max_reconnect_attempts);
                if !ctx.policy.with_ceiling(ceiling).admits(state.attempts) {
                    ctx.handler.on_error(MSG_SEND_EXHAUSTED);
                    continue;
                }
                match OutboundEnvelope::wrap(payload) {
                    Ok(wire) => {
                        set_pending(ctx, state, wire);
                        state.target_override = options.reconnect_target;
                        return ParkOutcome::Reinitiate;
                    }
                    Err(err) => {
                        ctx.handler.on_error(&format!("failed to encode message: {err}"));
                    }
                }
            }
        }
    }
}

/// Fixed-interval wait before the next attempt. Returns false on manual
/// close, which cancels the pending attempt.
async fn reconnect_delay(
    ctx: &WorkerCtx,
    state: &mut SessionState,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
) -> bool {
    let delay = sleep(ctx.policy.interval);
    tokio::pin!(delay);

    loop {
        tokio::select! {
            _ = &mut delay => return true,
            cmd = cmd_rx.recv() => match cmd {
                None | Some(Command::Close) => {
                    ctx.log_debug("manual close canceled pending reconnect");
                    return false;
                }
                Some(Command::SetConversationId(id)) => {
                    apply_conversation_id(state, id);
                }
                Some(Command::Send { payload, options }) => {
                    // The message rides the reconnect cycle already underway.
                    ctx.handler.on_error(MSG_NOT_OPEN);
                    match OutboundEnvelope::wrap(payload) {
                        Ok(wire) => {
                            set_pending(ctx, state, wire);
                            if let Some(target) = options.reconnect_target {
                                state.target_override = Some(target);
                            }
                        }
                        Err(err) => {
                            ctx.handler.on_error(&format!("failed to encode message: {err}"));
                        }
                    }
                }
            }
        }
    }
}

fn set_pending(ctx: &WorkerCtx, state: &mut SessionState, wire: String) {
    if state.pending.replace(wire).is_some() {
        ctx.handler.on_error(MSG_SEND_SUPERSEDED);
    }
}

fn apply_conversation_id(state: &mut SessionState, id: String) {
    let id = id.trim();
    // A known id is never replaced by an empty value.
    if id.is_empty() {
        return;
    }
    state.conversation_id = Some(id.to_string());
}
