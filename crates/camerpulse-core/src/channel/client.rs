use std::collections::BTreeSet;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::buffer::EventBuffer;
use super::errors::ChannelError;
use super::protocol::{DEFAULT_CHANNEL, InboundFrame, NotificationEvent, OutboundFrame, Subscription};
use super::transport::{Connector, Transport};
use super::types::{
    ChannelOptions, ChannelSignal, ChannelStatus, ConnectionState, MAX_PING_INTERVAL, Toast,
};
use crate::notify::DesktopNotification;

type ConnectResult = Result<Box<dyn Transport>, ChannelError>;

enum ChannelCommand {
    Connect,
    Disconnect,
    Subscribe(Subscription),
    Unsubscribe(Subscription),
    Send(OutboundFrame),
    RecentEvents(oneshot::Sender<Vec<NotificationEvent>>),
}

/// Handle to the realtime notification channel.
///
/// All connection state lives in a background actor task; this handle only
/// sends commands to it and reads the published status. Outbound operations
/// are best-effort: anything issued while the channel is not connected is
/// dropped, never queued.
///
/// Dropping the handle stops the actor and closes the socket. Use
/// [`RealtimeChannel::shutdown`] to wait for that to finish.
pub struct RealtimeChannel {
    commands: mpsc::UnboundedSender<ChannelCommand>,
    status: watch::Receiver<ChannelStatus>,
    signals: broadcast::Sender<ChannelSignal>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RealtimeChannel {
    /// Start the channel actor. Does not connect; call [`connect`](Self::connect).
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C: Connector>(connector: C, options: ChannelOptions) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ChannelStatus::default());
        let (signals_tx, _) = broadcast::channel(options.signal_capacity.max(1));
        let cancel = CancellationToken::new();

        let actor = ChannelActor {
            connector: Arc::new(connector),
            events: EventBuffer::new(options.buffer_capacity),
            options,
            status: ChannelStatus::default(),
            status_tx,
            signals: signals_tx.clone(),
            transport: None,
            pending_connect: None,
            reconnect_timer: None,
            ping: None,
            subscriptions: BTreeSet::new(),
        };

        let task = tokio::spawn(actor.run(commands_rx, cancel.clone()));

        Self {
            commands: commands_tx,
            status: status_rx,
            signals: signals_tx,
            cancel,
            task: Some(task),
        }
    }

    /// Open the connection. No-op while connecting or connected.
    ///
    /// Also cancels any pending automatic reconnect and retries immediately.
    /// The reconnect counter is left alone; only a successful open resets it.
    pub fn connect(&self) {
        self.dispatch(ChannelCommand::Connect);
    }

    /// Close the connection and stop automatic reconnection.
    pub fn disconnect(&self) {
        self.dispatch(ChannelCommand::Disconnect);
    }

    pub fn subscribe(&self, subscription: Subscription) {
        self.dispatch(ChannelCommand::Subscribe(subscription));
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.dispatch(ChannelCommand::Unsubscribe(subscription));
    }

    /// Transmit a frame if connected; dropped silently otherwise.
    pub fn send(&self, frame: OutboundFrame) {
        self.dispatch(ChannelCommand::Send(frame));
    }

    pub fn status(&self) -> ChannelStatus {
        self.status.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    /// Receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }

    /// Subscribe to state changes, notifications and the terminal
    /// connection-lost signal.
    pub fn signals(&self) -> broadcast::Receiver<ChannelSignal> {
        self.signals.subscribe()
    }

    /// Recent notifications, oldest first.
    pub async fn recent_events(&self) -> Result<Vec<NotificationEvent>, ChannelError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(ChannelCommand::RecentEvents(tx))
            .map_err(|_| ChannelError::ChannelClosed)?;
        rx.await.map_err(|_| ChannelError::ChannelClosed)
    }

    /// Stop the actor and wait until the socket and timers are released.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!(event = "core.channel.actor_join_failed", error = %e);
        }
    }

    fn dispatch(&self, command: ChannelCommand) {
        if self.commands.send(command).is_err() {
            debug!(
                event = "core.channel.command_dropped",
                reason = "actor stopped",
            );
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct ChannelActor {
    connector: Arc<dyn Connector>,
    options: ChannelOptions,
    status: ChannelStatus,
    status_tx: watch::Sender<ChannelStatus>,
    signals: broadcast::Sender<ChannelSignal>,
    transport: Option<Box<dyn Transport>>,
    pending_connect: Option<JoinHandle<ConnectResult>>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    ping: Option<Interval>,
    events: EventBuffer<NotificationEvent>,
    /// Caller subscriptions that reached the server, replayed on reconnect.
    subscriptions: BTreeSet<Subscription>,
}

impl ChannelActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<ChannelCommand>,
        cancel: CancellationToken,
    ) {
        debug!(
            event = "core.channel.actor_started",
            endpoint = self.connector.endpoint(),
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                result = join_pending(&mut self.pending_connect) => {
                    self.pending_connect = None;
                    self.on_connect_result(result).await;
                }
                _ = sleep_pending(&mut self.reconnect_timer) => {
                    self.reconnect_timer = None;
                    self.start_connect();
                }
                _ = tick_pending(&mut self.ping) => {
                    self.send_frame(&OutboundFrame::Ping).await;
                }
                frame = next_frame(&mut self.transport) => match frame {
                    Some(Ok(text)) => self.handle_text(&text),
                    Some(Err(e)) => {
                        warn!(event = "core.channel.transport_error", error = %e);
                        self.on_closed();
                    }
                    None => self.on_closed(),
                },
            }
        }

        self.teardown().await;
        debug!(event = "core.channel.actor_stopped");
    }

    async fn handle_command(&mut self, command: ChannelCommand) {
        match command {
            ChannelCommand::Connect => {
                if self.transport.is_some() || self.pending_connect.is_some() {
                    debug!(
                        event = "core.channel.connect_skipped",
                        state = %self.status.state,
                    );
                    return;
                }
                self.reconnect_timer = None;
                self.start_connect();
            }
            ChannelCommand::Disconnect => self.close_manually().await,
            ChannelCommand::Subscribe(subscription) => {
                if self.transport.is_none() {
                    debug!(
                        event = "core.channel.subscribe_dropped",
                        subscription = ?subscription,
                    );
                    return;
                }
                if self.send_frame(&subscription.subscribe_frame()).await {
                    self.subscriptions.insert(subscription);
                }
            }
            ChannelCommand::Unsubscribe(subscription) => {
                self.subscriptions.remove(&subscription);
                if self.transport.is_none() {
                    debug!(
                        event = "core.channel.unsubscribe_dropped",
                        subscription = ?subscription,
                    );
                    return;
                }
                self.send_frame(&subscription.unsubscribe_frame()).await;
            }
            ChannelCommand::Send(frame) => {
                if self.transport.is_none() {
                    debug!(event = "core.channel.send_dropped", frame = ?frame);
                    return;
                }
                self.send_frame(&frame).await;
            }
            ChannelCommand::RecentEvents(reply) => {
                let _ = reply.send(self.events.contents());
            }
        }
    }

    fn start_connect(&mut self) {
        let connector = Arc::clone(&self.connector);
        let timeout = self.options.connect_timeout;

        info!(
            event = "core.channel.connect_started",
            endpoint = connector.endpoint(),
            attempt = self.status.reconnect_attempt,
        );

        self.pending_connect = Some(tokio::spawn(async move {
            match tokio::time::timeout(timeout, connector.connect()).await {
                Ok(result) => result,
                Err(_) => Err(ChannelError::ConnectTimeout {
                    seconds: timeout.as_secs(),
                }),
            }
        }));
        self.set_state(ConnectionState::Connecting);
        self.publish();
    }

    async fn on_connect_result(&mut self, result: Result<ConnectResult, JoinError>) {
        let transport = match result {
            Ok(Ok(transport)) => transport,
            Ok(Err(e)) => {
                warn!(event = "core.channel.connect_failed", error = %e);
                self.on_closed();
                return;
            }
            Err(e) => {
                error!(event = "core.channel.connect_task_failed", error = %e);
                self.on_closed();
                return;
            }
        };

        self.transport = Some(transport);
        self.status.reconnect_attempt = 0;
        self.status.connection_lost = false;
        self.status.authenticated = false;
        self.status.connection_id = None;

        let period = self
            .options
            .ping_interval
            .clamp(Duration::from_millis(1), MAX_PING_INTERVAL);
        let mut ping = tokio::time::interval_at(Instant::now() + period, period);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ping = Some(ping);

        self.set_state(ConnectionState::Connected);
        self.publish();

        info!(
            event = "core.channel.connect_completed",
            endpoint = self.connector.endpoint(),
        );

        if let Some(user_id) = self.options.user_id.clone() {
            self.send_frame(&OutboundFrame::Authenticate { user_id }).await;
        }
        self.send_frame(&OutboundFrame::SubscribeChannel {
            channel: DEFAULT_CHANNEL.to_string(),
        })
        .await;

        if self.options.replay_subscriptions {
            let replay: Vec<Subscription> = self.subscriptions.iter().cloned().collect();
            for subscription in replay {
                self.send_frame(&subscription.subscribe_frame()).await;
            }
        } else {
            self.subscriptions.clear();
        }
    }

    /// Transport closed or a connect attempt failed: schedule the next
    /// attempt or give up.
    fn on_closed(&mut self) {
        self.transport = None;
        self.ping = None;
        self.status.connection_id = None;
        self.status.authenticated = false;
        self.set_state(ConnectionState::Disconnected);

        let attempt = self.status.reconnect_attempt;
        match self.options.reconnect.delay_for(attempt) {
            Some(delay) => {
                self.status.reconnect_attempt = attempt + 1;
                self.reconnect_timer = Some(Box::pin(tokio::time::sleep(delay)));
                info!(
                    event = "core.channel.reconnect_scheduled",
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                );
            }
            None => {
                self.status.connection_lost = true;
                error!(
                    event = "core.channel.connection_lost",
                    attempts = attempt,
                    "Max reconnect attempts reached, giving up"
                );
                let _ = self
                    .signals
                    .send(ChannelSignal::ConnectionLost { attempts: attempt });
            }
        }
        self.publish();
    }

    async fn close_manually(&mut self) {
        if let Some(pending) = self.pending_connect.take() {
            pending.abort();
        }
        self.reconnect_timer = None;
        self.ping = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        self.status.connection_id = None;
        self.status.authenticated = false;
        self.set_state(ConnectionState::Disconnected);
        self.publish();
        info!(event = "core.channel.disconnected");
    }

    async fn teardown(&mut self) {
        if let Some(pending) = self.pending_connect.take() {
            pending.abort();
        }
        self.reconnect_timer = None;
        self.ping = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        self.status.connection_id = None;
        self.status.authenticated = false;
        self.set_state(ConnectionState::Disconnected);
        self.publish();
    }

    /// Returns true if the frame was handed to the transport.
    async fn send_frame(&mut self, frame: &OutboundFrame) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };

        let text = match frame.encode() {
            Ok(text) => text,
            Err(e) => {
                error!(event = "core.channel.encode_failed", error = %e);
                return false;
            }
        };

        match transport.send_text(text).await {
            Ok(()) => true,
            Err(e) => {
                // The read side reports the close; nothing to do here.
                warn!(event = "core.channel.send_failed", error = %e);
                false
            }
        }
    }

    fn handle_text(&mut self, text: &str) {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(event = "core.channel.frame_malformed", error = %e);
                return;
            }
        };

        match frame {
            InboundFrame::ConnectionEstablished { connection_id, .. } => {
                debug!(
                    event = "core.channel.connection_established",
                    connection_id = %connection_id,
                );
                self.status.connection_id = Some(connection_id);
                self.publish();
            }
            InboundFrame::Authenticated { .. } => {
                self.status.authenticated = true;
                self.publish();
            }
            InboundFrame::Subscribed { .. } | InboundFrame::Pong { .. } => {}
            InboundFrame::Unknown => {
                debug!(event = "core.channel.frame_ignored");
            }
            frame @ (InboundFrame::Notification { .. }
            | InboundFrame::TenderUpdate { .. }
            | InboundFrame::UserNotification { .. }) => {
                if let Some(event) = frame.into_event() {
                    self.handle_notification(event);
                }
            }
        }
    }

    fn handle_notification(&mut self, event: NotificationEvent) {
        let toast = Toast::for_event(&event);

        info!(
            event = "core.channel.notification_received",
            kind = %event.kind,
            resource_id = ?event.resource_id,
            toast_ms = toast.duration.as_millis() as u64,
        );

        self.events.push(event.clone());

        if self.options.native_notifications {
            let notification = DesktopNotification::from_toast(&toast, event.kind);
            tokio::task::spawn_blocking(move || notification.send());
        }

        // No receivers is normal when nothing renders toasts.
        let _ = self
            .signals
            .send(ChannelSignal::Notification { event, toast });
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.status.state != state {
            self.status.state = state;
            let _ = self.signals.send(ChannelSignal::StateChanged(state));
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status.clone());
    }
}

async fn join_pending(
    handle: &mut Option<JoinHandle<ConnectResult>>,
) -> Result<ConnectResult, JoinError> {
    match handle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn sleep_pending(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn tick_pending(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn next_frame(
    transport: &mut Option<Box<dyn Transport>>,
) -> Option<Result<String, ChannelError>> {
    match transport {
        Some(transport) => transport.next_text().await,
        None => std::future::pending().await,
    }
}
