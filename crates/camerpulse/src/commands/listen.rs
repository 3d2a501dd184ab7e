use clap::ArgMatches;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use camerpulse_core::channel::{
    ChannelSignal, ChannelStatus, NotificationEvent, RealtimeChannel, Subscription, Toast,
    WebSocketConnector,
};
use camerpulse_core::events;

use super::load_config_with_warning;

pub(crate) fn handle_listen_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config_with_warning();

    // Apply CLI overrides only if provided
    if let Some(url) = matches.get_one::<String>("url") {
        config.channel.url = Some(url.clone());
    }
    if let Some(user_id) = matches.get_one::<String>("user-id") {
        config.channel.user_id = Some(user_id.clone());
    }
    if matches.get_flag("notify") {
        config.channel.native_notifications = Some(true);
    }
    if let Err(e) = config.validate() {
        eprintln!("❌ {}", e);
        return Err(e.into());
    }

    let mut subscriptions: Vec<Subscription> = matches
        .get_many::<String>("channel")
        .unwrap_or_default()
        .map(|name| Subscription::Channel(name.clone()))
        .collect();
    subscriptions.extend(
        matches
            .get_many::<String>("tender")
            .unwrap_or_default()
            .map(|id| Subscription::Tender(id.clone())),
    );
    let json = matches.get_flag("json");

    info!(
        event = "cli.listen_started",
        url = config.channel.url(),
        subscriptions = subscriptions.len(),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(listen(config, subscriptions, json))
}

async fn listen(
    config: camerpulse_core::PulseConfig,
    subscriptions: Vec<Subscription>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let channel = RealtimeChannel::spawn(
        WebSocketConnector::new(config.channel.url()),
        config.channel_options(),
    );
    let mut signals = channel.signals();
    let mut status = channel.watch_status();

    channel.connect();

    // Subscriptions sent while disconnected are dropped, so wait for the
    // first open. Later reconnects replay them.
    let connected = tokio::select! {
        result = status.wait_for(|s: &ChannelStatus| s.is_connected() || s.connection_lost) => {
            result.map(|s| s.is_connected()).unwrap_or(false)
        }
        _ = tokio::signal::ctrl_c() => {
            channel.shutdown().await;
            return Ok(());
        }
    };

    if !connected {
        eprintln!("❌ Could not connect to {}", config.channel.url());
        channel.shutdown().await;
        return Err(format!("Could not connect to {}", config.channel.url()).into());
    }

    eprintln!("Connected to {}. Press Ctrl-C to stop.", config.channel.url());
    for subscription in subscriptions {
        channel.subscribe(subscription);
    }

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            signal = signals.recv() => {
                if let Ok(signal) = &signal {
                    events::log_channel_signal(signal);
                }
                match signal {
                    Ok(ChannelSignal::Notification { event, toast }) => {
                        println!("{}", render_notification(&event, &toast, json)?);
                    }
                    Ok(ChannelSignal::StateChanged(state)) => {
                        eprintln!("Connection {}", state);
                    }
                    Ok(ChannelSignal::ConnectionLost { attempts }) => {
                        eprintln!("❌ Connection lost after {} reconnect attempts", attempts);
                        break Err(format!(
                            "Connection lost after {} reconnect attempts",
                            attempts
                        ));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(event = "cli.listen_lagged", skipped = skipped);
                    }
                    Err(RecvError::Closed) => break Ok(()),
                }
            }
        }
    };

    channel.shutdown().await;
    outcome.map_err(Into::into)
}

fn render_notification(
    event: &NotificationEvent,
    toast: &Toast,
    json: bool,
) -> Result<String, serde_json::Error> {
    if json {
        return serde_json::to_string(event);
    }
    Ok(format!(
        "[{}] {}: {}",
        event.received_at.format("%H:%M:%S"),
        toast.title,
        toast.description
    ))
}
