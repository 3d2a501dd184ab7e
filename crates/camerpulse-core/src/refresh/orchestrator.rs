use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::errors::RefreshError;
use super::handler::RefreshHandler;
use super::persistence;
use super::telemetry::TelemetrySink;
use super::types::{
    RefreshConfig, RefreshRecord, RefreshSettings, RefreshSnapshot, TaskTelemetry,
    next_refresh_time,
};

type Reply<T> = oneshot::Sender<T>;

enum RefreshCommand {
    Register {
        name: String,
        handler: Arc<dyn RefreshHandler>,
        reply: Reply<Result<(), RefreshError>>,
    },
    Unregister {
        name: String,
        reply: Reply<bool>,
    },
    UpdateConfig {
        overrides: BTreeMap<String, u64>,
        reply: Reply<Vec<String>>,
    },
    ToggleAutoRefresh {
        reply: Reply<bool>,
    },
    SetPageVisible {
        visible: bool,
        reply: Reply<()>,
    },
    ManualRefresh {
        name: String,
        reply: Reply<Result<(), RefreshError>>,
    },
    NextRefreshTime {
        name: String,
        reply: Reply<Result<Option<DateTime<Utc>>, RefreshError>>,
    },
    Telemetry {
        name: String,
        reply: Reply<Option<TaskTelemetry>>,
    },
    Snapshot {
        reply: Reply<RefreshSnapshot>,
    },
}

/// Handle to the refresh scheduler.
///
/// Each registered task gets its own timer. Handler failures are recorded in
/// telemetry and never stop the schedule. Tab-sensitive tasks pause while the
/// page is hidden, and every timer restarts from zero when it becomes
/// visible again.
///
/// Every mutation goes through the actor's command queue, so config
/// read-modify-write cycles never interleave.
pub struct RefreshOrchestrator {
    commands: mpsc::UnboundedSender<RefreshCommand>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshOrchestrator {
    /// Load the stored config over the defaults and start the actor.
    ///
    /// Starts active with the page visible. Must be called from within a
    /// tokio runtime.
    pub fn spawn(settings: RefreshSettings, sink: Arc<dyn TelemetrySink>) -> Self {
        let config = persistence::load_config(settings.state_file.as_deref(), &settings.defaults);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        info!(
            event = "core.refresh.orchestrator_started",
            tasks = config.intervals().len(),
            persisted = settings.state_file.is_some(),
        );

        let actor = RefreshActor {
            settings,
            config,
            sink,
            is_active: true,
            page_visible: true,
            tasks: BTreeMap::new(),
            telemetry: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            executions: JoinSet::new(),
            ticks: ticks_tx,
            next_generation: 0,
        };

        let task = tokio::spawn(actor.run(commands_rx, ticks_rx, cancel.clone()));

        Self {
            commands: commands_tx,
            cancel,
            task: Some(task),
        }
    }

    /// Store `handler` for `name` and start its timer if the task is eligible.
    ///
    /// Registering an already registered name replaces the handler and
    /// restarts the timer.
    pub async fn register_component(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn RefreshHandler>,
    ) -> Result<(), RefreshError> {
        let name = name.into();
        self.request(|reply| RefreshCommand::Register {
            name,
            handler,
            reply,
        })
        .await?
    }

    /// Cancel the timer and forget the handler. Returns whether `name` was
    /// registered.
    pub async fn unregister_component(&self, name: impl Into<String>) -> Result<bool, RefreshError> {
        let name = name.into();
        self.request(|reply| RefreshCommand::Unregister { name, reply })
            .await
    }

    /// Merge interval overrides, persist, and retime affected timers.
    ///
    /// Unknown names and zero intervals are ignored. Returns the names whose
    /// interval changed.
    pub async fn update_config(
        &self,
        overrides: BTreeMap<String, u64>,
    ) -> Result<Vec<String>, RefreshError> {
        self.request(|reply| RefreshCommand::UpdateConfig { overrides, reply })
            .await
    }

    /// Flip the global active flag. Returns the new value.
    pub async fn toggle_auto_refresh(&self) -> Result<bool, RefreshError> {
        self.request(|reply| RefreshCommand::ToggleAutoRefresh { reply })
            .await
    }

    pub async fn set_page_visible(&self, visible: bool) -> Result<(), RefreshError> {
        self.request(|reply| RefreshCommand::SetPageVisible { visible, reply })
            .await
    }

    /// Run the task once now, regardless of timers or the active flag.
    pub async fn manual_refresh(&self, name: impl Into<String>) -> Result<(), RefreshError> {
        let name = name.into();
        self.request(|reply| RefreshCommand::ManualRefresh { name, reply })
            .await?
    }

    /// `last_run_at + interval`, or `None` if the task has not run yet.
    pub async fn next_refresh_time(
        &self,
        name: impl Into<String>,
    ) -> Result<Option<DateTime<Utc>>, RefreshError> {
        let name = name.into();
        self.request(|reply| RefreshCommand::NextRefreshTime { name, reply })
            .await?
    }

    pub async fn telemetry(
        &self,
        name: impl Into<String>,
    ) -> Result<Option<TaskTelemetry>, RefreshError> {
        let name = name.into();
        self.request(|reply| RefreshCommand::Telemetry { name, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<RefreshSnapshot, RefreshError> {
        self.request(|reply| RefreshCommand::Snapshot { reply }).await
    }

    /// Stop the actor, cancelling every timer and in-flight execution.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!(event = "core.refresh.actor_join_failed", error = %e);
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> RefreshCommand,
    ) -> Result<T, RefreshError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .map_err(|_| RefreshError::OrchestratorStopped)?;
        rx.await.map_err(|_| RefreshError::OrchestratorStopped)
    }
}

impl Drop for RefreshOrchestrator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Tick {
    name: String,
    generation: u64,
}

/// Aborts the timer task when dropped.
struct ScheduledTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl Drop for ScheduledTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct TaskEntry {
    handler: Arc<dyn RefreshHandler>,
    timer: Option<ScheduledTimer>,
}

struct ExecutionOutcome {
    name: String,
    started_at: DateTime<Utc>,
    result: Result<(), String>,
    reply: Option<Reply<Result<(), RefreshError>>>,
}

struct RefreshActor {
    settings: RefreshSettings,
    config: RefreshConfig,
    sink: Arc<dyn TelemetrySink>,
    is_active: bool,
    page_visible: bool,
    tasks: BTreeMap<String, TaskEntry>,
    telemetry: BTreeMap<String, TaskTelemetry>,
    /// Running invocations per task, scheduled and manual.
    in_flight: BTreeMap<String, u32>,
    executions: JoinSet<ExecutionOutcome>,
    ticks: mpsc::UnboundedSender<Tick>,
    next_generation: u64,
}

impl RefreshActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<RefreshCommand>,
        mut ticks: mpsc::UnboundedReceiver<Tick>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(tick) = ticks.recv() => self.on_tick(tick),
                Some(joined) = self.executions.join_next(), if !self.executions.is_empty() => {
                    self.on_execution_joined(joined);
                }
            }
        }

        let timers = self.tasks.values().filter(|t| t.timer.is_some()).count();
        self.tasks.clear();
        self.executions.abort_all();
        info!(
            event = "core.refresh.orchestrator_stopped",
            timers_cancelled = timers,
        );
    }

    fn handle_command(&mut self, command: RefreshCommand) {
        match command {
            RefreshCommand::Register {
                name,
                handler,
                reply,
            } => {
                let _ = reply.send(self.register(name, handler));
            }
            RefreshCommand::Unregister { name, reply } => {
                let removed = self.tasks.remove(&name).is_some();
                if removed {
                    info!(event = "core.refresh.task_unregistered", task = %name);
                }
                let _ = reply.send(removed);
            }
            RefreshCommand::UpdateConfig { overrides, reply } => {
                let _ = reply.send(self.update_config(&overrides));
            }
            RefreshCommand::ToggleAutoRefresh { reply } => {
                let _ = reply.send(self.toggle_auto_refresh());
            }
            RefreshCommand::SetPageVisible { visible, reply } => {
                self.set_page_visible(visible);
                let _ = reply.send(());
            }
            RefreshCommand::ManualRefresh { name, reply } => {
                let handler = match self.lookup_handler(&name) {
                    Ok(handler) => handler,
                    Err(e) => {
                        let _ = reply.send(Err(e));
                        return;
                    }
                };
                debug!(event = "core.refresh.manual_started", task = %name);
                self.execute(name, handler, Some(reply));
            }
            RefreshCommand::NextRefreshTime { name, reply } => {
                let result = match self.config.interval_ms(&name) {
                    Some(interval_ms) => Ok(next_refresh_time(self.telemetry.get(&name), interval_ms)),
                    None => Err(RefreshError::UnknownTask { name }),
                };
                let _ = reply.send(result);
            }
            RefreshCommand::Telemetry { name, reply } => {
                let _ = reply.send(self.telemetry.get(&name).cloned());
            }
            RefreshCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn register(&mut self, name: String, handler: Arc<dyn RefreshHandler>) -> Result<(), RefreshError> {
        if !self.config.contains(&name) {
            warn!(event = "core.refresh.register_rejected", task = %name, reason = "unknown task");
            return Err(RefreshError::UnknownTask { name });
        }

        let replaced = self
            .tasks
            .insert(
                name.clone(),
                TaskEntry {
                    handler,
                    timer: None,
                },
            )
            .is_some();

        info!(event = "core.refresh.task_registered", task = %name, replaced);

        if self.is_eligible(&name) {
            self.start_timer(&name);
        }
        Ok(())
    }

    fn update_config(&mut self, overrides: &BTreeMap<String, u64>) -> Vec<String> {
        let (changed, rejected) = self.config.merge_known(overrides);
        for rejection in &rejected {
            warn!(event = "core.refresh.config_value_ignored", reason = %rejection);
        }

        if changed.is_empty() {
            debug!(event = "core.refresh.config_unchanged");
            return changed;
        }

        info!(event = "core.refresh.config_updated", changed = ?changed);

        if let Some(path) = self.settings.state_file.as_deref()
            && let Err(e) = persistence::save_config(path, &self.config)
        {
            warn!(event = "core.refresh.config_save_failed", error = %e);
        }

        for name in &changed {
            if self.tasks.contains_key(name) && self.is_eligible(name) {
                self.start_timer(name);
            }
        }

        changed
    }

    fn toggle_auto_refresh(&mut self) -> bool {
        self.is_active = !self.is_active;
        info!(event = "core.refresh.auto_refresh_toggled", active = self.is_active);

        if self.is_active {
            let names: Vec<String> = self.tasks.keys().cloned().collect();
            for name in names {
                if self.is_eligible(&name) {
                    self.start_timer(&name);
                }
            }
        } else {
            for entry in self.tasks.values_mut() {
                entry.timer = None;
            }
        }
        self.is_active
    }

    fn set_page_visible(&mut self, visible: bool) {
        if self.page_visible == visible {
            return;
        }
        self.page_visible = visible;
        info!(event = "core.refresh.visibility_changed", visible);

        if visible {
            if !self.is_active {
                return;
            }
            // Regaining visibility resets every phase.
            let names: Vec<String> = self.tasks.keys().cloned().collect();
            for name in names {
                self.start_timer(&name);
            }
        } else {
            for (name, entry) in self.tasks.iter_mut() {
                if self.settings.is_tab_sensitive(name) {
                    entry.timer = None;
                }
            }
        }
    }

    fn is_eligible(&self, name: &str) -> bool {
        self.is_active && (self.page_visible || !self.settings.is_tab_sensitive(name))
    }

    /// Replace any existing timer for `name` with a fresh one.
    fn start_timer(&mut self, name: &str) {
        let Some(period) = self.config.interval(name) else {
            return;
        };
        let Some(entry) = self.tasks.get_mut(name) else {
            return;
        };

        self.next_generation += 1;
        let generation = self.next_generation;
        let ticks = self.ticks.clone();
        let task_name = name.to_string();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let tick = Tick {
                    name: task_name.clone(),
                    generation,
                };
                if ticks.send(tick).is_err() {
                    break;
                }
            }
        });

        entry.timer = Some(ScheduledTimer { generation, handle });
        debug!(
            event = "core.refresh.timer_started",
            task = name,
            interval_ms = period.as_millis() as u64,
            generation,
        );
    }

    fn on_tick(&mut self, tick: Tick) {
        let Some(entry) = self.tasks.get(&tick.name) else {
            return;
        };
        let current = entry.timer.as_ref().map(|t| t.generation);
        if current != Some(tick.generation) {
            debug!(
                event = "core.refresh.stale_tick_dropped",
                task = %tick.name,
                generation = tick.generation,
            );
            return;
        }

        if self.in_flight.get(&tick.name).copied().unwrap_or(0) > 0 {
            debug!(
                event = "core.refresh.tick_skipped",
                task = %tick.name,
                reason = "previous run still in flight",
            );
            return;
        }

        let handler = Arc::clone(&entry.handler);
        self.execute(tick.name, handler, None);
    }

    fn lookup_handler(&self, name: &str) -> Result<Arc<dyn RefreshHandler>, RefreshError> {
        if !self.config.contains(name) {
            return Err(RefreshError::UnknownTask {
                name: name.to_string(),
            });
        }
        self.tasks
            .get(name)
            .map(|entry| Arc::clone(&entry.handler))
            .ok_or_else(|| RefreshError::NotRegistered {
                name: name.to_string(),
            })
    }

    fn execute(
        &mut self,
        name: String,
        handler: Arc<dyn RefreshHandler>,
        reply: Option<Reply<Result<(), RefreshError>>>,
    ) {
        *self.in_flight.entry(name.clone()).or_insert(0) += 1;

        self.executions.spawn(async move {
            let started_at = Utc::now();
            let result = match AssertUnwindSafe(handler.execute()).catch_unwind().await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(panic) => Err(panic_message(panic.as_ref())),
            };
            ExecutionOutcome {
                name,
                started_at,
                result,
                reply,
            }
        });
    }

    fn on_execution_joined(&mut self, joined: Result<ExecutionOutcome, JoinError>) {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(event = "core.refresh.execution_join_failed", error = %e);
                return;
            }
        };

        if let Some(count) = self.in_flight.get_mut(&outcome.name) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.in_flight.remove(&outcome.name);
            }
        }

        let telemetry = self.telemetry.entry(outcome.name.clone()).or_default();
        telemetry.last_run_at = Some(outcome.started_at);
        telemetry.run_count += 1;
        telemetry.last_error = outcome.result.as_ref().err().cloned();

        match &outcome.result {
            Ok(()) => debug!(
                event = "core.refresh.execution_completed",
                task = %outcome.name,
                run_count = telemetry.run_count,
            ),
            Err(message) => warn!(
                event = "core.refresh.execution_failed",
                task = %outcome.name,
                run_count = telemetry.run_count,
                error = %message,
            ),
        }

        let record = RefreshRecord {
            component_name: outcome.name.clone(),
            refresh_time: outcome.started_at,
            success: outcome.result.is_ok(),
            error_message: outcome.result.as_ref().err().cloned(),
            interval_ms: self.config.interval_ms(&outcome.name).unwrap_or(0),
        };
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.record(&record).await {
                warn!(
                    event = "core.refresh.telemetry_delivery_failed",
                    task = %record.component_name,
                    error = %e,
                );
            }
        });

        if let Some(reply) = outcome.reply {
            let result = outcome
                .result
                .map_err(|message| RefreshError::HandlerFailed {
                    name: outcome.name,
                    message,
                });
            let _ = reply.send(result);
        }
    }

    fn snapshot(&self) -> RefreshSnapshot {
        RefreshSnapshot {
            is_active: self.is_active,
            page_visible: self.page_visible,
            config: self.config.clone(),
            registered: self.tasks.keys().cloned().collect(),
            live_timers: self
                .tasks
                .iter()
                .filter(|(_, entry)| entry.timer.is_some())
                .map(|(name, _)| name.clone())
                .collect(),
            telemetry: self.telemetry.clone(),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("handler panicked: {}", message)
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::refresh::handler::handler_fn;
    use crate::refresh::telemetry::NoopSink;

    fn counting(counter: &Arc<AtomicUsize>) -> Arc<dyn RefreshHandler> {
        let counter = Arc::clone(counter);
        handler_fn(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    fn orchestrator(settings: RefreshSettings) -> RefreshOrchestrator {
        RefreshOrchestrator::spawn(settings, Arc::new(NoopSink))
    }

    async fn run_count(orchestrator: &RefreshOrchestrator, name: &str) -> u64 {
        orchestrator
            .telemetry(name)
            .await
            .unwrap()
            .map(|t| t.run_count)
            .unwrap_or(0)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<RefreshRecord>>,
    }

    #[async_trait::async_trait]
    impl TelemetrySink for RecordingSink {
        async fn record(&self, record: &RefreshRecord) -> Result<(), RefreshError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_runs_once_per_interval() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([("fast", 1_000)]));
        let counter = Arc::new(AtomicUsize::new(0));
        orchestrator
            .register_component("fast", counting(&counter))
            .await
            .unwrap();

        sleep_ms(3_500).await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(run_count(&orchestrator, "fast").await, 3);
        orchestrator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_unknown_task_rejected() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([("fast", 1_000)]));
        let counter = Arc::new(AtomicUsize::new(0));
        let err = orchestrator
            .register_component("weather", counting(&counter))
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::UnknownTask { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_twice_replaces_handler() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([("fast", 1_000)]));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        orchestrator
            .register_component("fast", counting(&first))
            .await
            .unwrap();
        orchestrator
            .register_component("fast", counting(&second))
            .await
            .unwrap();

        sleep_ms(1_500).await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        let snapshot = orchestrator.snapshot().await.unwrap();
        assert_eq!(snapshot.live_timers, vec!["fast".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregister_leaves_no_timer() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([("fast", 1_000)]));
        let counter = Arc::new(AtomicUsize::new(0));
        orchestrator
            .register_component("fast", counting(&counter))
            .await
            .unwrap();

        assert!(orchestrator.unregister_component("fast").await.unwrap());
        assert!(!orchestrator.unregister_component("fast").await.unwrap());

        let snapshot = orchestrator.snapshot().await.unwrap();
        assert!(snapshot.registered.is_empty());
        assert!(snapshot.live_timers.is_empty());

        sleep_ms(5_000).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_config_restarts_changed_timer() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("refresh_config.json");
        let settings = RefreshSettings::with_tasks([
            ("fast", 1_000),
            ("steady", 1_000),
            ("slow", 60_000),
        ])
        .state_file(&state_file);
        let orchestrator = orchestrator(settings);
        let counter = Arc::new(AtomicUsize::new(0));
        let steady = Arc::new(AtomicUsize::new(0));
        orchestrator
            .register_component("fast", counting(&counter))
            .await
            .unwrap();
        orchestrator
            .register_component("steady", counting(&steady))
            .await
            .unwrap();

        sleep_ms(1_500).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(steady.load(Ordering::SeqCst), 1);

        let changed = orchestrator
            .update_config(BTreeMap::from([
                ("fast".to_string(), 5_000),
                ("slow".to_string(), 60_000),
                ("bogus".to_string(), 10),
            ]))
            .await
            .unwrap();
        assert_eq!(changed, vec!["fast".to_string()]);

        // Untouched tasks keep their original phase: ticks at t=2000 and t=3000.
        sleep_ms(600).await;
        assert_eq!(steady.load(Ordering::SeqCst), 2);
        sleep_ms(1_000).await;
        assert_eq!(steady.load(Ordering::SeqCst), 3);

        // New phase for fast starts at t=1500, next tick at t=6500.
        sleep_ms(2_900).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        sleep_ms(1_000).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        let stored: BTreeMap<String, u64> =
            serde_json::from_str(&std::fs::read_to_string(&state_file).unwrap()).unwrap();
        assert_eq!(stored["fast"], 5_000);
        assert_eq!(stored["steady"], 1_000);
        assert!(!stored.contains_key("bogus"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_config_without_changes_does_not_persist() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("refresh_config.json");
        let orchestrator = orchestrator(
            RefreshSettings::with_tasks([("fast", 1_000)]).state_file(&state_file),
        );

        let changed = orchestrator
            .update_config(BTreeMap::from([("fast".to_string(), 1_000)]))
            .await
            .unwrap();
        assert!(changed.is_empty());
        assert!(!state_file.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_page_pauses_only_tab_sensitive_tasks() {
        let settings =
            RefreshSettings::with_tasks([("stream", 1_000), ("alerts", 1_000)]).tab_sensitive(["stream"]);
        let orchestrator = orchestrator(settings);
        let stream = Arc::new(AtomicUsize::new(0));
        let alerts = Arc::new(AtomicUsize::new(0));
        orchestrator
            .register_component("stream", counting(&stream))
            .await
            .unwrap();
        orchestrator
            .register_component("alerts", counting(&alerts))
            .await
            .unwrap();

        orchestrator.set_page_visible(false).await.unwrap();
        let snapshot = orchestrator.snapshot().await.unwrap();
        assert_eq!(snapshot.live_timers, vec!["alerts".to_string()]);

        sleep_ms(3_500).await;
        assert_eq!(stream.load(Ordering::SeqCst), 0);
        assert_eq!(alerts.load(Ordering::SeqCst), 3);

        // Visible at t=3500: both phases restart, next ticks at t=4500.
        orchestrator.set_page_visible(true).await.unwrap();
        sleep_ms(700).await;
        assert_eq!(alerts.load(Ordering::SeqCst), 3);
        assert_eq!(stream.load(Ordering::SeqCst), 0);

        sleep_ms(400).await;
        assert_eq!(alerts.load(Ordering::SeqCst), 4);
        assert_eq!(stream.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_while_hidden_defers_tab_sensitive_timer() {
        let settings = RefreshSettings::with_tasks([("stream", 1_000)]).tab_sensitive(["stream"]);
        let orchestrator = orchestrator(settings);
        orchestrator.set_page_visible(false).await.unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        orchestrator
            .register_component("stream", counting(&counter))
            .await
            .unwrap();

        sleep_ms(2_500).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(orchestrator.snapshot().await.unwrap().live_timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_auto_refresh() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([("fast", 1_000)]));
        let counter = Arc::new(AtomicUsize::new(0));
        orchestrator
            .register_component("fast", counting(&counter))
            .await
            .unwrap();

        assert!(!orchestrator.toggle_auto_refresh().await.unwrap());
        let snapshot = orchestrator.snapshot().await.unwrap();
        assert!(!snapshot.is_active);
        assert!(snapshot.live_timers.is_empty());
        assert_eq!(snapshot.registered, vec!["fast".to_string()]);

        sleep_ms(5_000).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert!(orchestrator.toggle_auto_refresh().await.unwrap());
        sleep_ms(1_500).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_back_on_uses_current_intervals() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([
            ("alerts", 1_000),
            ("metrics", 2_000),
            ("widgets", 3_000),
        ]));
        let alerts = Arc::new(AtomicUsize::new(0));
        let metrics = Arc::new(AtomicUsize::new(0));
        let widgets = Arc::new(AtomicUsize::new(0));
        for (name, counter) in [("alerts", &alerts), ("metrics", &metrics), ("widgets", &widgets)] {
            orchestrator
                .register_component(name, counting(counter))
                .await
                .unwrap();
        }

        assert!(!orchestrator.toggle_auto_refresh().await.unwrap());
        let changed = orchestrator
            .update_config(BTreeMap::from([("metrics".to_string(), 4_000)]))
            .await
            .unwrap();
        assert_eq!(changed, vec!["metrics".to_string()]);
        // Still inactive: the change must not resurrect a timer.
        assert!(orchestrator.snapshot().await.unwrap().live_timers.is_empty());

        // Toggling twice more must not stack duplicate timers.
        assert!(orchestrator.toggle_auto_refresh().await.unwrap());
        assert!(!orchestrator.toggle_auto_refresh().await.unwrap());
        assert!(orchestrator.toggle_auto_refresh().await.unwrap());

        let snapshot = orchestrator.snapshot().await.unwrap();
        assert_eq!(snapshot.live_timers, snapshot.registered);
        assert_eq!(snapshot.live_timers.len(), 3);

        sleep_ms(3_500).await;
        assert_eq!(alerts.load(Ordering::SeqCst), 3);
        assert_eq!(metrics.load(Ordering::SeqCst), 0);
        assert_eq!(widgets.load(Ordering::SeqCst), 1);

        sleep_ms(1_000).await;
        assert_eq!(alerts.load(Ordering::SeqCst), 4);
        assert_eq!(metrics.load(Ordering::SeqCst), 1);
        assert_eq!(widgets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_handler_keeps_schedule() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([("flaky", 1_000)]));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = handler_fn(move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("backend unavailable".into())
                } else {
                    Ok(())
                }
            }
        });
        orchestrator.register_component("flaky", handler).await.unwrap();

        sleep_ms(1_500).await;
        let telemetry = orchestrator.telemetry("flaky").await.unwrap().unwrap();
        assert_eq!(telemetry.run_count, 1);
        assert_eq!(telemetry.last_error.as_deref(), Some("backend unavailable"));

        sleep_ms(1_000).await;
        let telemetry = orchestrator.telemetry("flaky").await.unwrap().unwrap();
        assert_eq!(telemetry.run_count, 2);
        assert_eq!(telemetry.last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_handler_is_recorded() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([("broken", 1_000)]));
        let handler = handler_fn(|| async { panic!("widget exploded") });
        orchestrator.register_component("broken", handler).await.unwrap();

        sleep_ms(2_500).await;
        let telemetry = orchestrator.telemetry("broken").await.unwrap().unwrap();
        assert_eq!(telemetry.run_count, 2);
        assert_eq!(
            telemetry.last_error.as_deref(),
            Some("handler panicked: widget exploded")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_handler_skips_overlapping_ticks() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([("slow", 1_000)]));
        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        let handler = handler_fn(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2_500)).await;
                Ok(())
            }
        });
        orchestrator.register_component("slow", handler).await.unwrap();

        // Run starts at t=1000 and ends at t=3500; ticks at 2000 and 3000 are skipped.
        sleep_ms(3_600).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(run_count(&orchestrator, "slow").await, 1);

        sleep_ms(500).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([
            ("fast", 1_000),
            ("failing", 1_000),
            ("idle", 1_000),
        ]));
        orchestrator.toggle_auto_refresh().await.unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        orchestrator
            .register_component("fast", counting(&counter))
            .await
            .unwrap();
        orchestrator
            .register_component("failing", handler_fn(|| async { Err("nope".into()) }))
            .await
            .unwrap();

        orchestrator.manual_refresh("fast").await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(run_count(&orchestrator, "fast").await, 1);

        let err = orchestrator.manual_refresh("failing").await.unwrap_err();
        assert!(matches!(err, RefreshError::HandlerFailed { ref message, .. } if message == "nope"));
        let telemetry = orchestrator.telemetry("failing").await.unwrap().unwrap();
        assert_eq!(telemetry.last_error.as_deref(), Some("nope"));

        assert!(matches!(
            orchestrator.manual_refresh("idle").await.unwrap_err(),
            RefreshError::NotRegistered { .. }
        ));
        assert!(matches!(
            orchestrator.manual_refresh("weather").await.unwrap_err(),
            RefreshError::UnknownTask { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_refresh_time() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([("fast", 15_000)]));
        let counter = Arc::new(AtomicUsize::new(0));
        orchestrator
            .register_component("fast", counting(&counter))
            .await
            .unwrap();

        assert_eq!(orchestrator.next_refresh_time("fast").await.unwrap(), None);

        orchestrator.manual_refresh("fast").await.unwrap();
        let telemetry = orchestrator.telemetry("fast").await.unwrap().unwrap();
        let last_run_at = telemetry.last_run_at.unwrap();
        assert_eq!(
            orchestrator.next_refresh_time("fast").await.unwrap(),
            Some(last_run_at + chrono::Duration::seconds(15))
        );

        assert!(orchestrator.next_refresh_time("weather").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stored_config_rehydrated() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("refresh_config.json");
        std::fs::write(&state_file, r#"{"fast": 3000}"#).unwrap();

        let orchestrator = orchestrator(
            RefreshSettings::with_tasks([("fast", 1_000), ("slow", 9_000)]).state_file(&state_file),
        );
        let snapshot = orchestrator.snapshot().await.unwrap();
        assert_eq!(snapshot.config.interval_ms("fast"), Some(3_000));
        assert_eq!(snapshot.config.interval_ms("slow"), Some(9_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_stored_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("refresh_config.json");
        std::fs::write(&state_file, "][").unwrap();

        let orchestrator = orchestrator(
            RefreshSettings::with_tasks([("fast", 1_000)]).state_file(&state_file),
        );
        let snapshot = orchestrator.snapshot().await.unwrap();
        assert_eq!(snapshot.config.interval_ms("fast"), Some(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_execution_reaches_sink() {
        let sink = Arc::new(RecordingSink::default());
        let orchestrator = RefreshOrchestrator::spawn(
            RefreshSettings::with_tasks([("ok", 1_000), ("bad", 2_000)]),
            sink.clone(),
        );
        let counter = Arc::new(AtomicUsize::new(0));
        orchestrator
            .register_component("ok", counting(&counter))
            .await
            .unwrap();
        orchestrator
            .register_component("bad", handler_fn(|| async { Err("down".into()) }))
            .await
            .unwrap();

        sleep_ms(2_500).await;

        let records = sink.records.lock().unwrap().clone();
        assert_eq!(records.len(), 3);
        let bad: Vec<_> = records
            .iter()
            .filter(|r| r.component_name == "bad")
            .collect();
        assert_eq!(bad.len(), 1);
        assert!(!bad[0].success);
        assert_eq!(bad[0].error_message.as_deref(), Some("down"));
        assert_eq!(bad[0].interval_ms, 2_000);
        assert!(
            records
                .iter()
                .filter(|r| r.component_name == "ok")
                .all(|r| r.success && r.interval_ms == 1_000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_timers() {
        let orchestrator = orchestrator(RefreshSettings::with_tasks([("fast", 1_000)]));
        let counter = Arc::new(AtomicUsize::new(0));
        orchestrator
            .register_component("fast", counting(&counter))
            .await
            .unwrap();

        sleep_ms(1_500).await;
        orchestrator.shutdown().await;

        sleep_ms(5_000).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "handler panicked: boom");
        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "handler panicked");
    }
}
