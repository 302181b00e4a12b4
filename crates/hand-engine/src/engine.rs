use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use hand_core::actuator::{clamp_request, rest_positions};
use hand_core::document::actuator_ids;
use hand_core::protocol::BAUD_RATE;
use hand_core::{ActuatorId, GestureStore, PositionMap, PositionRequest};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bus::{BusError, Transport};
use crate::channel::{self, ChannelManager};
use crate::commander::BatchCommander;
use crate::error::{CommandError, EngineError, GestureError, Result};
use crate::executions::{ExecutionLog, ExecutionRecord};
use crate::executor;
use crate::registry::PositionRegistry;

// ─── Configuration ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on every individual bus operation.
    pub io_timeout: Duration,
    pub baud_rate: u32,
    /// How long `shutdown` waits for the loop to finish.
    pub shutdown_grace: Duration,
    pub queue_depth: usize,
    pub execution_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(5),
            baud_rate: BAUD_RATE,
            shutdown_grace: Duration::from_secs(10),
            queue_depth: 64,
            execution_history: 64,
        }
    }
}

// ─── Events ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub device: Option<String>,
}

/// Broadcast to subscribers after state changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Positions { positions: PositionMap },
    Connection(ConnectionStatus),
    Execution(ExecutionRecord),
    /// Sent once when the engine stops accepting commands.
    ShuttingDown,
}

impl EngineEvent {
    /// SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Positions { .. } => "positions",
            Self::Connection(_) => "connection",
            Self::Execution(_) => "execution",
            Self::ShuttingDown => "shutting_down",
        }
    }
}

// ─── Commands ─────────────────────────────────────────────────────────────

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    Connect { device: String, reply: Reply<()> },
    Disconnect { reply: Reply<()> },
    Write { request: PositionRequest, reply: Reply<PositionMap> },
    SetDefault { reply: Reply<()> },
    ReloadLimits { reply: Reply<()> },
    Execute { id: Uuid, gesture: String, staged: bool, reply: Reply<()> },
    Shutdown { reply: Reply<()> },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::Write { .. } => "write",
            Self::SetDefault { .. } => "set_default",
            Self::ReloadLimits { .. } => "reload_limits",
            Self::Execute { .. } => "execute",
            Self::Shutdown { .. } => "shutdown",
        }
    }

    /// Answer without doing any work.
    fn reject(self, err: EngineError) {
        match self {
            Self::Connect { reply, .. }
            | Self::Disconnect { reply }
            | Self::SetDefault { reply }
            | Self::ReloadLimits { reply }
            | Self::Execute { reply, .. }
            | Self::Shutdown { reply } => {
                let _ = reply.send(Err(err));
            }
            Self::Write { reply, .. } => {
                let _ = reply.send(Err(err));
            }
        }
    }
}

// ─── Shared state ─────────────────────────────────────────────────────────

struct Shared {
    store: GestureStore,
    registry: PositionRegistry,
    executions: ExecutionLog,
    status: RwLock<ConnectionStatus>,
    events: broadcast::Sender<EngineEvent>,
    accepting: AtomicBool,
    transport: Arc<dyn Transport>,
    config: EngineConfig,
}

impl Shared {
    fn publish(&self, event: EngineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn set_status(&self, device: Option<&str>) {
        let status = ConnectionStatus {
            connected: device.is_some(),
            device: device.map(str::to_string),
        };
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status.clone();
        self.publish(EngineEvent::Connection(status));
    }

    fn publish_positions(&self) {
        self.publish(EngineEvent::Positions {
            positions: self.registry.snapshot(),
        });
    }
}

// ─── Engine loop ──────────────────────────────────────────────────────────

/// Single consumer of the command queue. Owns the channel, so at most one
/// command touches the bus at a time.
struct Engine {
    shared: Arc<Shared>,
    channel: ChannelManager,
}

impl Engine {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            let accepting = self.shared.accepting.load(Ordering::SeqCst);
            if !accepting && !matches!(cmd, Command::Shutdown { .. } | Command::Disconnect { .. }) {
                self.reject(cmd);
                continue;
            }
            if let Command::Shutdown { reply } = cmd {
                self.shutdown().await;
                let _ = reply.send(Ok(()));
                // Anything still queued is answered before the loop exits.
                rx.close();
                while let Some(cmd) = rx.recv().await {
                    self.reject(cmd);
                }
                return;
            }
            self.handle(cmd).await;
        }

        // Every handle dropped.
        self.shutdown().await;
    }

    fn reject(&self, cmd: Command) {
        debug!(command = cmd.name(), "rejected: shutting down");
        if let Command::Execute { id, .. } = &cmd {
            let error = EngineError::ShuttingDown.to_string();
            if let Some(record) = self.shared.executions.finish(*id, Some(error)) {
                self.shared.publish(EngineEvent::Execution(record));
            }
        }
        cmd.reject(EngineError::ShuttingDown);
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { device, reply } => {
                let result = self.connect(&device).await;
                let _ = reply.send(result);
            }
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(Ok(()));
            }
            Command::Write { request, reply } => {
                let result = self.write(&request).await;
                let _ = reply.send(result);
            }
            Command::SetDefault { reply } => {
                let result = self.set_default().await;
                let _ = reply.send(result);
            }
            Command::ReloadLimits { reply } => {
                self.reload_limits();
                let _ = reply.send(Ok(()));
            }
            Command::Execute {
                id,
                gesture,
                staged,
                reply,
            } => {
                let result = self.execute(id, &gesture, staged).await;
                let _ = reply.send(result);
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn actuators(&self) -> Vec<ActuatorId> {
        actuator_ids(&self.shared.store.limits())
    }

    async fn connect(&mut self, device: &str) -> Result<()> {
        let actuators = self.actuators();
        let result = self.channel.connect(device, &actuators).await;
        self.shared.set_status(self.channel.device());
        result.map_err(EngineError::from)
    }

    async fn disconnect(&mut self) {
        let was_connected = self.channel.is_connected();
        let actuators = self.actuators();
        self.channel.disconnect(&actuators).await;
        if was_connected {
            self.shared.set_status(None);
        }
    }

    async fn write(&mut self, request: &PositionRequest) -> Result<PositionMap> {
        let limits = self.shared.store.limits();
        self.shared.registry.reconcile(&limits);
        let positions =
            clamp_request(&limits, request).map_err(CommandError::UnknownActuator)?;
        BatchCommander::new(&self.channel, &self.shared.registry)
            .write(&limits, &positions)
            .await?;
        if !positions.is_empty() {
            self.shared.publish_positions();
        }
        Ok(positions)
    }

    async fn set_default(&mut self) -> Result<()> {
        if !self.channel.is_connected() {
            debug!("move to default skipped: not connected");
            return Ok(());
        }
        let limits = self.shared.store.limits();
        self.shared.registry.reconcile(&limits);
        BatchCommander::new(&self.channel, &self.shared.registry)
            .write(&limits, &rest_positions(&limits))
            .await?;
        self.shared.publish_positions();
        Ok(())
    }

    /// Registry writes only ever happen on this loop, so a limits change
    /// cannot race a frame that is still on the bus.
    fn reload_limits(&mut self) {
        self.shared.registry.reconcile(&self.shared.store.limits());
        self.shared.publish_positions();
    }

    async fn execute(&mut self, id: Uuid, gesture: &str, staged: bool) -> Result<()> {
        if let Some(record) = self.shared.executions.start(id) {
            self.shared.publish(EngineEvent::Execution(record));
        }
        info!(execution_id = %id, gesture, staged, "executing gesture");

        let result = self.run_gesture(gesture, staged).await;

        let error = result.as_ref().err().map(ToString::to_string);
        match &error {
            None => info!(execution_id = %id, gesture, "gesture complete"),
            Some(e) => warn!(execution_id = %id, gesture, "gesture failed: {e}"),
        }
        if let Some(record) = self.shared.executions.finish(id, error) {
            self.shared.publish(EngineEvent::Execution(record));
        }
        result.map_err(EngineError::from)
    }

    async fn run_gesture(&mut self, gesture: &str, staged: bool) -> std::result::Result<(), GestureError> {
        // The gesture may have been removed or edited while queued.
        let target = self
            .shared
            .store
            .gesture(gesture)
            .ok_or_else(|| GestureError::NotFound(gesture.to_string()))?;
        let limits = self.shared.store.limits();
        self.shared.registry.reconcile(&limits);
        let steps = executor::plan(&limits, &target, staged)?;
        let delay = self.shared.store.settings().gesture_step_delay();

        let shared = Arc::clone(&self.shared);
        let commander = BatchCommander::new(&self.channel, &self.shared.registry);
        executor::run(&commander, &limits, &steps, delay, |step| {
            debug!(phase = %step.phase, actuators = step.positions.len(), "phase applied");
            shared.publish_positions();
        })
        .await
    }

    async fn shutdown(&mut self) {
        info!("engine shutting down");
        self.disconnect().await;
    }
}

// ─── Handle ───────────────────────────────────────────────────────────────

/// Cloneable front door to the engine. All mutating calls go through the
/// single command queue; reads are served from shared state directly.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
    shared: Arc<Shared>,
}

/// Returned when a gesture is queued.
#[derive(Debug)]
pub struct ExecutionTicket {
    pub id: Uuid,
    completion: oneshot::Receiver<Result<()>>,
}

impl ExecutionTicket {
    /// Wait for the gesture to finish.
    pub async fn wait(self) -> Result<()> {
        self.completion.await.map_err(|_| EngineError::Stopped)?
    }
}

impl EngineHandle {
    /// Start the engine loop on the current tokio runtime.
    pub fn spawn(store: GestureStore, transport: Arc<dyn Transport>, config: EngineConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        let (events, _) = broadcast::channel(256);
        let shared = Arc::new(Shared {
            registry: PositionRegistry::new(&store.limits()),
            executions: ExecutionLog::new(config.execution_history),
            status: RwLock::new(ConnectionStatus::default()),
            events,
            accepting: AtomicBool::new(true),
            store,
            transport: Arc::clone(&transport),
            config,
        });
        let engine = Engine {
            channel: ChannelManager::new(
                transport,
                shared.config.io_timeout,
                shared.config.baud_rate,
            ),
            shared: Arc::clone(&shared),
        };
        tokio::spawn(engine.run(rx));
        Self { tx, shared }
    }

    async fn submit<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        if !self.is_accepting() {
            return Err(EngineError::ShuttingDown);
        }
        self.send(make).await
    }

    async fn send<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| EngineError::Stopped)?;
        rx.await.map_err(|_| EngineError::Stopped)?
    }

    // ─── Mutations (queued) ───────────────────────────────────────────────

    /// Open `device` and enable torque on every configured actuator.
    pub async fn connect(&self, device: &str) -> Result<()> {
        let device = device.to_string();
        self.submit(|reply| Command::Connect { device, reply }).await
    }

    /// Disable torque and release the device. Always succeeds.
    pub async fn disconnect(&self) -> Result<()> {
        match self.send(|reply| Command::Disconnect { reply }).await {
            Err(EngineError::Stopped) => Ok(()),
            other => other,
        }
    }

    /// Clamp and write a raw position request. Returns what was sent.
    pub async fn update_positions(&self, request: PositionRequest) -> Result<PositionMap> {
        self.submit(|reply| Command::Write { request, reply }).await
    }

    /// Every actuator to its minimum. A no-op when not connected.
    pub async fn move_to_default(&self) -> Result<()> {
        self.submit(|reply| Command::SetDefault { reply }).await
    }

    /// Queue a gesture. Unknown names fail here, before anything is queued.
    pub async fn execute_gesture(&self, gesture: &str, staged: bool) -> Result<ExecutionTicket> {
        if !self.is_accepting() {
            return Err(EngineError::ShuttingDown);
        }
        if !self.shared.store.contains_gesture(gesture) {
            return Err(GestureError::NotFound(gesture.to_string()).into());
        }
        let record = self.shared.executions.submit(gesture, staged);
        self.shared.publish(EngineEvent::Execution(record.clone()));

        let (reply, completion) = oneshot::channel();
        let cmd = Command::Execute {
            id: record.id,
            gesture: gesture.to_string(),
            staged,
            reply,
        };
        if self.tx.send(cmd).await.is_err() {
            self.shared
                .executions
                .finish(record.id, Some(EngineError::Stopped.to_string()));
            return Err(EngineError::Stopped);
        }
        Ok(ExecutionTicket {
            id: record.id,
            completion,
        })
    }

    // ─── Reads ────────────────────────────────────────────────────────────

    pub fn snapshot_positions(&self) -> PositionMap {
        self.shared.registry.snapshot()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.shared
            .status
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn execution(&self, id: Uuid) -> Result<ExecutionRecord> {
        self.shared
            .executions
            .get(id)
            .ok_or(EngineError::ExecutionNotFound(id))
    }

    /// Recent executions, newest first.
    pub fn executions(&self) -> Vec<ExecutionRecord> {
        self.shared.executions.recent()
    }

    pub async fn available_ports(&self) -> std::result::Result<Vec<String>, BusError> {
        channel::list_ports(Arc::clone(&self.shared.transport), self.shared.config.io_timeout).await
    }

    pub fn store(&self) -> &GestureStore {
        &self.shared.store
    }

    /// Bring the registry in line with the store's limits after they change.
    /// Queued behind any in-flight write.
    pub async fn limits_changed(&self) -> Result<()> {
        self.submit(|reply| Command::ReloadLimits { reply }).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    // ─── Lifecycle ────────────────────────────────────────────────────────

    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::SeqCst)
    }

    /// Refuse new commands from now on. Already queued ones are rejected as
    /// the loop reaches them.
    pub fn stop_accepting(&self) {
        if self.shared.accepting.swap(false, Ordering::SeqCst) {
            self.shared.publish(EngineEvent::ShuttingDown);
        }
    }

    /// Stop accepting, let the in-flight command finish, then disable torque
    /// and close the channel. Waits at most the configured grace period.
    pub async fn shutdown(&self) -> Result<()> {
        self.stop_accepting();
        let grace = self.shared.config.shutdown_grace;
        match tokio::time::timeout(grace, self.send(|reply| Command::Shutdown { reply })).await {
            Ok(Ok(())) | Ok(Err(EngineError::Stopped)) | Ok(Err(EngineError::ShuttingDown)) => {
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "engine did not stop within grace period");
                Ok(())
            }
        }
    }
}
