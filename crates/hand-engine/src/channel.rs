use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hand_core::protocol::{SyncWriteFrame, ADDR_TORQUE_ENABLE};
use hand_core::ActuatorId;
use tracing::{debug, info, warn};

use crate::bus::{Bus, BusError, OpenError, Transport};
use crate::error::{CommandError, ConnectError};

type SharedBus = Arc<Mutex<Box<dyn Bus>>>;

enum ChannelState {
    Disconnected,
    Connected { device: String, bus: SharedBus },
}

/// Owns the physical channel. Only the engine loop holds one, so every call
/// here is already serialized.
pub(crate) struct ChannelManager {
    transport: Arc<dyn Transport>,
    state: ChannelState,
    io_timeout: Duration,
    baud_rate: u32,
}

impl ChannelManager {
    pub(crate) fn new(transport: Arc<dyn Transport>, io_timeout: Duration, baud_rate: u32) -> Self {
        Self {
            transport,
            state: ChannelState::Disconnected,
            io_timeout,
            baud_rate,
        }
    }

    pub(crate) fn device(&self) -> Option<&str> {
        match &self.state {
            ChannelState::Connected { device, .. } => Some(device),
            ChannelState::Disconnected => None,
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.device().is_some()
    }

    /// Open `device`, set the baud rate and enable torque on `actuators`.
    ///
    /// An existing connection is torn down first. Any failure leaves the
    /// channel disconnected with the device released.
    pub(crate) async fn connect(
        &mut self,
        device: &str,
        actuators: &[ActuatorId],
    ) -> Result<(), ConnectError> {
        if self.is_connected() {
            info!(device, "reconnecting; releasing current channel first");
            self.disconnect(actuators).await;
        }

        let available = self.list_ports().await.map_err(|e| ConnectError::OpenFailed {
            path: device.to_string(),
            detail: format!("cannot enumerate ports: {e}"),
        })?;
        if !available.iter().any(|p| p == device) {
            return Err(ConnectError::PortNotFound {
                path: device.to_string(),
                available,
            });
        }

        let bus = self.open(device).await?;

        let baud = self.baud_rate;
        let (result, _) = run_io(&bus, self.io_timeout, move |b| b.set_baud_rate(baud)).await;
        if let Err(e) = result {
            release(&bus, self.io_timeout).await;
            return Err(ConnectError::BaudRateFailed {
                path: device.to_string(),
                baud,
                detail: e.to_string(),
            });
        }

        for &actuator in actuators {
            let (result, elapsed) = run_io(&bus, self.io_timeout, move |b| {
                b.write_register(actuator, ADDR_TORQUE_ENABLE, 1)
            })
            .await;
            if let Err(e) = result {
                warn!(
                    %actuator,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "torque enable failed: {e}"
                );
                release(&bus, self.io_timeout).await;
                return Err(ConnectError::TorqueEnableFailed {
                    actuator,
                    detail: e.to_string(),
                });
            }
        }

        info!(device, actuators = actuators.len(), "channel connected");
        self.state = ChannelState::Connected {
            device: device.to_string(),
            bus,
        };
        Ok(())
    }

    /// Disable torque on every actuator (failures only logged), then close.
    /// Safe to call in any state.
    pub(crate) async fn disconnect(&mut self, actuators: &[ActuatorId]) {
        let ChannelState::Connected { device, bus } =
            std::mem::replace(&mut self.state, ChannelState::Disconnected)
        else {
            debug!("disconnect: already disconnected");
            return;
        };

        for &actuator in actuators {
            let (result, _) = run_io(&bus, self.io_timeout, move |b| {
                b.write_register(actuator, ADDR_TORQUE_ENABLE, 0)
            })
            .await;
            if let Err(e) = result {
                warn!(%actuator, "torque disable failed: {e}");
            }
        }
        release(&bus, self.io_timeout).await;
        info!(device = %device, "channel disconnected");
    }

    /// Send one synchronized frame. Returns the time spent on the bus.
    pub(crate) async fn transmit(&self, frame: SyncWriteFrame) -> Result<Duration, CommandError> {
        let ChannelState::Connected { bus, .. } = &self.state else {
            return Err(CommandError::NotConnected);
        };
        let (result, elapsed) = run_io(bus, self.io_timeout, move |b| b.transmit(&frame)).await;
        match result {
            Ok(()) => Ok(elapsed),
            Err(BusError::Timeout) => Err(CommandError::Timeout { elapsed }),
            Err(BusError::Status { actuator, code }) => {
                Err(CommandError::ActuatorError { actuator, code })
            }
            Err(e) => Err(CommandError::TransmitFailed {
                detail: e.to_string(),
                elapsed,
            }),
        }
    }

    async fn list_ports(&self) -> Result<Vec<String>, BusError> {
        list_ports(Arc::clone(&self.transport), self.io_timeout).await
    }

    async fn open(&self, device: &str) -> Result<SharedBus, ConnectError> {
        let transport = Arc::clone(&self.transport);
        let path = device.to_string();
        let io_timeout = self.io_timeout;
        let task = tokio::task::spawn_blocking(move || transport.open(&path, io_timeout));

        let open_failed = |detail: String| ConnectError::OpenFailed {
            path: device.to_string(),
            detail,
        };
        let opened = tokio::time::timeout(io_timeout, task)
            .await
            .map_err(|_| open_failed("timed out opening port".into()))?
            .map_err(|e| open_failed(format!("task join error: {e}")))?;

        match opened {
            Ok(bus) => Ok(Arc::new(Mutex::new(bus))),
            Err(OpenError::PermissionDenied(detail)) => {
                warn!(device, "permission denied: {detail}");
                Err(ConnectError::PermissionDenied {
                    path: device.to_string(),
                })
            }
            Err(OpenError::Failed(detail)) => Err(open_failed(detail)),
        }
    }
}

/// Enumerate devices on the blocking pool, bounded by `io_timeout` like every
/// other bus-side call.
pub(crate) async fn list_ports(
    transport: Arc<dyn Transport>,
    io_timeout: Duration,
) -> Result<Vec<String>, BusError> {
    let task = tokio::task::spawn_blocking(move || transport.available_ports());
    match tokio::time::timeout(io_timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(BusError::Other(format!("task join error: {e}"))),
        Err(_) => Err(BusError::Timeout),
    }
}

async fn release(bus: &SharedBus, io_timeout: Duration) {
    let (result, _) = run_io(bus, io_timeout, |b| {
        b.close();
        Ok(())
    })
    .await;
    if let Err(e) = result {
        warn!("closing channel: {e}");
    }
}

/// Run one blocking bus call on the blocking pool, bounded by `io_timeout`.
///
/// On expiry the call keeps running in the background and still holds the bus
/// lock, so the next call waits for it (under its own timeout).
async fn run_io<T, F>(bus: &SharedBus, io_timeout: Duration, f: F) -> (Result<T, BusError>, Duration)
where
    T: Send + 'static,
    F: FnOnce(&mut Box<dyn Bus>) -> Result<T, BusError> + Send + 'static,
{
    let bus = Arc::clone(bus);
    let started = Instant::now();
    let task = tokio::task::spawn_blocking(move || {
        let mut guard = bus.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    });
    let result = match tokio::time::timeout(io_timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(BusError::Other(format!("task join error: {e}"))),
        Err(_) => Err(BusError::Timeout),
    };
    (result, started.elapsed())
}
