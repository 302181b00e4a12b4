//! Serialized actuator command engine for the robotic hand.
//!
//! Every mutating operation is a command on one async queue, consumed by a
//! single task that owns the serial channel. Gesture execution, raw position
//! updates and connection changes therefore never interleave on the bus.
//!
//! # Architecture
//!
//! ```text
//! EngineHandle      ← cloneable; gateway and CLI hold this
//!     │  mpsc<Command> + oneshot replies
//!     ▼
//! Engine loop       ← single consumer, FIFO
//!     │
//!     ├── executor       staged / direct gesture plans
//!     ├── commander      clamp + one sync-write frame per batch
//!     ▼
//! ChannelManager    ← connect / disconnect / transmit, 5 s per operation
//!     │
//!     ▼
//! dyn Bus           ← SerialTransport (serialport) or MockTransport
//! ```
//!
//! Confirmed positions land in the [`PositionRegistry`]; there is no
//! read-back from the hardware.

pub mod bus;
pub(crate) mod channel;
pub(crate) mod commander;
pub mod engine;
pub mod error;
pub mod executions;
pub mod executor;
pub mod registry;
pub mod serial;

#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use bus::{Bus, BusError, OpenError, Transport};
pub use engine::{ConnectionStatus, EngineConfig, EngineEvent, EngineHandle, ExecutionTicket};
pub use error::{CommandError, ConnectError, EngineError, GestureError, Result};
pub use executions::{ExecutionRecord, ExecutionStatus};
pub use executor::Phase;
pub use registry::PositionRegistry;
pub use serial::SerialTransport;
