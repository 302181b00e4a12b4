use std::io::{self, Read, Write};
use std::time::Duration;

use hand_core::protocol::{self, SyncWriteFrame, STATUS_LEN};
use hand_core::ActuatorId;
use serialport::{ClearBuffer, SerialPort};

use crate::bus::{Bus, BusError, OpenError, Transport};

/// Host serial ports via the `serialport` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialTransport;

impl Transport for SerialTransport {
    fn available_ports(&self) -> Result<Vec<String>, BusError> {
        let ports = serialport::available_ports().map_err(|e| BusError::Other(e.to_string()))?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn open(&self, path: &str, timeout: Duration) -> Result<Box<dyn Bus>, OpenError> {
        let port = serialport::new(path, protocol::BAUD_RATE)
            .timeout(timeout)
            .open()
            .map_err(classify_open_error)?;
        Ok(Box::new(SerialBus { port: Some(port) }))
    }
}

fn classify_open_error(err: serialport::Error) -> OpenError {
    let denied = matches!(
        err.kind(),
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied)
    ) || err.to_string().contains("Permission denied");
    if denied {
        OpenError::PermissionDenied(err.to_string())
    } else {
        OpenError::Failed(err.to_string())
    }
}

fn map_io(err: io::Error) -> BusError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => BusError::Timeout,
        _ => BusError::Io(err),
    }
}

struct SerialBus {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialBus {
    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, BusError> {
        self.port
            .as_mut()
            .ok_or_else(|| BusError::Other("port closed".into()))
    }
}

impl Bus for SerialBus {
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), BusError> {
        self.port()?
            .set_baud_rate(baud)
            .map_err(|e| BusError::Other(e.to_string()))
    }

    fn write_register(&mut self, id: ActuatorId, address: u8, value: u8) -> Result<(), BusError> {
        let port = self.port()?;
        // Drop stale bytes so the next read is this actuator's reply.
        port.clear(ClearBuffer::Input)
            .map_err(|e| BusError::Other(e.to_string()))?;
        port.write_all(&protocol::write_byte(id, address, value))
            .map_err(map_io)?;
        port.flush().map_err(map_io)?;

        let mut reply = [0u8; STATUS_LEN];
        port.read_exact(&mut reply).map_err(map_io)?;
        let status = protocol::parse_status(&reply, id)?;
        if status.error != 0 {
            return Err(BusError::Status {
                actuator: id,
                code: status.error,
            });
        }
        Ok(())
    }

    fn transmit(&mut self, frame: &SyncWriteFrame) -> Result<(), BusError> {
        let port = self.port()?;
        port.write_all(&frame.encode()).map_err(map_io)?;
        port.flush().map_err(map_io)
    }

    fn close(&mut self) {
        self.port = None;
    }
}
