use crate::output::print_json;
use anyhow::Context;
use hand_engine::{SerialTransport, Transport};

pub fn run(json: bool) -> anyhow::Result<()> {
    let ports = SerialTransport
        .available_ports()
        .context("failed to enumerate serial ports")?;

    if json {
        print_json(&ports)?;
    } else if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        for port in &ports {
            println!("{port}");
        }
    }
    Ok(())
}
