use crate::output::print_json;
use anyhow::Context;
use hand_core::{ActuatorId, HandDocument};
use hand_engine::executor::THUMB_OPPOSITION;
use std::path::Path;

/// Load and validate the document, then report what a running engine would
/// have to work with.
pub fn run(document: &Path, json: bool) -> anyhow::Result<()> {
    let doc = HandDocument::load(document)
        .with_context(|| format!("{} is not a valid gesture document", document.display()))?;

    let staged = doc.servo_limits.contains_key(&THUMB_OPPOSITION);
    let out_of_range = out_of_range(&doc);
    let delay = doc.settings.gesture_step_delay();

    if json {
        let warnings: Vec<_> = out_of_range
            .iter()
            .map(|(gesture, id, value)| {
                serde_json::json!({ "gesture": gesture, "actuator": id, "position": value })
            })
            .collect();
        return print_json(&serde_json::json!({
            "document": document.display().to_string(),
            "actuators": doc.servo_limits.len(),
            "gestures": doc.gestures.len(),
            "sequences": doc.sequences.len(),
            "gesture_step_delay_ms": delay.as_millis() as u64,
            "staged_execution": staged,
            "out_of_range": warnings,
        }));
    }

    println!("{}: ok", document.display());
    println!("  actuators:  {}", doc.servo_limits.len());
    println!("  gestures:   {}", doc.gestures.len());
    println!("  sequences:  {}", doc.sequences.len());
    println!("  step delay: {} ms", delay.as_millis());
    if !staged {
        println!("  warning: {THUMB_OPPOSITION} has no limits; staged execution is unavailable");
    }
    for (gesture, id, value) in &out_of_range {
        println!("  warning: gesture '{gesture}' sets {id} to {value}, outside its limits (clamped on use)");
    }
    Ok(())
}

/// Stored positions the current limits would clamp.
fn out_of_range(doc: &HandDocument) -> Vec<(String, ActuatorId, u16)> {
    doc.gestures
        .iter()
        .flat_map(|(name, positions)| {
            positions.iter().filter_map(move |(id, &value)| {
                let limit = doc.servo_limits.get(id)?;
                (!limit.contains(value)).then(|| (name.clone(), *id, value))
            })
        })
        .collect()
}
