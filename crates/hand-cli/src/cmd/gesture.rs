use crate::output::{print_json, print_table};
use anyhow::{anyhow, Context};
use clap::Subcommand;
use hand_core::HandDocument;
use std::path::Path;

#[derive(Subcommand)]
pub enum GestureSubcommand {
    /// List stored gestures
    List,
    /// Show one gesture's target positions against the current limits
    Show { name: String },
}

pub fn run(document: &Path, subcmd: GestureSubcommand, json: bool) -> anyhow::Result<()> {
    let doc = HandDocument::load(document)
        .with_context(|| format!("failed to load {}", document.display()))?;
    match subcmd {
        GestureSubcommand::List => list(&doc, json),
        GestureSubcommand::Show { name } => show(&doc, &name, json),
    }
}

fn list(doc: &HandDocument, json: bool) -> anyhow::Result<()> {
    if json {
        let summaries: Vec<_> = doc
            .gestures
            .iter()
            .map(|(name, positions)| {
                serde_json::json!({
                    "name": name,
                    "actuators": positions.len(),
                })
            })
            .collect();
        return print_json(&summaries);
    }

    if doc.gestures.is_empty() {
        println!("No gestures.");
        return Ok(());
    }
    let rows = doc
        .gestures
        .iter()
        .map(|(name, positions)| vec![name.clone(), positions.len().to_string()])
        .collect();
    print_table(&["NAME", "ACTUATORS"], rows);
    Ok(())
}

fn show(doc: &HandDocument, name: &str, json: bool) -> anyhow::Result<()> {
    let positions = doc
        .gestures
        .get(name)
        .ok_or_else(|| anyhow!("gesture not found: {name}"))?;

    if json {
        return print_json(&serde_json::json!({ "name": name, "positions": positions }));
    }

    let rows = positions
        .iter()
        .map(|(id, value)| {
            let (min, max) = doc
                .servo_limits
                .get(id)
                .map(|l| (l.min.to_string(), l.max.to_string()))
                .unwrap_or_default();
            vec![id.to_string(), value.to_string(), min, max]
        })
        .collect();
    println!("Gesture: {name}");
    print_table(&["ACTUATOR", "POSITION", "MIN", "MAX"], rows);
    Ok(())
}
