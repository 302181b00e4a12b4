use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use hand_core::HandDocument;
use std::path::Path;

#[derive(Subcommand)]
pub enum SequenceSubcommand {
    /// List stored sequences and the gestures they step through
    List,
}

pub fn run(document: &Path, subcmd: SequenceSubcommand, json: bool) -> anyhow::Result<()> {
    let doc = HandDocument::load(document)
        .with_context(|| format!("failed to load {}", document.display()))?;
    match subcmd {
        SequenceSubcommand::List => list(&doc, json),
    }
}

fn list(doc: &HandDocument, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&doc.sequences);
    }

    if doc.sequences.is_empty() {
        println!("No sequences.");
        return Ok(());
    }
    let rows = doc
        .sequences
        .iter()
        .map(|(id, steps)| {
            let gestures: Vec<&str> = steps.iter().map(|s| s.gesture.as_str()).collect();
            vec![id.clone(), steps.len().to_string(), gestures.join(" → ")]
        })
        .collect();
    print_table(&["SEQUENCE", "STEPS", "GESTURES"], rows);
    Ok(())
}
