//! Analyze one normalized fight file and print the result as JSON.
//!
//! Usage: combat-ledger-analyzer <fight.json> [config-dir]
//!
//! Set `ANALYZER_LOG_DIR` to log to a rolling file instead of stderr.
use anyhow::{bail, Context, Result};
use combat_ledger_analyzer::{analyze_fight, config, logging, Fight};
use std::path::PathBuf;

fn main() -> Result<()> {
    let log_dir = std::env::var_os("ANALYZER_LOG_DIR").map(PathBuf::from);
    // Keep the guard alive so buffered log lines are flushed on exit.
    let _guard = logging::init(log_dir.as_deref())?;

    let mut args = std::env::args_os().skip(1);
    let Some(fight_path) = args.next().map(PathBuf::from) else {
        bail!("usage: combat-ledger-analyzer <fight.json> [config-dir]");
    };

    let cfg = match args.next().map(PathBuf::from) {
        Some(dir) => config::load_or_default(&dir)?,
        None => config::AnalysisConfig::default(),
    };

    let raw = std::fs::read_to_string(&fight_path)
        .with_context(|| format!("reading {}", fight_path.display()))?;
    let fight: Fight = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", fight_path.display()))?;

    let result = analyze_fight(&fight, &cfg)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
