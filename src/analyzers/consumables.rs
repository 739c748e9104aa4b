/// Engineering consumables: bombs and Hyperspeed Accelerators.
///
/// "Possible" counts assume use on cooldown from the pull, and never drop
/// below what was actually used.
use super::{report, Analyzer, AnalyzerKind, EventInput, Report};
use crate::{annotation::Annotation, error::Result, event::EventType};
use serde_json::json;

const THERMAL_CD_MS: i64 = 305_000;
const SARONITE_CD_MS: i64 = 65_000;
const HYPERSPEED_CD_MS: i64 = 63_000;
const HYPERSPEED_FIRST_USE_MS: i64 = 5_000;

fn ratio(actual: i64, possible: i64) -> f64 {
    if possible == 0 {
        1.0
    } else {
        actual as f64 / possible as f64
    }
}

// ---------------------------------------------------------------------------
// Bombs
// ---------------------------------------------------------------------------

pub struct BombAnalyzer {
    fight_duration: i64,
    thermals:       i64,
    saronites:      i64,
}

impl BombAnalyzer {
    pub fn new(fight_duration: i64) -> Self {
        Self { fight_duration, thermals: 0, saronites: 0 }
    }

    pub fn possible_thermals(&self) -> i64 {
        (1 + self.fight_duration / THERMAL_CD_MS).max(self.thermals)
    }

    /// Saronite bombs share a cooldown with thermals, so every thermal costs one.
    pub fn possible_saronites(&self) -> i64 {
        (1 + self.fight_duration / SARONITE_CD_MS - self.possible_thermals()).max(self.saronites)
    }
}

impl Analyzer for BombAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Bombs
    }

    fn add_event(&mut self, input: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        if input.event.kind != EventType::Cast {
            return Ok(());
        }
        match input.event.ability.as_str() {
            "Global Thermal Sapper Charge" => self.thermals += 1,
            "Saronite Bomb" => self.saronites += 1,
            _ => {}
        }
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        // A thermal hits for more than twice a saronite.
        let thermal = ratio(self.thermals, self.possible_thermals());
        let saronite = ratio(self.saronites, self.possible_saronites());
        Some(thermal * 0.6 + saronite * 0.4)
    }

    fn report(&self) -> Report {
        report("bomb_usage", json!({
            "thermal_possible":  self.possible_thermals(),
            "thermal_actual":    self.thermals,
            "saronite_possible": self.possible_saronites(),
            "saronite_actual":   self.saronites,
        }))
    }

    fn log_summary(&self) {
        tracing::info!(
            "Used {}/{} thermals and {}/{} saronite bombs",
            self.thermals,
            self.possible_thermals(),
            self.saronites,
            self.possible_saronites(),
        );
    }
}

// ---------------------------------------------------------------------------
// Hyperspeed
// ---------------------------------------------------------------------------

pub struct HyperspeedAnalyzer {
    fight_duration: i64,
    used:           i64,
}

impl HyperspeedAnalyzer {
    pub fn new(fight_duration: i64) -> Self {
        Self { fight_duration, used: 0 }
    }

    /// Floors, so a fight shorter than the first use allows none.
    pub fn possible(&self) -> i64 {
        (1 + (self.fight_duration - HYPERSPEED_FIRST_USE_MS).div_euclid(HYPERSPEED_CD_MS)).max(self.used)
    }
}

impl Analyzer for HyperspeedAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Hyperspeed
    }

    fn add_event(&mut self, input: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        if input.event.is_cast_of("Hyperspeed Acceleration") {
            self.used += 1;
        }
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        Some(ratio(self.used, self.possible()))
    }

    fn report(&self) -> Report {
        report("hyperspeed", json!({
            "num_possible": self.possible(),
            "num_actual":   self.used,
        }))
    }
}
