/// Counts times diseases fell off the boss.
///
/// Drops shortly before the target dies or the fight ends are fine. Drops
/// within one disease duration of the previous one are the same lapse
/// (both diseases usually fall together).
use super::{report, Analyzer, AnalyzerKind, EventInput, Report};
use crate::{annotation::Annotation, error::Result, event::EventType};
use serde_json::json;

const DISEASES: [&str; 2] = ["Blood Plague", "Frost Fever"];
const DISEASE_DURATION_MS: i64 = 15_000;
const END_OF_FIGHT_GRACE_MS: i64 = 10_000;

pub struct DiseaseAnalyzer {
    /// Thaddius platform swaps drop diseases by design.
    ignore_in_dead_zone: bool,
    fight_end:           i64,
    drops:               Vec<i64>,
}

impl DiseaseAnalyzer {
    pub fn new(encounter: &str, fight_end: i64) -> Self {
        Self {
            ignore_in_dead_zone: encounter == "Thaddius",
            fight_end,
            drops: Vec::new(),
        }
    }

    pub fn num_dropped(&self) -> usize {
        let mut count = 0;
        let mut last: Option<i64> = None;
        for &ts in &self.drops {
            if self.fight_end - ts < END_OF_FIGHT_GRACE_MS {
                continue;
            }
            if last.map_or(true, |prev| ts - prev > DISEASE_DURATION_MS) {
                count += 1;
            }
            last = Some(ts);
        }
        count
    }
}

impl Analyzer for DiseaseAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Diseases
    }

    fn add_event(&mut self, input: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        let event = input.event;
        if event.kind != EventType::RemoveDebuff
            || !DISEASES.contains(&event.ability.as_str())
            || !event.target_is_boss
        {
            return Ok(());
        }
        if self.ignore_in_dead_zone && input.decoration.in_dead_zone {
            return Ok(());
        }

        let target_lives_on = event
            .target_dies_at
            .map_or(true, |dies_at| dies_at - event.timestamp > END_OF_FIGHT_GRACE_MS);
        if target_lives_on {
            self.drops.push(event.timestamp);
        }
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        Some(match self.num_dropped() {
            0 => 1.0,
            1 => 0.5,
            _ => 0.0,
        })
    }

    fn report(&self) -> Report {
        report("diseases_dropped", json!({ "num_diseases_dropped": self.num_dropped() }))
    }

    fn log_summary(&self) {
        match self.num_dropped() {
            0 => tracing::info!("Diseases never dropped"),
            n => tracing::info!("Diseases dropped {} times", n),
        }
    }
}
