/// Runic power over-cap, offset by power gained from Anti-Magic Shell.
use super::{report, Analyzer, AnalyzerKind, EventInput, Report};
use crate::{annotation::Annotation, error::Result, event::EventType};
use serde_json::json;

#[derive(Debug, Default)]
pub struct RunicPowerAnalyzer {
    overcap_times: u32,
    overcap_sum:   i64,
    gained_times:  u32,
    gained_sum:    i64,
}

impl Analyzer for RunicPowerAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::RunicPower
    }

    fn add_event(&mut self, input: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        let event = input.event;
        // The log reports tenths of a point.
        match (event.kind, event.runic_power_waste, event.runic_power_gained_ams) {
            (EventType::Cast, Some(waste), _) if waste > 0 => {
                self.overcap_times += 1;
                self.overcap_sum += waste / 10;
            }
            (EventType::ResourceChange, _, Some(gained)) => {
                self.gained_times += 1;
                self.gained_sum += gained / 10;
            }
            _ => {}
        }
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        let waste = self.overcap_sum - self.gained_sum;
        Some(match waste {
            w if w < 50 => 1.0,
            w if w < 100 => 0.5,
            w if w < 150 => 0.25,
            _ => 0.0,
        })
    }

    fn report(&self) -> Report {
        report("runic_power", json!({
            "overcap_times": self.overcap_times,
            "overcap_sum":   self.overcap_sum,
            "gained_times":  self.gained_times,
            "gained_sum":    self.gained_sum,
        }))
    }

    fn log_summary(&self) {
        tracing::info!(
            "Over-capped RP {} times ({} RP wasted), gained {} RP from AMS",
            self.overcap_times,
            self.overcap_sum,
            self.gained_sum,
        );
    }
}
