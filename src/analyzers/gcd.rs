/// Measures how late each global-cooldown cast came after the previous one.
///
/// The gap between two GCD casts minus the GCD itself is the latency. After
/// a dead zone the clock restarts at the zone's end, so forced downtime is
/// not charged. Casts well under a GCD apart are off-GCD noise and skipped.
use super::{report, Analyzer, AnalyzerKind, EventInput, Report};
use crate::{annotation::Annotation, config::AnalysisConfig, error::Result, event::EventType};
use serde_json::json;

const NO_GCD: &[&str] = &[
    "Unbreakable Armor",
    "Blood Tap",
    "Global Thermal Sapper Charge",
    "Saronite Bomb",
    "Speed",
    "Empower Rune Weapon",
    "Cobalt Frag Bomb",
    "Hyperspeed Acceleration",
    "Blood Fury",
    "Berserking",
    "Indestructible",
    "Deathchill",
    "Melee",
    "Path of Illidan",
    "Anti-Magic Shell",
    "Unholy Frenzy",
    "Wrathstone",
    "Mark of Norgannon",
    "Mind Freeze",
];

pub struct GcdAnalyzer {
    source_id:       i64,
    gcd_ms:          i64,
    early_tolerance: i64,
    penalty_per_ms:  f64,
    /// (cast timestamp, timestamp the GCD is measured from)
    gcds:            Vec<(i64, i64)>,
    last_gcd_cast:   Option<i64>,
}

impl GcdAnalyzer {
    pub fn new(source_id: i64, config: &AnalysisConfig) -> Self {
        Self {
            source_id,
            gcd_ms:          config.gcd_ms,
            early_tolerance: config.gcd_early_tolerance_ms,
            penalty_per_ms:  config.gcd_latency_penalty_per_ms,
            gcds:            Vec::new(),
            last_gcd_cast:   None,
        }
    }

    pub fn latencies(&self) -> Vec<i64> {
        self.gcds
            .iter()
            .map(|(ts, from)| ts - from - self.gcd_ms)
            .filter(|latency| *latency > -self.early_tolerance)
            .map(|latency| latency.max(0))
            .collect()
    }

    /// Mean latency, not counting the opener.
    pub fn average_latency(&self) -> f64 {
        let latencies = self.latencies();
        if latencies.len() < 2 {
            return 0.0;
        }
        let rest = &latencies[1..];
        rest.iter().sum::<i64>() as f64 / rest.len() as f64
    }
}

impl Analyzer for GcdAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Gcd
    }

    fn add_event(&mut self, input: &EventInput<'_>, notes: &mut Annotation) -> Result<()> {
        let event = input.event;
        if event.kind != EventType::Cast || event.source_id != self.source_id {
            return Ok(());
        }

        let ts = event.timestamp;
        let (offset, measured_from) = match self.last_gcd_cast {
            None => (ts, 0),
            Some(last) => {
                let deco = input.decoration;
                let from = match deco.recent_dead_zone {
                    Some(_) if deco.in_dead_zone => ts,
                    Some(zone) => zone.end.map_or(last, |end| end.max(last)),
                    None => last,
                };
                (ts - from, from)
            }
        };

        let has_gcd = !NO_GCD.contains(&event.ability.as_str());
        notes.gcd_offset = Some(offset);
        notes.has_gcd = Some(has_gcd);

        if has_gcd {
            self.gcds.push((ts, measured_from));
            self.last_gcd_cast = Some(ts);
        }
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        Some((1.0 - self.penalty_per_ms * self.average_latency()).max(0.0))
    }

    fn report(&self) -> Report {
        report("gcd_latency", json!({ "average_latency": self.average_latency() }))
    }

    fn log_summary(&self) {
        tracing::info!("Average GCD usage delay was {:.2} ms", self.average_latency());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{annotation::Decoration, event::Event, window::Window};

    fn feed(a: &mut GcdAnalyzer, ts: i64, ability: &str, deco: &Decoration) -> Annotation {
        let event = Event::new(ts, EventType::Cast, ability, 1, 2);
        let mut notes = Annotation::default();
        a.add_event(&EventInput { event: &event, decoration: deco }, &mut notes).unwrap();
        notes
    }

    #[test]
    fn averages_latency_after_opener() {
        let mut a = GcdAnalyzer::new(1, &AnalysisConfig::default());
        let none = Decoration::default();
        feed(&mut a, 1_000, "Icy Touch", &none);
        feed(&mut a, 2_600, "Plague Strike", &none);
        feed(&mut a, 4_400, "Obliterate", &none);
        // off-GCD, not measured
        let notes = feed(&mut a, 4_500, "Blood Tap", &none);
        assert_eq!(notes.has_gcd, Some(false));
        assert_eq!(notes.gcd_offset, Some(100));
        // 1000ms early: spell noise, dropped
        feed(&mut a, 4_900, "Frost Strike", &none);

        // latencies: opener (1000 - 0 - 1500 = -500, dropped), 100, 300, dropped
        assert_eq!(a.latencies(), vec![100, 300]);
        assert!((a.average_latency() - 300.0).abs() < 1e-9);
        assert!((a.score().unwrap() - (1.0 - 0.0017 * 300.0)).abs() < 1e-9);
    }

    #[test]
    fn dead_zone_restarts_the_clock() {
        let mut a = GcdAnalyzer::new(1, &AnalysisConfig::default());
        feed(&mut a, 1_000, "Obliterate", &Decoration::default());

        let after_zone = Decoration {
            in_dead_zone:     false,
            recent_dead_zone: Some(Window::closed(1_001, 9_000)),
            ..Decoration::default()
        };
        let notes = feed(&mut a, 10_600, "Obliterate", &after_zone);
        assert_eq!(notes.gcd_offset, Some(1_600));

        let inside = Decoration {
            in_dead_zone:     true,
            recent_dead_zone: Some(Window::closed(11_001, 20_000)),
            ..Decoration::default()
        };
        let notes = feed(&mut a, 15_000, "Death Coil", &inside);
        assert_eq!(notes.gcd_offset, Some(0));
    }

    #[test]
    fn ignores_other_sources() {
        let mut a = GcdAnalyzer::new(1, &AnalysisConfig::default());
        let event = Event::new(0, EventType::Cast, "Claw", 99, 2);
        let mut notes = Annotation::default();
        a.add_event(&EventInput { event: &event, decoration: &Decoration::default() }, &mut notes).unwrap();
        assert!(notes.gcd_offset.is_none());
        assert_eq!(a.score(), Some(1.0));
    }
}
