/// Fraction of the fight spent auto-attacking.
///
/// A run of melee swings forms a window. The window closes once no swing
/// lands for `swing_gap_ms`, at half a gap past the last swing.
use super::{report, Analyzer, AnalyzerKind, EventInput, Report};
use crate::{
    annotation::Annotation,
    error::Result,
    window::{calculate_uptime, Window},
};
use serde_json::json;

pub struct MeleeUptimeAnalyzer {
    fight_duration: i64,
    ignore_windows: Vec<Window>,
    swing_gap_ms:   i64,
    windows:        Vec<Window>,
    last_swing_at:  Option<i64>,
}

impl MeleeUptimeAnalyzer {
    pub fn new(fight_duration: i64, ignore_windows: Vec<Window>, swing_gap_ms: i64) -> Self {
        Self {
            fight_duration,
            ignore_windows,
            swing_gap_ms,
            windows: Vec::new(),
            last_swing_at: None,
        }
    }

    pub fn windows(&self) -> Vec<Window> {
        self.windows
            .iter()
            .map(|w| {
                let mut w = *w;
                w.close_at(self.fight_duration);
                w
            })
            .collect()
    }

    pub fn uptime(&self) -> f64 {
        calculate_uptime(&self.windows(), &self.ignore_windows, self.fight_duration, None)
    }
}

impl Analyzer for MeleeUptimeAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::MeleeUptime
    }

    fn add_event(&mut self, input: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        let ts = input.event.timestamp;

        if let (Some(window), Some(last)) = (self.windows.last_mut(), self.last_swing_at) {
            if window.is_open() && ts - last >= self.swing_gap_ms {
                window.close_at((last + self.swing_gap_ms / 2).min(self.fight_duration));
            }
        }

        if input.event.is_cast_of("Melee") {
            if self.windows.last().map_or(true, |w| !w.is_open()) {
                self.windows.push(Window::open(ts));
            }
            self.last_swing_at = Some(ts);
        }
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        Some(self.uptime())
    }

    fn report(&self) -> Report {
        report("melee_uptime", json!(self.uptime()))
    }

    fn log_summary(&self) {
        tracing::info!("Melee uptime was {:.2}%", self.uptime() * 100.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{annotation::Decoration, event::{Event, EventType}};

    fn feed(a: &mut MeleeUptimeAnalyzer, ts: i64, ability: &str) {
        let e = Event::new(ts, EventType::Cast, ability, 1, 2);
        a.add_event(&EventInput { event: &e, decoration: &Decoration::default() }, &mut Annotation::default())
            .unwrap();
    }

    #[test]
    fn gap_closes_window_half_a_gap_after_last_swing() {
        let mut a = MeleeUptimeAnalyzer::new(20_000, vec![], 2_500);
        feed(&mut a, 0, "Melee");
        feed(&mut a, 2_000, "Melee");
        feed(&mut a, 4_000, "Melee");
        feed(&mut a, 9_000, "Obliterate");
        feed(&mut a, 10_000, "Melee");

        assert_eq!(a.windows(), vec![Window::closed(0, 5_250), Window::closed(10_000, 20_000)]);
        assert!((a.uptime() - 15_250.0 / 20_000.0).abs() < 1e-9);
    }

    #[test]
    fn ignored_time_is_excluded() {
        let mut a = MeleeUptimeAnalyzer::new(10_000, vec![Window::closed(5_000, 10_000)], 2_500);
        for ts in (0..5_000).step_by(2_000) {
            feed(&mut a, ts, "Melee");
        }
        feed(&mut a, 10_000, "Death Coil");
        // window [0, 5250), 250ms of it inside the ignored half
        assert!((a.uptime() - 5_000.0 / 5_000.0).abs() < 1e-9);
    }
}
