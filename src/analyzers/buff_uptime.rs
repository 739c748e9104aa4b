/// Uptime of one or more buffs over a time range, read from the buff
/// timelines rather than folded from events.
use super::{Analyzer, AnalyzerKind, EventInput, Report};
use crate::{
    annotation::Annotation,
    buffs::BuffTracker,
    error::Result,
    items::{Items, Sigil, T9_MAX_UPTIME, T9_PROC},
    window::{calculate_uptime, clamp_windows, combine_windows, Window},
};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct BuffUptime<'a> {
    buffs:        &'a BuffTracker,
    names:        Vec<String>,
    ignore:       Vec<Window>,
    start:        i64,
    end:          i64,
    max_duration: Option<i64>,
}

impl<'a> BuffUptime<'a> {
    /// Uptime of any of `names` over `[0, end)`.
    pub fn new(buffs: &'a BuffTracker, names: &[&str], end: i64) -> Self {
        Self {
            buffs,
            names: names.iter().map(|n| (*n).to_owned()).collect(),
            ignore: Vec::new(),
            start: 0,
            end,
            max_duration: None,
        }
    }

    pub fn ignoring(mut self, windows: &[Window]) -> Self {
        self.ignore = windows.to_vec();
        self
    }

    pub fn between(mut self, start: i64, end: i64) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// No single window counts for longer than this.
    pub fn max_window(mut self, max_duration: i64) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    pub fn windows(&self) -> Vec<Window> {
        let per_buff: Vec<Vec<Window>> = self.names.iter().map(|n| self.buffs.get_windows(n)).collect();
        let lists: Vec<&[Window]> = per_buff.iter().map(Vec::as_slice).collect();
        clamp_windows(&combine_windows(&lists), self.start, self.end)
    }

    pub fn uptime(&self) -> f64 {
        let ignore = clamp_windows(&self.ignore, self.start, self.end);
        calculate_uptime(&self.windows(), &ignore, self.end - self.start, self.max_duration).min(1.0)
    }
}

// ---------------------------------------------------------------------------
// Plain uptime report
// ---------------------------------------------------------------------------

pub struct BuffUptimeAnalyzer<'a> {
    kind:   AnalyzerKind,
    key:    &'static str,
    uptime: BuffUptime<'a>,
}

impl<'a> BuffUptimeAnalyzer<'a> {
    pub fn new(kind: AnalyzerKind, key: &'static str, uptime: BuffUptime<'a>) -> Self {
        Self { kind, key, uptime }
    }
}

impl Analyzer for BuffUptimeAnalyzer<'_> {
    fn kind(&self) -> AnalyzerKind {
        self.kind
    }

    fn add_event(&mut self, _: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        Some(self.uptime.uptime())
    }

    fn report(&self) -> Report {
        super::report(self.key, json!(self.uptime.uptime()))
    }

    fn log_summary(&self) {
        tracing::info!("{} was {:.2}%", self.key, self.uptime.uptime() * 100.0);
    }
}

// ---------------------------------------------------------------------------
// Tier-9 proc
// ---------------------------------------------------------------------------

/// Reported only when the 2-piece bonus is present.
pub struct T9UptimeAnalyzer<'a> {
    uptime: Option<BuffUptime<'a>>,
}

impl<'a> T9UptimeAnalyzer<'a> {
    pub fn new(duration: i64, buffs: &'a BuffTracker, items: &Items, dead_zones: &[Window]) -> Self {
        let uptime = items
            .has_t9_2p()
            .then(|| BuffUptime::new(buffs, &[T9_PROC], duration).ignoring(dead_zones));
        Self { uptime }
    }
}

impl Analyzer for T9UptimeAnalyzer<'_> {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::T9Uptime
    }

    fn add_event(&mut self, _: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        Ok(())
    }

    fn report(&self) -> Report {
        let mut out = Report::new();
        if let Some(uptime) = &self.uptime {
            out.insert("t9_uptime".into(), json!(uptime.uptime()));
            out.insert("t9_max_uptime".into(), json!(T9_MAX_UPTIME));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Sigil proc
// ---------------------------------------------------------------------------

pub struct SigilUptimeAnalyzer<'a> {
    tracked: Option<(&'static Sigil, BuffUptime<'a>)>,
}

impl<'a> SigilUptimeAnalyzer<'a> {
    pub fn new(duration: i64, buffs: &'a BuffTracker, items: &Items, dead_zones: &[Window]) -> Self {
        let tracked = items.sigil().map(|sigil| {
            (sigil, BuffUptime::new(buffs, &[sigil.buff_name], duration).ignoring(dead_zones))
        });
        Self { tracked }
    }
}

impl Analyzer for SigilUptimeAnalyzer<'_> {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::SigilUptime
    }

    fn add_event(&mut self, _: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        Ok(())
    }

    fn report(&self) -> Report {
        let mut out = Report::new();
        if let Some((sigil, uptime)) = &self.tracked {
            out.insert("sigil_uptime".into(), json!(uptime.uptime()));
            out.insert("sigil_max_uptime".into(), json!(sigil.max_uptime));
            out.insert("sigil_name".into(), json!(sigil.name));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        buffs::TRACKED_BUFFS,
        event::{CombatantInfo, Event, EventType, GearItem},
    };

    fn tracker(events: &[(i64, EventType, &str)]) -> BuffTracker {
        let mut t = BuffTracker::new(TRACKED_BUFFS, 100_000, &[], false);
        for (ts, kind, ability) in events {
            t.preprocess_event(&Event::new(*ts, *kind, ability, 1, 1));
        }
        t
    }

    #[test]
    fn uptime_over_a_sub_range() {
        let t = tracker(&[
            (10_000, EventType::ApplyBuff, "Bloodlust"),
            (50_000, EventType::RemoveBuff, "Bloodlust"),
        ]);
        let full = BuffUptime::new(&t, &["Bloodlust", "Heroism"], 100_000);
        assert!((full.uptime() - 0.4).abs() < 1e-9);

        let window = BuffUptime::new(&t, &["Bloodlust", "Heroism"], 100_000).between(40_000, 70_000);
        assert_eq!(window.windows(), vec![Window::closed(40_000, 50_000)]);
        assert!((window.uptime() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn uptime_with_ignores_and_cap() {
        let t = tracker(&[
            (0, EventType::ApplyBuff, "Unholy Force"),
            (40_000, EventType::RemoveBuff, "Unholy Force"),
        ]);
        let u = BuffUptime::new(&t, &["Unholy Force"], 100_000)
            .ignoring(&[Window::closed(20_000, 40_000)]);
        assert!((u.uptime() - 20_000.0 / 80_000.0).abs() < 1e-9);

        let capped = BuffUptime::new(&t, &["Unholy Force"], 100_000).max_window(10_000);
        assert!((capped.uptime() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn t9_and_sigil_report_only_when_equipped() {
        let t = tracker(&[
            (0, EventType::ApplyBuff, T9_PROC),
            (14_000, EventType::RemoveBuff, T9_PROC),
        ]);
        let none = Items::default();
        assert!(T9UptimeAnalyzer::new(100_000, &t, &none, &[]).report().is_empty());
        assert!(SigilUptimeAnalyzer::new(100_000, &t, &none, &[]).report().is_empty());

        let geared = Items::from_gear(&CombatantInfo {
            auras: vec![],
            gear:  [48472, 48503, 47673].iter().map(|&id| GearItem { id, item_icon: None }).collect(),
        });
        let t9 = T9UptimeAnalyzer::new(100_000, &t, &geared, &[]).report();
        assert!((t9["t9_uptime"].as_f64().unwrap() - 0.14).abs() < 1e-9);
        assert_eq!(t9["t9_max_uptime"], 0.28);

        let sigil = SigilUptimeAnalyzer::new(100_000, &t, &geared, &[]).report();
        assert_eq!(sigil["sigil_name"], "Sigil of Virulence");
        assert_eq!(sigil["sigil_uptime"], 0.0);
    }
}
