/// Frost rotation checks: Killing Machine and Rime procs, Unbreakable Armor
/// windows, Howling Blast targeting, Raise Dead usage.
use super::{report, Analyzer, AnalyzerKind, EventInput, Report};
use crate::{annotation::Annotation, buffs::BuffTracker, error::Result, event::EventType};
use serde_json::json;

// ---------------------------------------------------------------------------
// Killing Machine
// ---------------------------------------------------------------------------

/// A proc not consumed within this long expired rather than being used.
const KM_EXPIRY_MS: i64 = 30_000;

#[derive(Debug, Clone, Copy)]
struct Proc {
    gained_at: i64,
    used_at:   Option<i64>,
}

#[derive(Debug, Default)]
pub struct KillingMachineAnalyzer {
    procs:  Vec<Proc>,
    active: Option<usize>,
}

impl KillingMachineAnalyzer {
    /// (used, total, average ms from proc to use)
    fn summary(&self) -> (usize, usize, f64) {
        let latencies: Vec<i64> = self
            .procs
            .iter()
            .filter_map(|p| p.used_at.map(|used| used - p.gained_at))
            .collect();
        let avg = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<i64>() as f64 / latencies.len() as f64
        };
        (latencies.len(), self.procs.len(), avg)
    }
}

impl Analyzer for KillingMachineAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::KillingMachine
    }

    fn add_event(&mut self, input: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        let event = input.event;
        if event.ability != "Killing Machine" {
            return Ok(());
        }
        match event.kind {
            EventType::ApplyBuff | EventType::RefreshBuff => {
                self.procs.push(Proc { gained_at: event.timestamp, used_at: None });
                self.active = Some(self.procs.len() - 1);
            }
            // No active proc when one carried over from before the pull.
            EventType::RemoveBuff => {
                if let Some(idx) = self.active.take() {
                    let pending = &mut self.procs[idx];
                    if event.timestamp - pending.gained_at < KM_EXPIRY_MS {
                        pending.used_at = Some(event.timestamp);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        let (_, _, avg) = self.summary();
        let score = [
            (1_800.0, 1.0),
            (1_900.0, 0.9),
            (2_000.0, 0.8),
            (2_100.0, 0.7),
            (2_200.0, 0.6),
            (2_300.0, 0.5),
            (2_500.0, 0.4),
            (3_000.0, 0.2),
        ]
        .into_iter()
        .find(|(limit, _)| avg < *limit)
        .map_or(0.0, |(_, score)| score);
        Some(score)
    }

    fn report(&self) -> Report {
        let (used, total, avg) = self.summary();
        report("killing_machine", json!({
            "num_used":    used,
            "num_total":   total,
            "avg_latency": avg,
        }))
    }

    fn log_summary(&self) {
        let (used, total, avg) = self.summary();
        tracing::info!("Used {} of {} Killing Machine procs, {:.2} ms average delay", used, total, avg);
    }
}

// ---------------------------------------------------------------------------
// Unbreakable Armor
// ---------------------------------------------------------------------------

const UA_CD_MS: i64 = 63_000;
const UA_FIRST_USE_MS: i64 = 10_000;
const OBLITERATES_PER_FULL_WINDOW: i64 = 5;
const OBLITERATES_WITH_ERW: i64 = 6;

#[derive(Debug, Clone)]
struct ArmorWindow {
    obliterates: i64,
    expected:    i64,
    with_erw:    bool,
}

impl ArmorWindow {
    fn num_expected(&self) -> i64 {
        self.expected.max(self.obliterates)
    }
}

pub struct UnbreakableArmorAnalyzer {
    fight_end: i64,
    windows:   Vec<ArmorWindow>,
    active:    Option<usize>,
}

impl UnbreakableArmorAnalyzer {
    pub fn new(fight_end: i64) -> Self {
        Self { fight_end, windows: Vec::new(), active: None }
    }

    /// Obliterates that fit in a window opened at `start`, given the time left.
    fn expected_obliterates(&self, start: i64) -> i64 {
        match self.fight_end - start {
            left if left >= 16_000 => OBLITERATES_PER_FULL_WINDOW,
            left if left >= 14_500 => 4,
            left if left >= 10_500 => 3,
            left if left >= 5_000 => 2,
            left if left >= 2_500 => 1,
            _ => 0,
        }
    }

    fn possible_windows(&self) -> i64 {
        (1 + (self.fight_end - UA_FIRST_USE_MS).div_euclid(UA_CD_MS)).max(self.windows.len() as i64)
    }

    pub fn num_actual(&self) -> i64 {
        self.windows.len() as i64
    }

    /// A trailing window with nothing to hit doesn't count as possible.
    pub fn num_possible(&self) -> i64 {
        let possible = self.possible_windows();
        match self.windows.last() {
            Some(last) if last.num_expected() == 0 => self.num_actual().max(possible - 1),
            _ => self.num_actual().max(possible),
        }
    }
}

impl Analyzer for UnbreakableArmorAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::UnbreakableArmor
    }

    fn add_event(&mut self, input: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        let event = input.event;
        if event.is(EventType::ApplyBuff, "Unbreakable Armor") {
            let expected = self.expected_obliterates(event.timestamp);
            self.windows.push(ArmorWindow { obliterates: 0, expected, with_erw: false });
            self.active = Some(self.windows.len() - 1);
            return Ok(());
        }
        if event.is(EventType::RemoveBuff, "Unbreakable Armor") {
            self.active = None;
            return Ok(());
        }

        let Some(idx) = self.active else { return Ok(()) };
        if event.kind != EventType::Cast || event.is_miss {
            return Ok(());
        }
        let window = &mut self.windows[idx];
        match event.ability.as_str() {
            "Empower Rune Weapon" => {
                window.expected = OBLITERATES_WITH_ERW;
                window.with_erw = true;
            }
            "Obliterate" => window.obliterates += 1,
            "Howling Blast" if !event.consumes_rime => window.obliterates += 1,
            _ => {}
        }
        Ok(())
    }

    /// Each window scores (hit / expected)^2 weighted by expected hits.
    /// Unused windows add weight with no score: the last possible one by
    /// what would have fit, every other one as a full window.
    fn score(&self) -> Option<f64> {
        let mut score = 0.0;
        let mut total_weight = 0i64;

        for window in &self.windows {
            let expected = window.num_expected();
            if expected > 0 {
                let ratio = window.obliterates as f64 / expected as f64;
                score += expected as f64 * ratio * ratio;
                total_weight += expected;
            }
        }

        let possible = self.possible_windows();
        let unused = possible - self.num_actual();
        for i in 0..unused.max(0) {
            total_weight += if i == 0 {
                self.expected_obliterates((possible - 1) * UA_CD_MS)
            } else {
                OBLITERATES_PER_FULL_WINDOW
            };
        }

        if total_weight == 0 {
            return Some(1.0);
        }
        Some(score / total_weight as f64)
    }

    fn dynamic_weight(&self) -> Option<f64> {
        Some(self.num_possible() as f64)
    }

    fn report(&self) -> Report {
        let windows: Vec<_> = self
            .windows
            .iter()
            .map(|w| json!({
                "with_erw":     w.with_erw,
                "num_actual":   w.obliterates,
                "num_possible": w.num_expected(),
            }))
            .collect();
        report("unbreakable_armor", json!({
            "num_possible": self.num_possible(),
            "num_actual":   self.num_actual(),
            "windows":      windows,
        }))
    }

    fn log_summary(&self) {
        tracing::info!(
            "Used Unbreakable Armor {} of a possible {} times",
            self.num_actual(),
            self.possible_windows(),
        );
    }
}

// ---------------------------------------------------------------------------
// Howling Blast
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct HowlingBlastAnalyzer {
    bad_usages: u32,
}

impl Analyzer for HowlingBlastAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::HowlingBlast
    }

    fn add_event(&mut self, input: &EventInput<'_>, notes: &mut Annotation) -> Result<()> {
        let event = input.event;
        if !event.is_cast_of("Howling Blast") {
            return Ok(());
        }
        let targets = event.num_targets.unwrap_or(0);
        let is_bad = !(targets >= 3 || event.consumes_rime || (targets == 2 && event.consumes_km));
        notes.bad_howling_blast = Some(is_bad);
        if is_bad {
            self.bad_usages += 1;
        }
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        Some(match self.bad_usages {
            0 => 1.0,
            1 => 0.5,
            _ => 0.0,
        })
    }

    fn report(&self) -> Report {
        report("howling_blast_bad_usages", json!({ "num_bad_usages": self.bad_usages }))
    }
}

// ---------------------------------------------------------------------------
// Rime
// ---------------------------------------------------------------------------

pub struct RimeAnalyzer {
    total: u32,
    used:  u32,
}

impl RimeAnalyzer {
    pub fn new(buffs: &BuffTracker) -> Self {
        Self { total: u32::from(buffs.is_active("Rime", 0)), used: 0 }
    }
}

impl Analyzer for RimeAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Rime
    }

    fn add_event(&mut self, input: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        let event = input.event;
        if matches!(event.kind, EventType::ApplyBuff | EventType::RefreshBuff) && event.ability == "Rime" {
            self.total += 1;
        }
        if event.consumes_rime {
            self.used += 1;
        }
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        // A proc carried in from before the pull can be used without being seen.
        let total = self.total.max(self.used);
        if total == 0 {
            return Some(0.0);
        }
        Some(f64::from(self.used) / f64::from(total))
    }

    fn report(&self) -> Report {
        report("rime", json!({ "num_total": self.total, "num_used": self.used }))
    }
}

// ---------------------------------------------------------------------------
// Raise Dead
// ---------------------------------------------------------------------------

const RAISE_DEAD_CD_MS: i64 = 183_000;
const RAISE_DEAD_FIRST_USE_MS: i64 = 20_000;

pub struct RaiseDeadAnalyzer {
    fight_end: i64,
    used:      i64,
}

impl RaiseDeadAnalyzer {
    pub fn new(fight_end: i64) -> Self {
        Self { fight_end, used: 0 }
    }

    pub fn possible(&self) -> i64 {
        (1 + (self.fight_end - RAISE_DEAD_FIRST_USE_MS).div_euclid(RAISE_DEAD_CD_MS)).max(self.used)
    }
}

impl Analyzer for RaiseDeadAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::RaiseDead
    }

    fn add_event(&mut self, input: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        if input.event.is_cast_of("Raise Dead") {
            self.used += 1;
        }
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        match self.possible() {
            0 => Some(1.0),
            possible => Some(self.used as f64 / possible as f64),
        }
    }

    fn dynamic_weight(&self) -> Option<f64> {
        Some(self.possible() as f64)
    }

    fn report(&self) -> Report {
        report("raise_dead_usage", json!({
            "num_usages":      self.used,
            "possible_usages": self.possible(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        annotation::Decoration,
        buffs::TRACKED_BUFFS,
        event::Event,
    };

    fn feed(a: &mut dyn Analyzer, event: &Event) -> Annotation {
        let mut notes = Annotation::default();
        a.add_event(&EventInput { event, decoration: &Decoration::default() }, &mut notes).unwrap();
        notes
    }

    fn ev(ts: i64, kind: EventType, ability: &str) -> Event {
        Event::new(ts, kind, ability, 1, 2)
    }

    #[test]
    fn killing_machine_latency() {
        let mut a = KillingMachineAnalyzer::default();
        feed(&mut a, &ev(0, EventType::ApplyBuff, "Killing Machine"));
        feed(&mut a, &ev(1_500, EventType::RemoveBuff, "Killing Machine"));
        feed(&mut a, &ev(10_000, EventType::ApplyBuff, "Killing Machine"));
        feed(&mut a, &ev(12_100, EventType::RemoveBuff, "Killing Machine"));
        // expired
        feed(&mut a, &ev(20_000, EventType::ApplyBuff, "Killing Machine"));
        feed(&mut a, &ev(50_000, EventType::RemoveBuff, "Killing Machine"));

        let r = a.report();
        assert_eq!(r["killing_machine"]["num_used"], 2);
        assert_eq!(r["killing_machine"]["num_total"], 3);
        assert_eq!(r["killing_machine"]["avg_latency"], 1_800.0);
        assert_eq!(a.score(), Some(0.9));
    }

    #[test]
    fn unbreakable_armor_windows() {
        // 1 + (140000 - 10000) / 63000 = 3 possible
        let mut a = UnbreakableArmorAnalyzer::new(140_000);
        feed(&mut a, &ev(10_000, EventType::ApplyBuff, "Unbreakable Armor"));
        for ts in [11_000, 13_000, 15_000, 17_000] {
            feed(&mut a, &ev(ts, EventType::Cast, "Obliterate"));
        }
        let mut rime_hb = ev(18_000, EventType::Cast, "Howling Blast");
        rime_hb.consumes_rime = true;
        feed(&mut a, &rime_hb);
        feed(&mut a, &ev(20_000, EventType::RemoveBuff, "Unbreakable Armor"));
        // outside any window
        feed(&mut a, &ev(21_000, EventType::Cast, "Obliterate"));

        assert_eq!(a.num_actual(), 1);
        assert_eq!(a.num_possible(), 3);
        // window: 5 * (4/5)^2 = 3.2; unused: last possible starts at 126000 (14s left -> 3), one full (5)
        let expected = 3.2 / (5 + 3 + 5) as f64;
        assert!((a.score().unwrap() - expected).abs() < 1e-9);
        assert_eq!(a.dynamic_weight(), Some(3.0));
        assert_eq!(a.report()["unbreakable_armor"]["windows"][0]["num_actual"], 4);
    }

    #[test]
    fn erw_raises_expectation() {
        let mut a = UnbreakableArmorAnalyzer::new(60_000);
        feed(&mut a, &ev(1_000, EventType::ApplyBuff, "Unbreakable Armor"));
        feed(&mut a, &ev(1_500, EventType::Cast, "Empower Rune Weapon"));
        let w = &a.report()["unbreakable_armor"]["windows"][0];
        assert_eq!(w["with_erw"], true);
        assert_eq!(w["num_possible"], 6);
    }

    #[test]
    fn howling_blast_targets() {
        let mut a = HowlingBlastAnalyzer::default();
        let mut single = ev(0, EventType::Cast, "Howling Blast");
        single.num_targets = Some(1);
        let mut km_pair = ev(1, EventType::Cast, "Howling Blast");
        km_pair.num_targets = Some(2);
        km_pair.consumes_km = true;

        assert_eq!(feed(&mut a, &single).bad_howling_blast, Some(true));
        assert_eq!(feed(&mut a, &km_pair).bad_howling_blast, Some(false));
        assert_eq!(a.score(), Some(0.5));
    }

    #[test]
    fn rime_counts_starting_proc() {
        let mut buffs = BuffTracker::new(TRACKED_BUFFS, 60_000, &[], false);
        buffs.preprocess_event(&ev(2_000, EventType::RemoveBuff, "Rime"));
        let mut a = RimeAnalyzer::new(&buffs);

        let mut hb = ev(1_000, EventType::Cast, "Howling Blast");
        hb.consumes_rime = true;
        feed(&mut a, &hb);
        feed(&mut a, &ev(5_000, EventType::ApplyBuff, "Rime"));

        assert_eq!(a.report()["rime"]["num_total"], 2);
        assert_eq!(a.score(), Some(0.5));
    }

    #[test]
    fn raise_dead_possible_uses() {
        let mut a = RaiseDeadAnalyzer::new(400_000);
        assert_eq!(a.possible(), 3);
        feed(&mut a, &ev(0, EventType::Cast, "Raise Dead"));
        assert!((a.score().unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(RaiseDeadAnalyzer::new(10_000).possible(), 0);
    }
}
