/// Six-slot rune simulator with grace-period drift accounting.
///
/// Slots 0-1 are Blood, 2-3 Frost, 4-5 Unholy. Only the Blood slots can
/// carry a Death overlay, either from a converting ability (`is_death`) or
/// from Blood Tap (`blood_tapped`). The two flags are mutually exclusive;
/// the difference matters when the rune is spent: a converted Death rune
/// reverts to Blood, a Blood-tapped one stays Death until the buff drops.
///
/// A rune is available when `regen_time` is unset or has passed. Spending
/// an available rune starts a cooldown shortened by whatever part of the
/// grace period it sat ready; readiness beyond the grace period is drift.
///
/// The telemetry's "runes available" counts are sometimes wrong, so every
/// rune-costed event first resyncs: it can only grant availability, never
/// take it away.
use crate::{
    analyzers::{report, Analyzer, AnalyzerKind, EventInput, Report},
    annotation::Annotation,
    config::AnalysisConfig,
    error::{AnalysisError, Result},
    event::{EventType, RuneCounts},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::ops::Range;

pub const BLOOD:  Range<usize> = 0..2;
pub const FROST:  Range<usize> = 2..4;
pub const UNHOLY: Range<usize> = 4..6;

/// Candidate Death flags for the two Blood slots at pull, in the order they
/// are tried when resolving the starting state.
pub const INITIAL_DEATH_STATES: [(bool, bool); 4] =
    [(false, false), (true, false), (false, true), (true, true)];

const SLOT_NAMES: [&str; 6] = ["Blood1", "Blood2", "Frost1", "Frost2", "Unholy1", "Unholy2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuneType {
    Blood,
    Frost,
    Unholy,
}

impl RuneType {
    fn of_slot(slot: usize) -> Self {
        match slot {
            0 | 1 => Self::Blood,
            2 | 3 => Self::Frost,
            _ => Self::Unholy,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Blood  => "Blood",
            Self::Frost  => "Frost",
            Self::Unholy => "Unholy",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RuneTiming {
    grace_ms:    i64,
    cooldown_ms: i64,
}

// ---------------------------------------------------------------------------
// Rune
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Rune {
    pub slot_name:    &'static str,
    pub kind:         RuneType,
    /// Death rune through a converting ability.
    pub is_death:     bool,
    /// Death rune through Blood Tap; survives being spent.
    pub blood_tapped: bool,
    /// `None` = never spent, available immediately.
    pub regen_time:   Option<i64>,
}

impl Rune {
    fn new(slot: usize) -> Self {
        Self {
            slot_name:    SLOT_NAMES[slot],
            kind:         RuneType::of_slot(slot),
            is_death:     false,
            blood_tapped: false,
            regen_time:   None,
        }
    }

    pub fn can_spend(&self, timestamp: i64) -> bool {
        self.regen_time.map_or(true, |regen| timestamp >= regen)
    }

    pub fn can_spend_death(&self, timestamp: i64) -> bool {
        self.is_any_death() && self.can_spend(timestamp)
    }

    pub fn is_any_death(&self) -> bool {
        self.is_death || self.blood_tapped
    }

    pub fn time_since_regen(&self, timestamp: i64) -> i64 {
        self.regen_time.map_or(0, |regen| (timestamp - regen).max(0))
    }

    fn refresh(&mut self, timestamp: i64) {
        self.regen_time = Some(timestamp);
    }

    /// Returns the drift (ms ready beyond the grace period), or `None` when
    /// the rune is still regenerating.
    fn spend(&mut self, timestamp: i64, convert: bool, timing: RuneTiming) -> Result<Option<i64>> {
        if !self.can_spend(timestamp) {
            return Ok(None);
        }

        let since_regen = self.time_since_regen(timestamp);
        let grace_used = since_regen.min(timing.grace_ms);
        let grace_wasted = (since_regen - timing.grace_ms).max(0);
        self.regen_time = Some(timestamp + (timing.cooldown_ms - grace_used));

        if convert && !self.blood_tapped {
            self.convert_to_death()?;
        }
        Ok(Some(grace_wasted))
    }

    /// Spend as a Death rune. Drift on Death runes is not tracked.
    fn spend_death(&mut self, timestamp: i64, convert_back: bool, timing: RuneTiming) -> Result<bool> {
        if !self.can_spend_death(timestamp) {
            return Ok(false);
        }
        if self.spend(timestamp, false, timing)?.is_none() {
            return Ok(false);
        }
        if convert_back && !self.blood_tapped {
            self.is_death = false;
        }
        Ok(true)
    }

    fn convert_to_death(&mut self) -> Result<()> {
        if self.blood_tapped {
            return Err(AnalysisError::RuneInvariant {
                rune:   self.slot_name,
                detail: "death conversion of a blood-tapped rune",
            });
        }
        self.is_death = true;
        Ok(())
    }

    fn blood_tap(&mut self) -> Result<()> {
        if self.is_death {
            return Err(AnalysisError::RuneInvariant {
                rune:   self.slot_name,
                detail: "blood tap on a converted death rune",
            });
        }
        self.blood_tapped = true;
        Ok(())
    }

    pub fn display_name(&self) -> &'static str {
        if self.is_any_death() {
            "Death"
        } else {
            self.kind.name()
        }
    }
}

/// Serialized rune state attached to events for replay in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuneSnapshot {
    pub name:         &'static str,
    pub is_available: bool,
    pub regen_time:   Option<i64>,
}

// ---------------------------------------------------------------------------
// RuneTracker
// ---------------------------------------------------------------------------

/// Per-spec rune behaviour, taken from the spec profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RuneTrackerSettings {
    /// Whether converting abilities turn the Blood runes they spend into Death.
    #[serde(default)]
    pub convert_blood:        bool,
    #[serde(default)]
    pub converting_abilities: Vec<String>,
    /// Rune classes whose drift counts toward the score.
    #[serde(default)]
    pub drift_types:          Vec<RuneType>,
}

#[derive(Debug, Clone)]
pub struct RuneTracker {
    runes:             [Rune; 6],
    settings:          RuneTrackerSettings,
    timing:            RuneTiming,
    drift_buffer_ms:   i64,
    penalty_per_ms:    f64,
    rune_grace_wasted: i64,
    had_spend_error:   bool,
}

impl RuneTracker {
    pub fn new(settings: RuneTrackerSettings, config: &AnalysisConfig) -> Self {
        Self {
            runes:             std::array::from_fn(Rune::new),
            settings,
            timing:            RuneTiming {
                grace_ms:    config.rune_grace_ms,
                cooldown_ms: config.rune_cooldown_ms,
            },
            drift_buffer_ms:   config.dead_zone_drift_buffer_ms,
            penalty_per_ms:    config.drift_penalty_per_ms,
            rune_grace_wasted: 0,
            had_spend_error:   false,
        }
    }

    /// Seed the Death flags of the two Blood slots.
    pub fn with_initial_death_state(mut self, (blood0, blood1): (bool, bool)) -> Self {
        self.runes[0].is_death = blood0;
        self.runes[1].is_death = blood1;
        self
    }

    pub fn runes(&self) -> &[Rune; 6] {
        &self.runes
    }

    pub fn total_grace_wasted(&self) -> i64 {
        self.rune_grace_wasted
    }

    pub fn had_spend_error(&self) -> bool {
        self.had_spend_error
    }

    fn death_slots(&self) -> Vec<usize> {
        (0..self.runes.len()).filter(|&i| self.runes[i].is_any_death()).collect()
    }

    /// Slots ordered oldest-regenerated first, ties broken by slot index.
    fn oldest_first(&self, slots: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let mut slots: Vec<usize> = slots.into_iter().collect();
        slots.sort_by_key(|&i| (self.runes[i].regen_time.unwrap_or(0), i));
        slots
    }

    pub fn current_runes(&self, timestamp: i64) -> RuneCounts {
        let count = |range: Range<usize>| {
            self.runes[range].iter().filter(|r| r.can_spend(timestamp)).count() as u32
        };
        RuneCounts::new(count(BLOOD), count(FROST), count(UNHOLY))
    }

    pub fn snapshot(&self, timestamp: i64) -> Vec<RuneSnapshot> {
        self.runes
            .iter()
            .map(|r| RuneSnapshot {
                name:         r.display_name(),
                is_available: r.can_spend(timestamp),
                regen_time:   r.regen_time,
            })
            .collect()
    }

    /// Force the `num` oldest runes among `slots` to be available.
    fn resync_slots(&mut self, slots: Vec<usize>, num: i64, timestamp: i64) {
        let ordered = self.oldest_first(slots);
        for i in ordered.into_iter().take(num.max(0) as usize) {
            if !self.runes[i].can_spend(timestamp) {
                self.runes[i].refresh(timestamp);
            }
        }
    }

    /// Reconcile with what the log says was used. `runes_used` should already
    /// be the per-class maximum of the tracker's belief and the log's claim.
    pub fn resync_runes(&mut self, timestamp: i64, rune_cost: RuneCounts, runes_used: RuneCounts) {
        self.resync_slots(BLOOD.collect(), runes_used.blood as i64, timestamp);
        self.resync_slots(FROST.collect(), runes_used.frost as i64, timestamp);
        self.resync_slots(UNHOLY.collect(), runes_used.unholy as i64, timestamp);

        let residual = rune_cost.total() as i64 - runes_used.total() as i64;
        let deaths = self.death_slots();
        self.resync_slots(deaths, residual, timestamp);
    }

    /// Pay `num` runes of one class. Returns whether it was fully paid and
    /// the drift accumulated on the non-Death runes used.
    fn spend_class(
        &mut self,
        num:       u32,
        class:     Range<usize>,
        timestamp: i64,
        convert:   bool,
    ) -> Result<(bool, i64)> {
        if num == 0 {
            return Ok((true, 0));
        }

        let timing = self.timing;
        let mut spent = 0;
        let mut grace_wasted = 0;

        // Plain runes of the matching type first; Death runes are the fallback.
        for i in self.oldest_first(class.clone()) {
            if spent == num {
                break;
            }
            let rune = &mut self.runes[i];
            if rune.can_spend(timestamp) && !rune.can_spend_death(timestamp) {
                if let Some(wasted) = rune.spend(timestamp, convert, timing)? {
                    grace_wasted += wasted;
                    spent += 1;
                }
            }
        }

        for i in BLOOD {
            if spent == num {
                break;
            }
            if !self.runes[i].can_spend_death(timestamp) {
                continue;
            }
            self.runes[i].spend_death(timestamp, !convert, timing)?;
            spent += 1;

            // Paying a converting cast with a Blood-tapped rune hands the
            // conversion to the next eligible rune of the class.
            if convert && self.runes[i].blood_tapped {
                if self.runes[i].is_death {
                    return Err(AnalysisError::RuneInvariant {
                        rune:   self.runes[i].slot_name,
                        detail: "rune is both blood-tapped and death-converted",
                    });
                }
                let target = class
                    .clone()
                    .find(|&j| !self.runes[j].is_death && !self.runes[j].blood_tapped);
                if let Some(j) = target {
                    self.runes[j].convert_to_death()?;
                }
            }
        }

        Ok((spent == num, grace_wasted))
    }

    /// Pay a cast's rune cost. Returns `(fully_paid, drift_ms)` where drift
    /// is the largest per-class drift among the tracked drift types.
    ///
    /// A failed spend leaves the runes as far as it got; the caller flags the
    /// event instead of aborting.
    pub fn spend(&mut self, ability: &str, timestamp: i64, cost: RuneCounts) -> Result<(bool, i64)> {
        let convert_blood = self.settings.convert_blood
            && self.settings.converting_abilities.iter().any(|a| a == ability);

        let (blood_ok,  blood_drift)  = self.spend_class(cost.blood, BLOOD, timestamp, convert_blood)?;
        let (frost_ok,  frost_drift)  = self.spend_class(cost.frost, FROST, timestamp, false)?;
        let (unholy_ok, unholy_drift) = self.spend_class(cost.unholy, UNHOLY, timestamp, false)?;

        let drift = [
            (RuneType::Blood, blood_drift),
            (RuneType::Frost, frost_drift),
            (RuneType::Unholy, unholy_drift),
        ]
        .into_iter()
        .filter(|(kind, _)| self.settings.drift_types.contains(kind))
        .map(|(_, drift)| drift)
        .max()
        .unwrap_or(0);

        Ok((blood_ok && frost_ok && unholy_ok, drift))
    }

    /// Turn one non-Death Blood rune into a Blood-tapped Death rune, then
    /// finish the cooldown of one regenerating Blood rune.
    pub fn blood_tap(&mut self, timestamp: i64) -> Result<()> {
        if let Some(i) = BLOOD.clone().find(|&i| !self.runes[i].is_death) {
            self.runes[i].blood_tap()?;
        }
        if let Some(i) = BLOOD.clone().find(|&i| !self.runes[i].can_spend(timestamp)) {
            self.runes[i].refresh(timestamp);
        }
        Ok(())
    }

    pub fn stop_blood_tap(&mut self) {
        if let Some(rune) = self.runes[BLOOD].iter_mut().find(|r| r.blood_tapped) {
            rune.blood_tapped = false;
        }
    }

    /// Empower Rune Weapon: every regenerating rune becomes available.
    pub fn empower_rune_weapon(&mut self, timestamp: i64) {
        for rune in self.runes.iter_mut().filter(|r| !r.can_spend(timestamp)) {
            rune.refresh(timestamp);
        }
    }
}

impl Analyzer for RuneTracker {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::RuneTracker
    }

    fn add_event(&mut self, input: &EventInput<'_>, notes: &mut Annotation) -> Result<()> {
        let event = input.event;
        let ts = event.timestamp;

        if let Some(cost) = event.rune_cost {
            // Only grant a rune the log claims when we actually believe we
            // are short of it.
            let current = self.current_runes(ts);
            let claimed = event.runes_used.unwrap_or_default();
            let needed = RuneCounts::new(
                current.blood.max(claimed.blood),
                current.frost.max(claimed.frost),
                current.unholy.max(claimed.unholy),
            );
            self.resync_runes(ts, cost, needed);
        }

        notes.runes_before = Some(self.snapshot(ts));

        if event.kind == EventType::Cast {
            if let Some(cost) = event.rune_cost {
                let (spent, grace_wasted) = self.spend(&event.ability, ts, cost)?;
                notes.rune_spend_error = !spent;
                self.had_spend_error |= !spent;

                let clear_of_dead_zones = !input.decoration.in_dead_zone
                    && input
                        .decoration
                        .since_dead_zone_end(ts)
                        .map_or(true, |since| since > self.drift_buffer_ms);
                if clear_of_dead_zones {
                    notes.rune_grace_wasted = Some(grace_wasted);
                    self.rune_grace_wasted += grace_wasted;
                }
            }

            match event.ability.as_str() {
                "Blood Tap" => self.blood_tap(ts)?,
                "Empower Rune Weapon" => self.empower_rune_weapon(ts),
                _ => {}
            }
        }

        if event.is(EventType::RemoveBuff, "Blood Tap") {
            self.stop_blood_tap();
        }

        notes.runes = Some(self.snapshot(ts));
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        Some((1.0 - self.rune_grace_wasted as f64 * self.penalty_per_ms).max(0.0))
    }

    fn report(&self) -> Report {
        report("rune_drift", json!({ "rune_drift_ms": self.rune_grace_wasted }))
    }

    fn log_summary(&self) {
        tracing::info!("Runes drifted by a total of {} ms", self.rune_grace_wasted);
    }
}
