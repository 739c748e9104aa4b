/// Gargoyle summons: what the pet did during each window and what the
/// player had up when it was summoned.
///
/// The Gargoyle snapshots attack power at summon but scales with haste for
/// its whole life, so attack power procs are checked at the summon instant
/// and haste effects by uptime over the window.
use super::{buff_uptime::BuffUptime, report, Analyzer, AnalyzerKind, EventInput, Report};
use crate::{
    annotation::Annotation,
    buffs::BuffTracker,
    error::Result,
    event::{Event, EventType},
    items::{Items, TrinketKind, T9_PROC},
    pets::GARGOYLE,
    window::Window,
};
use serde_json::{json, Value};

pub const GARGOYLE_DURATION_MS: i64 = 30_000;
const GARGOYLE_CD_MS: i64 = 183_000;
const GARGOYLE_FIRST_USE_MS: i64 = 20_000;

/// Summon windows straight from the event list. The melee check uses these
/// as time the player spends feeding the pet rather than swinging.
pub fn gargoyle_windows(events: &[Event]) -> Vec<Window> {
    events
        .iter()
        .filter(|e| e.is_cast_of("Summon Gargoyle"))
        .map(|e| Window::closed(e.timestamp, e.timestamp + GARGOYLE_DURATION_MS))
        .collect()
}

#[derive(Debug, Clone)]
struct GargoyleWindow {
    start:     i64,
    end:       i64,
    damage:    i64,
    num_casts: u32,
    num_melees: u32,
}

impl GargoyleWindow {
    fn new(start: i64) -> Self {
        Self { start, end: start + GARGOYLE_DURATION_MS, damage: 0, num_casts: 0, num_melees: 0 }
    }

    fn covers(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

pub struct GargoyleAnalyzer<'a> {
    fight_end: i64,
    buffs:     &'a BuffTracker,
    items:     &'a Items,
    windows:   Vec<GargoyleWindow>,
}

impl<'a> GargoyleAnalyzer<'a> {
    pub fn new(fight_end: i64, buffs: &'a BuffTracker, items: &'a Items) -> Self {
        Self { fight_end, buffs, items, windows: Vec::new() }
    }

    pub fn possible(&self) -> i64 {
        (1 + (self.fight_end - GARGOYLE_FIRST_USE_MS).div_euclid(GARGOYLE_CD_MS)).max(self.windows.len() as i64)
    }

    fn uptime(&self, names: &[&str], window: &GargoyleWindow) -> f64 {
        BuffUptime::new(self.buffs, names, self.fight_end)
            .between(window.start, window.end)
            .uptime()
    }

    /// `null` when the buff never shows up in the fight at all, so a race
    /// or profession the player doesn't have isn't shown as missed.
    fn optional_uptime(&self, name: &str, window: &GargoyleWindow) -> Value {
        if self.buffs.num_windows(name) == 0 {
            return Value::Null;
        }
        json!(self.uptime(&[name], window))
    }

    fn optional_snapshot(&self, name: &str, at: i64) -> Value {
        if self.buffs.num_windows(name) == 0 {
            return Value::Null;
        }
        json!(self.buffs.is_active(name, at))
    }

    fn window_report(&self, window: &GargoyleWindow) -> Value {
        let trinkets = self.items.trinkets();

        let trinket_uptimes: Vec<_> = trinkets
            .iter()
            .filter(|t| t.trinket.kind == TrinketKind::Haste)
            .map(|t| json!({
                "name":   t.trinket.name,
                "icon":   t.icon,
                "uptime": self.uptime(&[t.trinket.buff_name], window),
            }))
            .collect();

        let trinket_snapshots: Vec<_> = trinkets
            .iter()
            .filter(|t| t.trinket.snapshots_gargoyle())
            .map(|t| json!({
                "name":         t.trinket.name,
                "icon":         t.icon,
                "did_snapshot": self.buffs.is_active(t.trinket.buff_name, window.start),
            }))
            .collect();

        let sigil = self.items.sigil();
        let snapshotted_sigil = sigil.map(|s| self.buffs.is_active(s.buff_name, window.start));
        let snapshotted_t9 = self
            .items
            .has_t9_2p()
            .then(|| self.buffs.is_active(T9_PROC, window.start));

        json!({
            "start":                  window.start,
            "end":                    window.end,
            "damage":                 window.damage,
            "num_casts":              window.num_casts,
            "num_melees":             window.num_melees,
            "trinket_uptimes":        trinket_uptimes,
            "unholy_presence_uptime": self.uptime(&["Unholy Presence"], window),
            "bloodlust_uptime":       self.uptime(&["Bloodlust", "Heroism"], window),
            "hyperspeed_uptime":      self.uptime(&["Hyperspeed Acceleration"], window),
            "speed_uptime":           self.uptime(&["Speed"], window),
            "berserking_uptime":      self.optional_uptime("Berserking", window),
            "trinket_snapshots":      trinket_snapshots,
            "snapshotted_fc":         self.buffs.is_active("Unholy Strength", window.start),
            "snapshotted_bloodfury":  self.optional_snapshot("Blood Fury", window.start),
            "snapshotted_sigil":      snapshotted_sigil,
            "sigil_name":             sigil.map(|s| s.name),
            "snapshotted_t9":         snapshotted_t9,
        })
    }
}

impl Analyzer for GargoyleAnalyzer<'_> {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Gargoyle
    }

    fn include_pet_events(&self) -> bool {
        true
    }

    fn add_event(&mut self, input: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        let event = input.event;
        if event.is_cast_of("Summon Gargoyle") {
            self.windows.push(GargoyleWindow::new(event.timestamp));
            return Ok(());
        }

        let from_gargoyle = input.decoration.pet_name.as_deref() == Some(GARGOYLE) || event.source == GARGOYLE;
        if !from_gargoyle {
            return Ok(());
        }
        let Some(window) = self.windows.iter_mut().rev().find(|w| w.covers(event.timestamp)) else {
            return Ok(());
        };

        match event.kind {
            EventType::Cast if event.ability == "Gargoyle Strike" => window.num_casts += 1,
            EventType::Damage => {
                window.damage += event.amount.unwrap_or(0);
                if event.ability == "Melee" {
                    window.num_melees += 1;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn report(&self) -> Report {
        let windows: Vec<_> = self.windows.iter().map(|w| self.window_report(w)).collect();
        report("gargoyle", json!({
            "num_actual":   self.windows.len(),
            "num_possible": self.possible(),
            "windows":      windows,
        }))
    }

    fn log_summary(&self) {
        tracing::info!("Summoned Gargoyle {} of a possible {} times", self.windows.len(), self.possible());
    }
}
