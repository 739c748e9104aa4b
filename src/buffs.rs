/// Buff timelines built from apply/remove events, queried by timestamp.
///
/// Like the dead-zone pass, the tracker needs the whole fight before it can
/// answer "was X up at t": removes without a matching apply retroactively
/// open a window at 0.
use crate::{
    analyzers::{report, Analyzer, AnalyzerKind, EventInput, Report},
    annotation::Annotation,
    error::Result,
    event::{Event, EventType, StartingAura},
    window::Window,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

/// Buffs surfaced on every event's decoration.
pub const TRACKED_BUFFS: &[&str] = &[
    "Unbreakable Armor",
    "Heroism",
    "Bloodlust",
    "Speed",
    "Rime",
    "Meteorite Whetstone",
    "Hyperspeed Acceleration",
    "Reflection of Torment",
    "Greatness",
    "Killing Machine",
    "Grim Toll",
    "Indestructible",
    "Mark of Norgannon",
    "Berserking",
    "Blood Fury",
    "Black Magic",
    "Swordguard Embroidery",
    "Unholy Strength",
    "Skyflare Swiftness",
    "Edward's Insight",
    "Loatheb's Shadow",
    "Cinderglacier",
    "Mjolnir Runestone",
    "Implosion",
    "Comet's Trail",
    "Wrathstone",
    "Blood of the Old God",
    "Pyrite Infusion",
    "Fury of the Five Flights",
    "Desolation",
];

pub const FLASK: &str = "Flask of Endless Rage";
/// The two potions share a cooldown; drinking one cancels the other.
const POTIONS: [&str; 2] = ["Speed", "Indestructible"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveBuff {
    pub ability:      String,
    pub ability_icon: Option<String>,
    #[serde(rename = "abilityGameID")]
    pub ability_id:   Option<u64>,
    pub start:        i64,
}

// ---------------------------------------------------------------------------
// BuffWindows
// ---------------------------------------------------------------------------

/// Ordered, non-overlapping windows of one buff. Only the last may be open.
#[derive(Debug, Clone)]
pub struct BuffWindows {
    pub name:       String,
    pub ability_id: Option<u64>,
    pub icon:       Option<String>,
    windows:        Vec<Window>,
}

impl BuffWindows {
    fn new(name: &str, ability_id: Option<u64>, icon: Option<String>) -> Self {
        Self { name: name.to_owned(), ability_id, icon, windows: Vec::new() }
    }

    pub fn has_window(&self) -> bool {
        !self.windows.is_empty()
    }

    pub fn active_window_mut(&mut self) -> Option<&mut Window> {
        self.windows.last_mut().filter(|w| w.is_open())
    }

    pub fn has_active_window(&self) -> bool {
        self.windows.last().map_or(false, Window::is_open)
    }

    pub fn num_windows(&self) -> usize {
        self.windows.len()
    }

    fn add_window(&mut self, window: Window) {
        self.windows.push(window);
    }

    fn pop(&mut self) -> Option<Window> {
        self.windows.pop()
    }

    pub fn containing_window(&self, timestamp: i64) -> Option<&Window> {
        self.windows.iter().find(|w| w.contains(timestamp))
    }
}

// ---------------------------------------------------------------------------
// BuffTracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BuffTracker {
    tracked:     Vec<String>,
    end_time:    i64,
    /// Potion usage is part of the consumables score for Frost only.
    score_potions: bool,
    buffs:       Vec<BuffWindows>,
    index:       HashMap<String, usize>,
}

impl BuffTracker {
    pub fn new(
        tracked:        &[&str],
        end_time:       i64,
        starting_auras: &[StartingAura],
        score_potions:  bool,
    ) -> Self {
        let mut tracker = Self {
            tracked: tracked.iter().map(|s| (*s).to_owned()).collect(),
            end_time,
            score_potions,
            buffs: Vec::new(),
            index: HashMap::new(),
        };
        for aura in starting_auras {
            let windows = tracker.windows_mut(&aura.name, aura.ability, aura.ability_icon.clone());
            // Some auras are reported twice.
            if !windows.has_window() {
                windows.add_window(Window::open(0));
            }
        }
        tracker
    }

    fn windows_mut(&mut self, name: &str, ability_id: Option<u64>, icon: Option<String>) -> &mut BuffWindows {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.buffs.push(BuffWindows::new(name, ability_id, icon));
                self.index.insert(name.to_owned(), self.buffs.len() - 1);
                self.buffs.len() - 1
            }
        };
        &mut self.buffs[idx]
    }

    fn windows_of(&self, name: &str) -> Option<&BuffWindows> {
        self.index.get(name).map(|&idx| &self.buffs[idx])
    }

    pub fn preprocess_event(&mut self, event: &Event) {
        if !matches!(
            event.kind,
            EventType::ApplyBuff
                | EventType::RemoveBuff
                | EventType::RemoveBuffStack
                | EventType::RefreshBuff
                | EventType::Heal
        ) {
            return;
        }

        let ts = event.timestamp;

        if event.kind == EventType::ApplyBuff && POTIONS.contains(&event.ability.as_str()) {
            let shared = POTIONS.into_iter().find(|potion| self.is_active(potion, ts));
            if let Some(potion) = shared {
                if let Some(&idx) = self.index.get(potion) {
                    self.buffs[idx].pop();
                }
            }
        }

        let windows = self.windows_mut(&event.ability, event.ability_id, event.ability_icon.clone());
        match event.kind {
            // Already up before we saw an apply.
            EventType::RemoveBuffStack | EventType::RefreshBuff | EventType::Heal => {
                if !windows.has_window() {
                    windows.add_window(Window::open(0));
                }
            }
            EventType::ApplyBuff => {
                if !windows.has_active_window() {
                    windows.add_window(Window::open(ts));
                }
            }
            EventType::RemoveBuff => {
                if let Some(active) = windows.active_window_mut() {
                    active.close_at(ts);
                } else if !windows.has_window() {
                    windows.add_window(Window::closed(0, ts));
                }
            }
            _ => {}
        }
    }

    /// Windows for `buff`, with a trailing open window closed at fight end.
    pub fn get_windows(&self, buff: &str) -> Vec<Window> {
        let Some(windows) = self.windows_of(buff) else { return Vec::new() };
        windows
            .windows
            .iter()
            .map(|w| {
                let mut w = *w;
                w.close_at(self.end_time);
                w
            })
            .collect()
    }

    pub fn num_windows(&self, buff: &str) -> usize {
        self.windows_of(buff).map_or(0, BuffWindows::num_windows)
    }

    pub fn is_active(&self, buff: &str, timestamp: i64) -> bool {
        self.windows_of(buff)
            .map_or(false, |w| w.containing_window(timestamp).is_some())
    }

    /// Tracked buffs up at `timestamp`, ordered by when their window began.
    pub fn get_active_buffs(&self, timestamp: i64) -> Vec<ActiveBuff> {
        let mut active: Vec<ActiveBuff> = self
            .buffs
            .iter()
            .filter(|b| self.tracked.iter().any(|t| *t == b.name))
            .filter_map(|b| {
                b.containing_window(timestamp).map(|w| ActiveBuff {
                    ability:      b.name.clone(),
                    ability_icon: b.icon.clone(),
                    ability_id:   b.ability_id,
                    start:        w.start,
                })
            })
            .collect();
        active.sort_by_key(|b| b.start);
        active
    }

    pub fn has_flask(&self) -> bool {
        self.num_windows(FLASK) > 0
    }

    pub fn num_potions(&self) -> usize {
        POTIONS.iter().map(|p| self.num_windows(p)).sum()
    }
}

/// The tracker doubles as the consumables analyzer. Its timelines are
/// already complete, so it ignores the fold.
impl Analyzer for &BuffTracker {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::BuffTracker
    }

    fn add_event(&mut self, _: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        let flask = if self.has_flask() { 1.0 } else { 0.0 };
        if !self.score_potions {
            return Some(flask);
        }
        let pots = self.num_potions();
        let possible = pots.max(2);
        Some(pots as f64 / possible as f64 * 0.5 + flask * 0.5)
    }

    fn report(&self) -> Report {
        let mut out = report("flask_usage", json!({ "has_flask": self.has_flask() }));
        if self.score_potions {
            out.insert("potion_usage".into(), json!({ "potions_used": self.num_potions() }));
        }
        out
    }

    fn log_summary(&self) {
        if self.has_flask() {
            tracing::info!("Flask active during the fight");
        } else {
            tracing::info!("No flask during the fight");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn buff(ts: i64, kind: EventType, ability: &str) -> Event {
        Event::new(ts, kind, ability, 1, 1)
    }

    fn tracker(events: &[Event], auras: &[StartingAura]) -> BuffTracker {
        let mut t = BuffTracker::new(TRACKED_BUFFS, 100_000, auras, false);
        for e in events {
            t.preprocess_event(e);
        }
        t
    }

    fn aura(name: &str) -> StartingAura {
        StartingAura { name: name.into(), ability: Some(1), ability_icon: None }
    }

    #[test]
    fn apply_and_remove_make_window() {
        let t = tracker(&[
            buff(1_000, EventType::ApplyBuff, "Greatness"),
            buff(16_000, EventType::RemoveBuff, "Greatness"),
        ], &[]);
        assert_eq!(t.get_windows("Greatness"), vec![Window::closed(1_000, 16_000)]);
        assert!(t.is_active("Greatness", 15_999));
        assert!(!t.is_active("Greatness", 16_000));
    }

    #[test]
    fn repeated_apply_is_idempotent() {
        let t = tracker(&[
            buff(1_000, EventType::ApplyBuff, "Rime"),
            buff(2_000, EventType::ApplyBuff, "Rime"),
            buff(3_000, EventType::RemoveBuff, "Rime"),
        ], &[]);
        assert_eq!(t.get_windows("Rime"), vec![Window::closed(1_000, 3_000)]);
    }

    #[test]
    fn remove_without_apply_was_a_starting_aura() {
        let t = tracker(&[buff(5_000, EventType::RemoveBuff, "Horn of Winter")], &[]);
        assert_eq!(t.get_windows("Horn of Winter"), vec![Window::closed(0, 5_000)]);

        let t = tracker(&[buff(5_000, EventType::RefreshBuff, "Horn of Winter")], &[]);
        assert_eq!(t.get_windows("Horn of Winter"), vec![Window::closed(0, 100_000)]);
    }

    #[test]
    fn starting_auras_open_at_zero_once() {
        let t = tracker(&[], &[aura("Unholy Presence"), aura("Unholy Presence")]);
        assert_eq!(t.get_windows("Unholy Presence"), vec![Window::closed(0, 100_000)]);
    }

    #[test]
    fn potions_cancel_each_other() {
        let t = tracker(&[
            buff(0, EventType::ApplyBuff, "Indestructible"),
            buff(1_000, EventType::ApplyBuff, "Speed"),
            buff(16_000, EventType::RemoveBuff, "Speed"),
        ], &[]);
        assert_eq!(t.num_windows("Indestructible"), 0);
        assert_eq!(t.num_potions(), 1);
    }

    #[test]
    fn windows_never_exceed_fight() {
        let t = tracker(&[
            buff(0, EventType::ApplyBuff, "Bloodlust"),
            buff(40_000, EventType::RemoveBuff, "Bloodlust"),
            buff(90_000, EventType::ApplyBuff, "Bloodlust"),
        ], &[]);
        let total: i64 = t.get_windows("Bloodlust").iter().filter_map(Window::duration).sum();
        assert!(total <= 100_000);
        assert_eq!(total, 50_000);
    }

    #[test]
    fn active_buffs_are_tracked_and_sorted() {
        let t = tracker(&[
            buff(3_000, EventType::ApplyBuff, "Greatness"),
            buff(1_000, EventType::ApplyBuff, "Unholy Strength"),
            buff(2_000, EventType::ApplyBuff, "Horn of Winter"),
        ], &[]);
        let active: Vec<String> = t.get_active_buffs(5_000).into_iter().map(|b| b.ability).collect();
        assert_eq!(active, vec!["Unholy Strength", "Greatness"]);
    }

    #[test]
    fn consumables_score() {
        let with_flask = tracker(&[], &[aura(FLASK)]);
        assert_eq!((&with_flask).score(), Some(1.0));

        let mut frost = BuffTracker::new(TRACKED_BUFFS, 100_000, &[aura(FLASK)], true);
        frost.preprocess_event(&buff(0, EventType::ApplyBuff, "Speed"));
        assert_eq!((&frost).score(), Some(0.75));
        let report = (&frost).report();
        assert_eq!(report["potion_usage"]["potions_used"], 1);
        assert_eq!(report["flask_usage"]["has_flask"], true);
    }
}
