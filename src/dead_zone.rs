/// Encounter-specific forced downtime ("dead zones").
///
/// Each supported encounter has a small detector that watches one marker
/// pattern and emits a zone `[last_marker + 1, current_marker]`. Unknown
/// encounters simply never produce zones. Detectors never fail: a missing
/// preceding marker means no zone.
///
/// Pass 1 (`preprocess_event`) must see the whole fight before any
/// `decoration` call.
use crate::{
    annotation::Decoration,
    event::{Event, EventType, Fight},
    window::Window,
};
use once_cell::sync::Lazy;
use std::collections::HashMap;

const LOATHEB_MELEE_ABILITIES: &[&str] = &[
    "Melee",
    "Obliterate",
    "Frost Strike",
    "Blood Strike",
    "Plague Strike",
    "Pestilence",
];

/// What a detector may know about the fight up front.
#[derive(Debug, Clone)]
pub struct DetectorContext {
    pub player_name:  String,
    pub is_hard_mode: bool,
}

pub trait DeadZoneDetector: Send {
    /// Feed one event; returns a finished zone when this event closes one.
    fn observe(&mut self, event: &Event, ctx: &DetectorContext, zones: &[Window]) -> Option<Window>;
}

/// Zones are inclusive on both ends, starting one ms after the last marker.
/// Two markers on the same millisecond yield an empty (start > end) zone
/// that contains nothing.
fn zone_between(last: i64, current: i64) -> Window {
    Window { start: last + 1, end: Some(current) }
}

// ---------------------------------------------------------------------------
// Detectors
// ---------------------------------------------------------------------------

/// Zone spans a debuff on the player, from apply to remove.
struct DebuffDetector {
    debuff:     &'static str,
    applied_at: Option<i64>,
}

impl DeadZoneDetector for DebuffDetector {
    fn observe(&mut self, event: &Event, _: &DetectorContext, _: &[Window]) -> Option<Window> {
        if event.ability != self.debuff {
            return None;
        }
        match event.kind {
            EventType::ApplyDebuff => {
                self.applied_at = Some(event.timestamp);
                None
            }
            EventType::RemoveDebuff => self.applied_at.map(|at| zone_between(at, event.timestamp)),
            _ => None,
        }
    }
}

/// Zone spans any gap between two player casts on `target` longer than `gap_ms`.
struct CastGapDetector {
    target:    &'static str,
    gap_ms:    i64,
    abilities: Option<&'static [&'static str]>,
    last_cast: Option<i64>,
}

impl DeadZoneDetector for CastGapDetector {
    fn observe(&mut self, event: &Event, ctx: &DetectorContext, _: &[Window]) -> Option<Window> {
        if event.target != self.target || event.kind != EventType::Cast {
            return None;
        }
        if let Some(abilities) = self.abilities {
            if !abilities.contains(&event.ability.as_str()) {
                return None;
            }
        }
        if event.source != ctx.player_name {
            return None;
        }

        let zone = self
            .last_cast
            .filter(|last| event.timestamp - last > self.gap_ms)
            .map(|last| zone_between(last, event.timestamp));
        self.last_cast = Some(event.timestamp);
        zone
    }
}

/// Zone spans a switch between boss targets (Thaddius platform jumps).
struct TargetSwitchDetector {
    targets: &'static [&'static str],
    last:    Option<(i64, String)>,
}

impl DeadZoneDetector for TargetSwitchDetector {
    fn observe(&mut self, event: &Event, ctx: &DetectorContext, _: &[Window]) -> Option<Window> {
        if !matches!(event.kind, EventType::Cast | EventType::Damage) {
            return None;
        }
        if !self.targets.contains(&event.target.as_str()) || event.source != ctx.player_name {
            return None;
        }

        let zone = match &self.last {
            Some((ts, target)) if *target != event.target => Some(zone_between(*ts, event.timestamp)),
            _ => None,
        };
        self.last = Some((event.timestamp, event.target.clone()));
        zone
    }
}

/// Hard-mode Vezax: from the boss's first hit at or below 5% health until
/// the Saronite Animus shows up. At most one zone.
#[derive(Default)]
struct VezaxDetector {
    low_health_at: Option<i64>,
}

impl DeadZoneDetector for VezaxDetector {
    fn observe(&mut self, event: &Event, ctx: &DetectorContext, zones: &[Window]) -> Option<Window> {
        if !ctx.is_hard_mode {
            return None;
        }

        if self.low_health_at.is_none()
            && event.kind == EventType::Damage
            && event.target == "General Vezax"
        {
            if let (Some(hp), Some(max)) = (event.hit_points, event.max_hit_points) {
                if max > 0 && hp as f64 / max as f64 <= 0.05 {
                    self.low_health_at = Some(event.timestamp);
                }
            }
        }

        let animus = event.source == "Saronite Animus" || event.target == "Saronite Animus";
        match self.low_health_at {
            Some(at) if animus && zones.is_empty() => Some(zone_between(at, event.timestamp)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

type DetectorFactory = fn() -> Box<dyn DeadZoneDetector>;

fn debuff(debuff: &'static str) -> Box<dyn DeadZoneDetector> {
    Box::new(DebuffDetector { debuff, applied_at: None })
}

static DETECTORS: Lazy<HashMap<&'static str, DetectorFactory>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, DetectorFactory> = HashMap::new();
    map.insert("Loatheb", || {
        Box::new(CastGapDetector {
            target:    "Loatheb",
            gap_ms:    2_000,
            abilities: Some(LOATHEB_MELEE_ABILITIES),
            last_cast: None,
        })
    });
    map.insert("Thaddius", || {
        Box::new(TargetSwitchDetector { targets: &["Thaddius", "Stalagg", "Feugen"], last: None })
    });
    map.insert("Maexxna", || debuff("Web Spray"));
    map.insert("Kel'Thuzad", || debuff("Frost Blast"));
    map.insert("Ignis the Furnace Master", || debuff("Slag Pot"));
    map.insert("Algalon the Observer", || debuff("Black Hole"));
    map.insert("Razorscale", || {
        Box::new(CastGapDetector {
            target:    "Razorscale",
            gap_ms:    20_000,
            abilities: None,
            last_cast: None,
        })
    });
    map.insert("General Vezax", || Box::new(VezaxDetector::default()));
    map
});

pub fn has_detector(encounter: &str) -> bool {
    DETECTORS.contains_key(encounter)
}

// ---------------------------------------------------------------------------
// DeadZoneAnalyzer
// ---------------------------------------------------------------------------

pub struct DeadZoneAnalyzer {
    detector: Option<Box<dyn DeadZoneDetector>>,
    ctx:      DetectorContext,
    zones:    Vec<Window>,
}

impl DeadZoneAnalyzer {
    pub fn new(fight: &Fight) -> Self {
        Self {
            detector: DETECTORS.get(fight.encounter.name.as_str()).map(|make| make()),
            ctx:      DetectorContext {
                player_name:  fight.source.name.clone(),
                is_hard_mode: fight.is_hard_mode,
            },
            zones:    Vec::new(),
        }
    }

    pub fn preprocess_event(&mut self, event: &Event) {
        let Some(detector) = self.detector.as_mut() else { return };
        if let Some(zone) = detector.observe(event, &self.ctx, &self.zones) {
            tracing::debug!(start = zone.start, end = ?zone.end, "dead zone detected");
            self.zones.push(zone);
        }
    }

    /// Latest zone that started at or before `timestamp`. It may already
    /// have ended.
    pub fn recent_dead_zone(&self, timestamp: i64) -> Option<Window> {
        self.zones.iter().rev().find(|z| z.start <= timestamp).copied()
    }

    pub fn dead_zones(&self) -> &[Window] {
        &self.zones
    }

    /// Fill the dead-zone fields of an event's decoration.
    pub fn decorate(&self, timestamp: i64, decoration: &mut Decoration) {
        let recent = self.recent_dead_zone(timestamp);
        decoration.in_dead_zone = recent
            .and_then(|z| z.end)
            .map_or(false, |end| timestamp <= end);
        decoration.recent_dead_zone = recent;
    }
}
