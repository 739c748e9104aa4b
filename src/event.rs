/// Typed view of one normalized fight, as handed over by the event normalizer.
///
/// The normalizer has already rebased timestamps to the fight start (ms),
/// resolved actor and ability names, and coalesced misses and resource
/// deltas. Field names follow the normalizer's JSON, which mixes
/// camelCase ids (`sourceID`, `abilityGameID`) with snake_case flags.
///
/// Nothing here mutates an event. Derived data lives in
/// [`crate::annotation`], keyed by event index.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Cast,
    ApplyBuff,
    RemoveBuff,
    RefreshBuff,
    RemoveBuffStack,
    ApplyDebuff,
    RemoveDebuff,
    RefreshDebuff,
    ApplyDebuffStack,
    Damage,
    ResourceChange,
    Heal,
    #[serde(other)]
    Other,
}

/// Rune counts per resource class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuneCounts {
    #[serde(default)]
    pub blood:  u32,
    #[serde(default)]
    pub frost:  u32,
    #[serde(default)]
    pub unholy: u32,
}

impl RuneCounts {
    pub fn new(blood: u32, frost: u32, unholy: u32) -> Self {
        Self { blood, frost, unholy }
    }

    pub fn total(&self) -> u32 {
        self.blood + self.frost + self.unholy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind:      EventType,
    #[serde(default)]
    pub ability:   String,
    #[serde(rename = "abilityGameID", default)]
    pub ability_id:   Option<u64>,
    #[serde(default)]
    pub ability_icon: Option<String>,

    #[serde(rename = "sourceID")]
    pub source_id: i64,
    #[serde(rename = "targetID")]
    pub target_id: i64,
    #[serde(default)]
    pub source:    String,
    #[serde(default)]
    pub target:    String,
    #[serde(rename = "sourceInstance", default, skip_serializing_if = "Option::is_none")]
    pub source_instance: Option<i64>,

    /// Only present on casts that spend runes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rune_cost:  Option<RuneCounts>,
    /// Runes the log claims were available and used; not always accurate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runes_used: Option<RuneCounts>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount:          Option<i64>,
    #[serde(rename = "hitPoints", default, skip_serializing_if = "Option::is_none")]
    pub hit_points:      Option<i64>,
    #[serde(rename = "maxHitPoints", default, skip_serializing_if = "Option::is_none")]
    pub max_hit_points:  Option<i64>,

    #[serde(default)]
    pub is_miss:             bool,
    #[serde(default)]
    pub target_is_boss:      bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_dies_at:      Option<i64>,
    #[serde(default)]
    pub is_owner_pet_source: bool,
    #[serde(default)]
    pub is_owner_pet_target: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runic_power_waste:      Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runic_power_gained_ams: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_targets:            Option<u32>,
    #[serde(default)]
    pub consumes_rime:          bool,
    #[serde(default)]
    pub consumes_km:            bool,
}

impl Event {
    /// Bare event with everything optional left empty. Used by the binary's
    /// fixtures and by tests to build synthetic fights.
    pub fn new(timestamp: i64, kind: EventType, ability: &str, source_id: i64, target_id: i64) -> Self {
        Self {
            timestamp,
            kind,
            ability:             ability.to_owned(),
            ability_id:          None,
            ability_icon:        None,
            source_id,
            target_id,
            source:              String::new(),
            target:              String::new(),
            source_instance:     None,
            rune_cost:           None,
            runes_used:          None,
            amount:              None,
            hit_points:          None,
            max_hit_points:      None,
            is_miss:             false,
            target_is_boss:      false,
            target_dies_at:      None,
            is_owner_pet_source: false,
            is_owner_pet_target: false,
            runic_power_waste:      None,
            runic_power_gained_ams: None,
            num_targets:            None,
            consumes_rime:          false,
            consumes_km:            false,
        }
    }

    pub fn is_cast_of(&self, ability: &str) -> bool {
        self.kind == EventType::Cast && self.ability == ability
    }

    pub fn is(&self, kind: EventType, ability: &str) -> bool {
        self.kind == kind && self.ability == ability
    }
}

// ---------------------------------------------------------------------------
// Fight
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    pub name: String,
}

/// The player being analyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id:   i64,
    pub name: String,
    #[serde(default)]
    pub pets: Vec<i64>,
}

/// An aura the player already had when the fight started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartingAura {
    pub name:         String,
    #[serde(default)]
    pub ability:      Option<u64>,
    #[serde(default)]
    pub ability_icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearItem {
    pub id:        u64,
    #[serde(default)]
    pub item_icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatantInfo {
    #[serde(default)]
    pub auras: Vec<StartingAura>,
    #[serde(default)]
    pub gear:  Vec<GearItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fight {
    pub duration:     i64,
    #[serde(default)]
    pub start_time:   i64,
    #[serde(default)]
    pub end_time:     i64,
    pub encounter:    Encounter,
    #[serde(default)]
    pub is_hard_mode: bool,
    pub source:       Actor,
    #[serde(default)]
    pub combatant_info: CombatantInfo,
    pub events:       Vec<Event>,
}

impl Fight {
    pub fn is_pet(&self, actor_id: i64) -> bool {
        self.source.pets.contains(&actor_id)
    }

    fn involves_player_or_pet(&self, event: &Event) -> bool {
        event.source_id == self.source.id
            || event.target_id == self.source.id
            || self.is_pet(event.source_id)
            || self.is_pet(event.target_id)
    }

    /// Events the analysis cares about, in fight order.
    ///
    /// Drops everything that involves neither the player nor their pets,
    /// debuff stack noise, and buff events landing on other actors.
    pub fn relevant_events(&self) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| self.involves_player_or_pet(e))
            .filter(|e| e.kind != EventType::ApplyDebuffStack)
            .filter(|e| {
                !matches!(e.kind, EventType::RefreshBuff | EventType::ApplyBuff | EventType::RemoveBuff)
                    || e.target_id == self.source.id
                    || self.is_pet(e.target_id)
            })
            .cloned()
            .collect()
    }
}
