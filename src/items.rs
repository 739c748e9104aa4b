/// Gear-derived facts: equipped trinkets, tier-9 set bonus, sigil.
///
/// Built from the combatant's gear list, then refined by the preprocessing
/// pass (a T9 proc or sigil buff proves the item even if gear info was
/// incomplete).
use crate::event::{CombatantInfo, Event, EventType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrinketKind {
    /// Attack power proc; snapshotted by the Gargoyle at summon.
    AttackPower,
    /// Haste proc; only counts while up.
    Haste,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trinket {
    pub name:           &'static str,
    pub item_id:        u64,
    pub buff_name:      &'static str,
    pub proc_duration_ms: i64,
    pub proc_cd_ms:     i64,
    pub on_use:         bool,
    pub kind:           TrinketKind,
}

impl Trinket {
    pub fn snapshots_gargoyle(&self) -> bool {
        self.kind == TrinketKind::AttackPower
    }
}

const fn trinket(
    name:      &'static str,
    item_id:   u64,
    buff_name: &'static str,
    proc_s:    i64,
    cd_s:      i64,
    on_use:    bool,
    kind:      TrinketKind,
) -> Trinket {
    Trinket {
        name,
        item_id,
        buff_name,
        proc_duration_ms: proc_s * 1_000,
        proc_cd_ms: cd_s * 1_000,
        on_use,
        kind,
    }
}

use TrinketKind::{AttackPower, Haste};

pub const TRINKETS: &[Trinket] = &[
    trinket("Darkmoon Card: Greatness", 42987, "Greatness", 15, 45, false, AttackPower),
    trinket("Wrathstone", 45263, "Wrathstone", 20, 120, true, AttackPower),
    trinket("Blood of the Old God", 45522, "Blood of the Old God", 10, 50, false, AttackPower),
    trinket("Pyrite Infuser", 45286, "Pyrite Infusion", 10, 50, false, AttackPower),
    trinket("Mirror of Truth", 40684, "Reflection of Torment", 10, 50, false, AttackPower),
    trinket("Death's Choice", 47464, "Paragon", 15, 45, false, AttackPower),
    trinket("Death's Choice", 47303, "Paragon", 15, 45, false, AttackPower),
    trinket("Death's Verdict", 47131, "Paragon", 15, 45, false, AttackPower),
    trinket("Death's Verdict", 47115, "Paragon", 15, 45, false, AttackPower),
    trinket("Mark of Norgannon", 40531, "Mark of Norgannon", 20, 120, true, Haste),
    trinket("Comet's Trail", 45609, "Comet's Trail", 10, 45, false, Haste),
    trinket("Meteorite Whetstone", 37390, "Meteorite Whetstone", 10, 45, false, Haste),
];

/// Tier-9 pieces, both factions (head, shoulders, chest, legs, hands).
const T9_ITEM_IDS: &[u64] = &[
    48472, 48483, 48488, 48478, 48485, 48486, 48474, 48481, 48490, 48476, 48484, 48487,
    48480, 48482, 48489,
    48503, 48493, 48498, 48505, 48495, 48501, 48491, 48500, 48504, 48494, 48497, 48502,
    48492, 48499,
];

pub const T9_PROC: &str = "Unholy Might";
pub const T9_MAX_UPTIME: f64 = 0.28;

#[derive(Debug, Clone, PartialEq)]
pub struct Sigil {
    pub name:       &'static str,
    pub item_id:    u64,
    pub buff_name:  &'static str,
    pub max_uptime: f64,
}

pub const SIGILS: &[Sigil] = &[Sigil {
    name:       "Sigil of Virulence",
    item_id:    47673,
    buff_name:  "Unholy Force",
    max_uptime: 0.70,
}];

#[derive(Debug, Clone)]
pub struct EquippedTrinket {
    pub trinket: &'static Trinket,
    pub icon:    Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Items {
    trinkets:  Vec<EquippedTrinket>,
    t9_pieces: usize,
    has_t9_2p: bool,
    sigil:     Option<&'static Sigil>,
}

impl Items {
    pub fn from_gear(info: &CombatantInfo) -> Self {
        let trinkets: Vec<EquippedTrinket> = info
            .gear
            .iter()
            .filter_map(|item| {
                TRINKETS.iter().find(|t| t.item_id == item.id).map(|trinket| EquippedTrinket {
                    trinket,
                    icon: item.item_icon.clone(),
                })
            })
            .collect();
        let t9_pieces = info.gear.iter().filter(|item| T9_ITEM_IDS.contains(&item.id)).count();
        let sigil = info
            .gear
            .iter()
            .find_map(|item| SIGILS.iter().find(|s| s.item_id == item.id));

        Self { trinkets, t9_pieces, has_t9_2p: t9_pieces >= 2, sigil }
    }

    pub fn preprocess_event(&mut self, event: &Event) {
        if event.kind != EventType::ApplyBuff {
            return;
        }
        if event.ability == T9_PROC {
            self.has_t9_2p = true;
        }
        if self.sigil.is_none() {
            self.sigil = SIGILS.iter().find(|s| s.buff_name == event.ability);
        }
    }

    pub fn trinkets(&self) -> &[EquippedTrinket] {
        &self.trinkets
    }

    pub fn on_use_trinkets(&self) -> impl Iterator<Item = &EquippedTrinket> {
        self.trinkets.iter().filter(|t| t.trinket.on_use)
    }

    pub fn has_trinket(&self, buff_name: &str) -> bool {
        self.trinkets.iter().any(|t| t.trinket.buff_name == buff_name)
    }

    pub fn t9_pieces(&self) -> usize {
        self.t9_pieces
    }

    pub fn has_t9_2p(&self) -> bool {
        self.has_t9_2p
    }

    pub fn sigil(&self) -> Option<&'static Sigil> {
        self.sigil
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::GearItem;

    fn gear(ids: &[u64]) -> CombatantInfo {
        CombatantInfo {
            auras: vec![],
            gear:  ids.iter().map(|&id| GearItem { id, item_icon: Some(format!("{id}.jpg")) }).collect(),
        }
    }

    #[test]
    fn detects_trinkets_and_on_use() {
        let items = Items::from_gear(&gear(&[45263, 42987, 12345]));
        assert_eq!(items.trinkets().len(), 2);
        assert_eq!(items.on_use_trinkets().count(), 1);
        assert!(items.has_trinket("Greatness"));
        assert!(!items.has_trinket("Comet's Trail"));
        assert_eq!(items.trinkets()[0].icon.as_deref(), Some("45263.jpg"));
    }

    #[test]
    fn t9_from_gear_or_proc() {
        assert!(Items::from_gear(&gear(&[48472, 48503])).has_t9_2p());

        let mut items = Items::from_gear(&gear(&[48472]));
        assert!(!items.has_t9_2p());
        items.preprocess_event(&Event::new(1_000, EventType::ApplyBuff, T9_PROC, 1, 1));
        assert!(items.has_t9_2p());
    }

    #[test]
    fn sigil_from_gear_or_buff() {
        assert_eq!(Items::from_gear(&gear(&[47673])).sigil().map(|s| s.name), Some("Sigil of Virulence"));

        let mut items = Items::from_gear(&gear(&[]));
        assert!(items.sigil().is_none());
        items.preprocess_event(&Event::new(0, EventType::ApplyBuff, "Unholy Force", 1, 1));
        assert_eq!(items.sigil().map(|s| s.max_uptime), Some(0.70));
    }
}
