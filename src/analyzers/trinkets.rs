/// On-use trinket usage against how often they could have been used.
use super::{report, Analyzer, AnalyzerKind, EventInput, Report};
use crate::{
    annotation::Annotation,
    error::Result,
    event::EventType,
    items::{Items, Trinket},
};
use serde_json::json;
use std::collections::HashMap;

/// Slack per cooldown cycle for reaction time.
const REUSE_SLACK_MS: i64 = 3_000;
const FIRST_USE_MS: i64 = 10_000;

pub struct TrinketAnalyzer<'a> {
    fight_duration: i64,
    items:          &'a Items,
    usages:         HashMap<&'static str, i64>,
}

impl<'a> TrinketAnalyzer<'a> {
    pub fn new(fight_duration: i64, items: &'a Items) -> Self {
        Self { fight_duration, items, usages: HashMap::new() }
    }

    fn used(&self, trinket: &Trinket) -> i64 {
        self.usages.get(trinket.buff_name).copied().unwrap_or(0)
    }

    fn possible(&self, trinket: &Trinket) -> i64 {
        let cycles = (self.fight_duration - FIRST_USE_MS).div_euclid(trinket.proc_cd_ms + REUSE_SLACK_MS);
        (1 + cycles).max(self.used(trinket))
    }

    pub fn num_on_use(&self) -> usize {
        self.items.on_use_trinkets().count()
    }
}

impl Analyzer for TrinketAnalyzer<'_> {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Trinkets
    }

    fn add_event(&mut self, input: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
        let event = input.event;
        if event.kind != EventType::ApplyBuff {
            return Ok(());
        }
        let equipped = self
            .items
            .trinkets()
            .iter()
            .find(|t| t.trinket.buff_name == event.ability);
        if let Some(equipped) = equipped {
            *self.usages.entry(equipped.trinket.buff_name).or_insert(0) += 1;
        }
        Ok(())
    }

    fn score(&self) -> Option<f64> {
        let on_use = self.num_on_use();
        if on_use == 0 {
            return Some(1.0);
        }
        let sum: f64 = self
            .items
            .on_use_trinkets()
            .map(|t| match self.possible(t.trinket) {
                0 => 1.0,
                possible => self.used(t.trinket) as f64 / possible as f64,
            })
            .sum();
        Some(sum / on_use as f64)
    }

    fn dynamic_weight(&self) -> Option<f64> {
        Some(self.num_on_use() as f64)
    }

    fn report(&self) -> Report {
        let usages: Vec<_> = self
            .items
            .on_use_trinkets()
            .map(|t| json!({
                "name":         t.trinket.name,
                "num_actual":   self.used(t.trinket),
                "num_possible": self.possible(t.trinket),
                "icon":         t.icon,
            }))
            .collect();
        report("trinket_usages", json!(usages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        annotation::Decoration,
        event::{CombatantInfo, Event, GearItem},
    };

    #[test]
    fn scores_on_use_trinkets_only() {
        let items = Items::from_gear(&CombatantInfo {
            auras: vec![],
            gear:  vec![
                GearItem { id: 45263, item_icon: None }, // Wrathstone, on use, 120s
                GearItem { id: 42987, item_icon: None }, // Greatness, proc
            ],
        });
        let mut a = TrinketAnalyzer::new(300_000, &items);
        let deco = Decoration::default();
        for (ts, ability) in [(1_000, "Wrathstone"), (2_000, "Greatness"), (130_000, "Wrathstone")] {
            let e = Event::new(ts, EventType::ApplyBuff, ability, 1, 1);
            a.add_event(&EventInput { event: &e, decoration: &deco }, &mut Annotation::default()).unwrap();
        }

        // 1 + (300000 - 10000) / 123000 = 3
        assert_eq!(a.dynamic_weight(), Some(1.0));
        assert!((a.score().unwrap() - 2.0 / 3.0).abs() < 1e-9);
        let report = a.report();
        assert_eq!(report["trinket_usages"][0]["num_possible"], 3);
        assert_eq!(report["trinket_usages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn no_on_use_trinkets_is_neutral() {
        let items = Items::default();
        let a = TrinketAnalyzer::new(300_000, &items);
        assert_eq!(a.score(), Some(1.0));
        assert_eq!(a.dynamic_weight(), Some(0.0));
    }
}
