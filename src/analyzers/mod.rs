pub mod buff_uptime;
pub mod consumables;
pub mod core_abilities;
pub mod diseases;
pub mod frost;
pub mod gcd;
pub mod melee_uptime;
pub mod runic_power;
pub mod trinkets;
pub mod unholy;

use crate::{
    annotation::{Annotation, Decoration},
    buffs::BuffTracker,
    config::AnalysisConfig,
    error::Result,
    event::{Event, Fight},
    items::Items,
    rune::{RuneTracker, RuneTrackerSettings},
    window::Window,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shallow JSON object; every analyzer's report is merged into one.
pub type Report = serde_json::Map<String, Value>;

/// Identifies an analyzer for spec rosters and score weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    RuneTracker,
    BuffTracker,
    Gcd,
    RunicPower,
    CoreAbilities,
    Bombs,
    Hyperspeed,
    MeleeUptime,
    Diseases,
    Trinkets,
    T9Uptime,
    SigilUptime,
    KillingMachine,
    UnbreakableArmor,
    HowlingBlast,
    Rime,
    RaiseDead,
    BoneShieldUptime,
    DesolationUptime,
    GhoulFrenzyUptime,
    Gargoyle,
}

/// One event of the fold, with its read-only stage-1 decoration.
pub struct EventInput<'a> {
    pub event:      &'a Event,
    pub decoration: &'a Decoration,
}

/// A stateful fold over the fight, plus its score and report.
///
/// `add_event` may write to the event's annotation; analyzers later in the
/// roster see those writes for the same event.
pub trait Analyzer {
    fn kind(&self) -> AnalyzerKind;

    fn add_event(&mut self, input: &EventInput<'_>, notes: &mut Annotation) -> Result<()>;

    /// `None` if the analyzer does not take part in scoring.
    fn score(&self) -> Option<f64> {
        None
    }

    fn report(&self) -> Report {
        Report::new()
    }

    /// Whether events where only a pet is involved reach `add_event`.
    fn include_pet_events(&self) -> bool {
        false
    }

    /// Weight for profiles that mark this analyzer's weight as dynamic.
    fn dynamic_weight(&self) -> Option<f64> {
        None
    }

    /// One-line human summary, emitted through `tracing`.
    fn log_summary(&self) {}
}

/// Single-key report, the common case.
pub fn report(key: &str, value: Value) -> Report {
    let mut out = Report::new();
    out.insert(key.to_owned(), value);
    out
}

/// Everything an analyzer may need at construction. Borrowed for the
/// lifetime of the fold.
pub struct AnalyzerContext<'a> {
    pub fight:          &'a Fight,
    pub config:         &'a AnalysisConfig,
    pub buffs:          &'a BuffTracker,
    pub items:          &'a Items,
    pub dead_zones:     &'a [Window],
    /// Ignore set for melee uptime; may include pet-control windows.
    pub melee_ignores:  &'a [Window],
    pub rune_settings:  &'a RuneTrackerSettings,
    pub initial_death_state: (bool, bool),
}

pub fn build<'a>(kind: AnalyzerKind, ctx: &AnalyzerContext<'a>) -> Box<dyn Analyzer + 'a> {
    let duration = ctx.fight.duration;
    match kind {
        AnalyzerKind::RuneTracker => Box::new(
            RuneTracker::new(ctx.rune_settings.clone(), ctx.config)
                .with_initial_death_state(ctx.initial_death_state),
        ),
        AnalyzerKind::BuffTracker => Box::new(ctx.buffs),
        AnalyzerKind::Gcd => Box::new(gcd::GcdAnalyzer::new(ctx.fight.source.id, ctx.config)),
        AnalyzerKind::RunicPower => Box::new(runic_power::RunicPowerAnalyzer::default()),
        AnalyzerKind::CoreAbilities => Box::new(core_abilities::CoreAbilities),
        AnalyzerKind::Bombs => Box::new(consumables::BombAnalyzer::new(duration)),
        AnalyzerKind::Hyperspeed => Box::new(consumables::HyperspeedAnalyzer::new(duration)),
        AnalyzerKind::MeleeUptime => Box::new(melee_uptime::MeleeUptimeAnalyzer::new(
            duration,
            ctx.melee_ignores.to_vec(),
            ctx.config.melee_swing_gap_ms,
        )),
        AnalyzerKind::Diseases => {
            Box::new(diseases::DiseaseAnalyzer::new(&ctx.fight.encounter.name, duration))
        }
        AnalyzerKind::Trinkets => Box::new(trinkets::TrinketAnalyzer::new(duration, ctx.items)),
        AnalyzerKind::T9Uptime => {
            Box::new(buff_uptime::T9UptimeAnalyzer::new(duration, ctx.buffs, ctx.items, ctx.dead_zones))
        }
        AnalyzerKind::SigilUptime => {
            Box::new(buff_uptime::SigilUptimeAnalyzer::new(duration, ctx.buffs, ctx.items, ctx.dead_zones))
        }
        AnalyzerKind::KillingMachine => Box::new(frost::KillingMachineAnalyzer::default()),
        AnalyzerKind::UnbreakableArmor => Box::new(frost::UnbreakableArmorAnalyzer::new(duration)),
        AnalyzerKind::HowlingBlast => Box::new(frost::HowlingBlastAnalyzer::default()),
        AnalyzerKind::Rime => Box::new(frost::RimeAnalyzer::new(ctx.buffs)),
        AnalyzerKind::RaiseDead => Box::new(frost::RaiseDeadAnalyzer::new(duration)),
        AnalyzerKind::BoneShieldUptime => uptime(kind, "bone_shield_uptime", "Bone Shield", ctx),
        AnalyzerKind::DesolationUptime => uptime(kind, "desolation_uptime", "Desolation", ctx),
        AnalyzerKind::GhoulFrenzyUptime => uptime(kind, "ghoul_frenzy_uptime", "Ghoul Frenzy", ctx),
        AnalyzerKind::Gargoyle => {
            Box::new(unholy::GargoyleAnalyzer::new(duration, ctx.buffs, ctx.items))
        }
    }
}

fn uptime<'a>(
    kind: AnalyzerKind,
    key:  &'static str,
    buff: &str,
    ctx:  &AnalyzerContext<'a>,
) -> Box<dyn Analyzer + 'a> {
    let uptime = buff_uptime::BuffUptime::new(ctx.buffs, &[buff], ctx.fight.duration);
    Box::new(buff_uptime::BuffUptimeAnalyzer::new(kind, key, uptime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_use_snake_case_names() {
        let kind: AnalyzerKind = serde_json::from_str("\"ghoul_frenzy_uptime\"").unwrap();
        assert_eq!(kind, AnalyzerKind::GhoulFrenzyUptime);
        assert_eq!(serde_json::to_string(&AnalyzerKind::T9Uptime).unwrap(), "\"t9_uptime\"");
    }

    #[test]
    fn report_helper_wraps_one_key() {
        let r = report("melee_uptime", Value::from(0.5));
        assert_eq!(r.len(), 1);
        assert_eq!(r["melee_uptime"], 0.5);
    }
}
