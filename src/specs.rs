/// Spec profile library, embedded at compile time from `data/specs/*.toml`.
///
/// A profile decides which analyzers run, how the rune tracker behaves,
/// and how the scorer weighs each analyzer. Profiles are tried in the
/// order of `ALL_SPEC_DATA` during detection; `Default` never matches and
/// is the fallback.
use crate::{
    analyzers::AnalyzerKind,
    error::AnalysisError,
    event::{Event, EventType},
    rune::RuneTrackerSettings,
    scorer::ScoreWeight,
};
use once_cell::sync::Lazy;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Embedded TOML data
// ---------------------------------------------------------------------------

const DEFAULT: &str = include_str!("../data/specs/default.toml");
const FROST:   &str = include_str!("../data/specs/frost.toml");
const UNHOLY:  &str = include_str!("../data/specs/unholy.toml");

static ALL_SPEC_DATA: &[&str] = &[FROST, UNHOLY, DEFAULT];

pub const DEFAULT_PROFILE: &str = "Default";

// ---------------------------------------------------------------------------
// TOML deserialization structs (private)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TomlFile {
    spec: TomlSpecMeta,
}

#[derive(Deserialize)]
struct TomlSpecMeta {
    name:          String,
    #[serde(default)]
    description:   String,
    #[serde(default)]
    show_procs:    bool,
    #[serde(default)]
    show_speed:    bool,
    #[serde(default)]
    score_potions: bool,
    #[serde(default)]
    detection:     Detection,
    #[serde(default)]
    runes:         RuneTrackerSettings,
    roster:        TomlRoster,
    #[serde(default)]
    weights:       Vec<ScoreWeight>,
}

#[derive(Deserialize)]
struct TomlRoster {
    analyzers: Vec<AnalyzerKind>,
    #[serde(default)]
    melee_ignores_pet_windows: bool,
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Casts that identify a spec. A decisive cast anywhere in the fight wins
/// over any fallback cast.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Detection {
    #[serde(default)]
    pub decisive: Vec<String>,
    #[serde(default)]
    pub fallback: Vec<String>,
}

impl Detection {
    fn decisive(&self) -> &[String] {
        &self.decisive
    }

    fn fallback(&self) -> &[String] {
        &self.fallback
    }
}

#[derive(Debug, Clone)]
pub struct SpecProfile {
    pub name:          String,
    pub description:   String,
    pub show_procs:    bool,
    pub show_speed:    bool,
    /// Potions count toward the consumables score.
    pub score_potions: bool,
    pub detection:     Detection,
    pub runes:         RuneTrackerSettings,
    /// Analyzers to build, in fold order.
    pub analyzers:     Vec<AnalyzerKind>,
    /// Melee uptime also ignores time the Gargoyle is out.
    pub melee_ignores_pet_windows: bool,
    pub weights:       Vec<ScoreWeight>,
}

impl SpecProfile {
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_PROFILE
    }
}

/// Lightweight descriptor for listing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SpecInfo {
    pub name:        String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse(toml_str: &str) -> anyhow::Result<SpecProfile> {
    let file: TomlFile = toml::from_str(toml_str)?;
    let spec = file.spec;
    Ok(SpecProfile {
        name:          spec.name,
        description:   spec.description,
        show_procs:    spec.show_procs,
        show_speed:    spec.show_speed,
        score_potions: spec.score_potions,
        detection:     spec.detection,
        runes:         spec.runes,
        analyzers:     spec.roster.analyzers,
        melee_ignores_pet_windows: spec.roster.melee_ignores_pet_windows,
        weights:       spec.weights,
    })
}

static PROFILES: Lazy<Vec<SpecProfile>> = Lazy::new(|| {
    ALL_SPEC_DATA
        .iter()
        .filter_map(|toml_str| {
            parse(toml_str)
                .map_err(|e| tracing::warn!("Failed to parse spec TOML: {}", e))
                .ok()
        })
        .collect()
});

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn list_all() -> Vec<SpecInfo> {
    PROFILES
        .iter()
        .map(|p| SpecInfo { name: p.name.clone(), description: p.description.clone() })
        .collect()
}

/// Load a profile by name (case-insensitive).
pub fn load(name: &str) -> Result<SpecProfile, AnalysisError> {
    PROFILES
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .cloned()
        .ok_or_else(|| AnalysisError::UnknownSpecProfile(name.to_owned()))
}

/// Name of the profile whose signature casts appear first in `events`.
/// `None` if nothing matches; callers fall back to `DEFAULT_PROFILE`.
pub fn detect(events: &[Event]) -> Option<String> {
    let first_match = |pick: fn(&Detection) -> &[String]| {
        events
            .iter()
            .filter(|e| e.kind == EventType::Cast)
            .find_map(|e| {
                PROFILES
                    .iter()
                    .find(|p| pick(&p.detection).iter().any(|a| *a == e.ability))
            })
            .map(|p| p.name.clone())
    };

    first_match(Detection::decisive).or_else(|| first_match(Detection::fallback))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::Weight;

    fn casts(abilities: &[&str]) -> Vec<Event> {
        abilities
            .iter()
            .enumerate()
            .map(|(i, a)| Event::new(i as i64 * 1_000, EventType::Cast, a, 1, 2))
            .collect()
    }

    #[test]
    fn lists_three_profiles() {
        let names: Vec<String> = list_all().into_iter().map(|s| s.name).collect();
        assert_eq!(names.len(), 3);
        for expected in ["Default", "Frost", "Unholy"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[test]
    fn frost_profile_contents() {
        let p = load("frost").unwrap();
        assert!(p.show_procs && p.show_speed && p.score_potions);
        assert!(p.runes.convert_blood);
        assert_eq!(p.runes.converting_abilities, vec!["Blood Strike", "Pestilence"]);
        assert!(p.analyzers.contains(&AnalyzerKind::UnbreakableArmor));

        let melee = p.weights.iter().find(|w| w.analyzer == AnalyzerKind::MeleeUptime).unwrap();
        assert_eq!(melee.weight, Weight::Fixed(4.0));
        assert_eq!(melee.exponent, 1.5);
        let ua = p.weights.iter().find(|w| w.analyzer == AnalyzerKind::UnbreakableArmor).unwrap();
        assert_eq!(ua.weight, Weight::Dynamic);
    }

    #[test]
    fn unholy_ignores_gargoyle_time() {
        let p = load("Unholy").unwrap();
        assert!(p.melee_ignores_pet_windows);
        assert!(p.analyzers.contains(&AnalyzerKind::Gargoyle));
        assert!(!load(DEFAULT_PROFILE).unwrap().melee_ignores_pet_windows);
    }

    #[test]
    fn default_roster_is_the_core_set() {
        let p = load(DEFAULT_PROFILE).unwrap();
        assert!(p.is_default());
        assert_eq!(p.analyzers.len(), 11);
        assert_eq!(p.analyzers[0], AnalyzerKind::RuneTracker);
        assert!(p.detection.decisive.is_empty());
    }

    #[test]
    fn unknown_profile_is_an_error() {
        assert!(matches!(load("Blood"), Err(AnalysisError::UnknownSpecProfile(name)) if name == "Blood"));
    }

    #[test]
    fn decisive_casts_beat_fallbacks() {
        assert_eq!(detect(&casts(&["Obliterate", "Summon Gargoyle"])).as_deref(), Some("Unholy"));
        assert_eq!(detect(&casts(&["Death and Decay", "Frost Strike"])).as_deref(), Some("Frost"));
        assert_eq!(detect(&casts(&["Howling Blast", "Ghoul Frenzy"])).as_deref(), Some("Frost"));
    }

    #[test]
    fn fallback_and_no_match() {
        assert_eq!(detect(&casts(&["Icy Touch", "Death and Decay"])).as_deref(), Some("Unholy"));
        assert_eq!(detect(&casts(&["Obliterate"])).as_deref(), Some("Frost"));
        assert_eq!(detect(&casts(&["Icy Touch", "Plague Strike"])), None);

        let aura = Event::new(0, EventType::ApplyBuff, "Howling Blast", 1, 1);
        assert_eq!(detect(&[aura]), None);
    }
}
