/// Fight analysis pipeline.
///
/// One call analyzes one fight, start to finish:
///   1. filter the events down to the player and their pets
///   2. pick the spec profile
///   3. pass 1: dead zones, buff timelines, gear and pet names see every event
///   4. decorate each event from the finished pass-1 state
///   5. resolve the starting rune state
///   6. fold every event through the profile's analyzers
///   7. merge the reports and score
///
/// Nothing is shared between calls.
use crate::{
    analyzers::{self, unholy::gargoyle_windows, Analyzer, AnalyzerContext, EventInput, Report},
    annotation::{AnnotatedEvent, Annotation, Decoration},
    buffs::{BuffTracker, TRACKED_BUFFS},
    config::AnalysisConfig,
    dead_zone::DeadZoneAnalyzer,
    error::{AnalysisError, Result},
    event::{Event, EventType, Fight},
    items::Items,
    pets::PetNameDetector,
    rune::{RuneTracker, RuneTrackerSettings, INITIAL_DEATH_STATES},
    scorer::AnalysisScorer,
    specs::{self, SpecProfile, DEFAULT_PROFILE},
    window::{combine_windows, Window},
};
use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct FightMetadata {
    pub source:     String,
    pub encounter:  String,
    pub start_time: i64,
    pub end_time:   i64,
    pub duration:   i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub fight_metadata: FightMetadata,
    /// Every analyzer's report merged, plus `has_rune_spend_error` and
    /// `analysis_scores`.
    pub analysis:       Report,
    /// The events worth showing, with both annotation stages.
    pub events:         Vec<AnnotatedEvent>,
    /// Detected spec, `None` when no profile matched.
    pub spec:           Option<String>,
    pub show_procs:     bool,
    pub show_speed:     bool,
}

// ---------------------------------------------------------------------------
// Pass 1
// ---------------------------------------------------------------------------

/// Whole-fight state that has to be complete before any event is decorated.
struct Preprocessed {
    dead_zones: DeadZoneAnalyzer,
    buffs:      BuffTracker,
    items:      Items,
    pets:       PetNameDetector,
}

impl Preprocessed {
    fn run(fight: &Fight, events: &[Event], profile: &SpecProfile) -> Self {
        let mut pre = Self {
            dead_zones: DeadZoneAnalyzer::new(fight),
            buffs:      BuffTracker::new(
                TRACKED_BUFFS,
                fight.duration,
                &fight.combatant_info.auras,
                profile.score_potions,
            ),
            items:      Items::from_gear(&fight.combatant_info),
            pets:       PetNameDetector::default(),
        };
        for event in events {
            pre.dead_zones.preprocess_event(event);
            pre.buffs.preprocess_event(event);
            pre.items.preprocess_event(event);
            pre.pets.preprocess_event(event);
        }
        pre
    }

    fn decorate(&self, event: &Event) -> Decoration {
        let mut decoration = Decoration {
            buffs: self.buffs.get_active_buffs(event.timestamp),
            pet_name: self.pets.pet_name(event.source_id).map(str::to_owned),
            ..Decoration::default()
        };
        self.dead_zones.decorate(event.timestamp, &mut decoration);
        decoration
    }
}

// ---------------------------------------------------------------------------
// Spec and rune state
// ---------------------------------------------------------------------------

/// The forced profile when configured, otherwise the detected one.
fn resolve_profile(events: &[Event], config: &AnalysisConfig) -> Result<(Option<String>, SpecProfile)> {
    let name = match &config.profile_override {
        Some(name) => Some(name.clone()),
        None => specs::detect(events),
    };
    let profile = specs::load(name.as_deref().unwrap_or(DEFAULT_PROFILE))?;
    let spec = (!profile.is_default()).then(|| profile.name.clone());
    Ok((spec, profile))
}

/// First of `INITIAL_DEATH_STATES` under which the whole fight replays
/// without a rune spend error. A replay that trips a rune invariant counts
/// as not clean.
pub fn valid_initial_rune_state(
    events:      &[Event],
    decorations: &[Decoration],
    settings:    &RuneTrackerSettings,
    config:      &AnalysisConfig,
) -> Option<(bool, bool)> {
    INITIAL_DEATH_STATES.into_iter().find(|&state| {
        let mut runes = RuneTracker::new(settings.clone(), config).with_initial_death_state(state);
        events.iter().zip(decorations).all(|(event, decoration)| {
            let mut scratch = Annotation::default();
            let input = EventInput { event, decoration };
            match runes.add_event(&input, &mut scratch) {
                Ok(()) => !scratch.rune_spend_error,
                Err(e) => {
                    tracing::debug!(?state, "initial rune state rejected: {}", e);
                    false
                }
            }
        })
    })
}

// ---------------------------------------------------------------------------
// Output filtering
// ---------------------------------------------------------------------------

const DEAD_ZONE_MARKERS: &[&str] = &["Fungal Creep", "Web Spray", "Frost Blast", "Slag Pot", "Black Hole"];

/// Events the timeline shows: the player's own casts and the handful of
/// buff and debuff changes that explain them.
fn is_displayable(event: &Event, decoration: &Decoration, fight: &Fight) -> bool {
    if event.source_id != fight.source.id {
        return false;
    }
    let ability = event.ability.as_str();
    match event.kind {
        EventType::Cast => !matches!(ability, "Speed" | "Melee"),
        EventType::ApplyBuff => ability == "Killing Machine",
        EventType::RemoveBuff => matches!(ability, "Unbreakable Armor" | "Blood Tap"),
        EventType::RemoveDebuff if matches!(ability, "Blood Plague" | "Frost Fever") => {
            event.target_is_boss && (fight.encounter.name != "Thaddius" || !decoration.in_dead_zone)
        }
        EventType::ApplyDebuff | EventType::RemoveDebuff | EventType::RefreshDebuff => {
            DEAD_ZONE_MARKERS.contains(&ability)
        }
        _ => false,
    }
}

fn merge_report(into: &mut Report, from: Report) -> Result<()> {
    for (key, value) in from {
        if into.contains_key(&key) {
            return Err(AnalysisError::ReportKeyCollision(key));
        }
        into.insert(key, value);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn analyze_fight(fight: &Fight, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let events = fight.relevant_events();
    let (spec, profile) = resolve_profile(&events, config)?;
    tracing::info!(
        "Analyzing {} on {} as {} ({} events)",
        fight.source.name,
        fight.encounter.name,
        profile.name,
        events.len(),
    );

    let pre = Preprocessed::run(fight, &events, &profile);
    tracing::debug!(
        dead_zones = pre.dead_zones.dead_zones().len(),
        trinkets = pre.items.trinkets().len(),
        "preprocessing done"
    );

    let decorations: Vec<Decoration> = events.iter().map(|e| pre.decorate(e)).collect();

    let initial = valid_initial_rune_state(&events, &decorations, &profile.runes, config);
    let has_rune_spend_error = initial.is_none();
    let initial_death_state = initial.unwrap_or_else(|| {
        tracing::warn!("No initial rune state replays cleanly; rune analysis is unreliable");
        (false, false)
    });
    tracing::debug!(?initial_death_state, "initial rune state resolved");

    let melee_ignores: Vec<Window> = if profile.melee_ignores_pet_windows {
        combine_windows(&[pre.dead_zones.dead_zones(), &gargoyle_windows(&events)])
    } else {
        pre.dead_zones.dead_zones().to_vec()
    };

    let ctx = AnalyzerContext {
        fight,
        config,
        buffs: &pre.buffs,
        items: &pre.items,
        dead_zones: pre.dead_zones.dead_zones(),
        melee_ignores: &melee_ignores,
        rune_settings: &profile.runes,
        initial_death_state,
    };
    let mut roster: Vec<_> = profile.analyzers.iter().map(|&kind| analyzers::build(kind, &ctx)).collect();

    let player = fight.source.id;
    let mut annotations = vec![Annotation::default(); events.len()];
    for ((event, decoration), notes) in events.iter().zip(&decorations).zip(annotations.iter_mut()) {
        let involves_player = event.source_id == player || event.target_id == player;
        let involves_pet = event.is_owner_pet_source || event.is_owner_pet_target;
        let input = EventInput { event, decoration };
        for analyzer in roster.iter_mut() {
            if involves_player || (involves_pet && analyzer.include_pet_events()) {
                analyzer.add_event(&input, notes)?;
            }
        }
    }
    tracing::debug!("analyzer fold done");

    let mut analysis = Report::new();
    analysis.insert("has_rune_spend_error".into(), Value::Bool(has_rune_spend_error));
    for analyzer in &roster {
        analyzer.log_summary();
        merge_report(&mut analysis, analyzer.report())?;
    }
    let scorer = AnalysisScorer::new(&roster, &profile.weights);
    merge_report(&mut analysis, scorer.report())?;
    tracing::info!("Total score {:.3}", scorer.total_score());

    let events: Vec<AnnotatedEvent> = events
        .into_iter()
        .zip(decorations)
        .zip(annotations)
        .filter(|((event, decoration), _)| is_displayable(event, decoration, fight))
        .map(|((event, decoration), annotation)| AnnotatedEvent { event, decoration, annotation })
        .collect();

    Ok(AnalysisResult {
        fight_metadata: FightMetadata {
            source:     fight.source.name.clone(),
            encounter:  fight.encounter.name.clone(),
            start_time: fight.start_time,
            end_time:   fight.end_time,
            duration:   fight.end_time - fight.start_time,
        },
        analysis,
        events,
        spec,
        show_procs: profile.show_procs,
        show_speed: profile.show_speed,
    })
}
