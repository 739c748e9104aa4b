/// Per-event derived data, owned by the pipeline and keyed by event index.
///
/// Two stages:
///   * `Decoration` is produced once, after the preprocessing passes have
///     seen the whole fight (dead-zone membership, active buffs, pet names).
///     It is read-only during the analyzer fold.
///   * `Annotation` is written by analyzers during the fold. An analyzer
///     that runs later in the same tick sees what earlier ones wrote.
use crate::{buffs::ActiveBuff, event::Event, rune::RuneSnapshot, window::Window};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Decoration {
    pub in_dead_zone:     bool,
    /// Most recent dead zone that started at or before this event.
    pub recent_dead_zone: Option<Window>,
    /// Tracked buffs active at this instant, ordered by window start.
    pub buffs:            Vec<ActiveBuff>,
    /// Resolved name of the pet that produced this event, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_name:         Option<String>,
}

impl Decoration {
    /// Milliseconds since the most recent dead zone ended, if one has.
    pub fn since_dead_zone_end(&self, timestamp: i64) -> Option<i64> {
        self.recent_dead_zone
            .and_then(|w| w.end)
            .map(|end| timestamp - end)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Annotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runes_before:      Option<Vec<RuneSnapshot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runes:             Option<Vec<RuneSnapshot>>,
    pub rune_spend_error:  bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rune_grace_wasted: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcd_offset:        Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_gcd:           Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_core_cast:      Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bad_howling_blast: Option<bool>,
}

/// One output row: the original event with both stages merged in.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedEvent {
    #[serde(flatten)]
    pub event:      Event,
    #[serde(flatten)]
    pub decoration: Decoration,
    #[serde(flatten)]
    pub annotation: Annotation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    #[test]
    fn since_dead_zone_end() {
        let deco = Decoration {
            recent_dead_zone: Some(Window::closed(1_001, 4_000)),
            ..Decoration::default()
        };
        assert_eq!(deco.since_dead_zone_end(9_000), Some(5_000));
        assert_eq!(Decoration::default().since_dead_zone_end(9_000), None);
    }

    #[test]
    fn flattens_into_one_object() {
        let row = AnnotatedEvent {
            event:      Event::new(10, EventType::Cast, "Obliterate", 1, 2),
            decoration: Decoration { in_dead_zone: true, ..Decoration::default() },
            annotation: Annotation { has_gcd: Some(true), ..Annotation::default() },
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["ability"], "Obliterate");
        assert_eq!(json["in_dead_zone"], true);
        assert_eq!(json["has_gcd"], true);
        assert!(json.get("gcd_offset").is_none());
    }
}
