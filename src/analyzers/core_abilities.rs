/// Tags casts of rotation abilities so the UI can highlight them.
use super::{Analyzer, AnalyzerKind, EventInput};
use crate::{annotation::Annotation, error::Result, event::EventType};

const CORE_ABILITIES: &[&str] = &[
    "Icy Touch",
    "Plague Strike",
    "Unbreakable Armor",
    "Obliterate",
    "Pestilence",
    "Howling Blast",
    "Blood Strike",
    "Blood Boil",
    "Death and Decay",
    "Ghoul Frenzy",
];

pub struct CoreAbilities;

impl Analyzer for CoreAbilities {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::CoreAbilities
    }

    fn add_event(&mut self, input: &EventInput<'_>, notes: &mut Annotation) -> Result<()> {
        if input.event.kind == EventType::Cast {
            notes.is_core_cast = Some(CORE_ABILITIES.contains(&input.event.ability.as_str()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{annotation::Decoration, event::Event};

    #[test]
    fn tags_casts_only() {
        let deco = Decoration::default();
        let mut notes = Annotation::default();
        let cast = Event::new(0, EventType::Cast, "Obliterate", 1, 2);
        CoreAbilities.add_event(&EventInput { event: &cast, decoration: &deco }, &mut notes).unwrap();
        assert_eq!(notes.is_core_cast, Some(true));

        let mut notes = Annotation::default();
        let hit = Event::new(0, EventType::Damage, "Obliterate", 1, 2);
        CoreAbilities.add_event(&EventInput { event: &hit, decoration: &deco }, &mut notes).unwrap();
        assert_eq!(notes.is_core_cast, None);
    }
}
