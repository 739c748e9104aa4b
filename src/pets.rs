/// Resolves which of the player's pets an actor id belongs to, from the
/// abilities it uses. The log only names them generically.
use crate::event::Event;
use std::collections::HashMap;

pub const GARGOYLE: &str = "Ebon Gargoyle";
pub const ARMY: &str = "Army of the Dead";
pub const GHOUL: &str = "Ghoul";

#[derive(Debug, Default)]
pub struct PetNameDetector {
    names: HashMap<i64, &'static str>,
}

impl PetNameDetector {
    pub fn preprocess_event(&mut self, event: &Event) {
        if [ARMY, GHOUL, GARGOYLE].contains(&event.source.as_str()) {
            return;
        }

        match event.ability.as_str() {
            "Gargoyle Strike" => {
                self.names.insert(event.source_id, GARGOYLE);
            }
            // Army ghouls are instanced, the permanent ghoul is not.
            "Claw" => {
                let name = if event.source_instance.unwrap_or(0) > 0 { ARMY } else { GHOUL };
                self.names.insert(event.source_id, name);
            }
            _ => {}
        }
    }

    pub fn pet_name(&self, source_id: i64) -> Option<&'static str> {
        self.names.get(&source_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    #[test]
    fn names_pets_by_ability() {
        let mut d = PetNameDetector::default();
        d.preprocess_event(&Event::new(0, EventType::Cast, "Gargoyle Strike", 50, 9));
        d.preprocess_event(&Event::new(0, EventType::Damage, "Claw", 51, 9));
        let mut army = Event::new(0, EventType::Damage, "Claw", 52, 9);
        army.source_instance = Some(3);
        d.preprocess_event(&army);

        assert_eq!(d.pet_name(50), Some(GARGOYLE));
        assert_eq!(d.pet_name(51), Some(GHOUL));
        assert_eq!(d.pet_name(52), Some(ARMY));
        assert_eq!(d.pet_name(1), None);
    }

    #[test]
    fn skips_already_named_sources() {
        let mut d = PetNameDetector::default();
        let mut e = Event::new(0, EventType::Damage, "Claw", 60, 9);
        e.source = GARGOYLE.into();
        d.preprocess_event(&e);
        assert_eq!(d.pet_name(60), None);
    }
}
