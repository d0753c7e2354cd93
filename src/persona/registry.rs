//! Bundled persona registry: the persona TOML files compiled into the binary.

use crate::error::{Error, Result};

use super::types::{PersonaConfig, PersonaKind};

/// Registry of the personas shipped with the crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PersonaRegistry;

impl PersonaRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Raw bundled TOML for a persona.
    pub fn get_bundled_config(&self, kind: PersonaKind) -> &'static str {
        match kind {
            PersonaKind::Dwarf => include_str!("../../config/personas/dwarf.toml"),
            PersonaKind::Ranger => include_str!("../../config/personas/ranger.toml"),
        }
    }

    /// Parse and validate a bundled persona.
    pub fn load(&self, kind: PersonaKind) -> Result<PersonaConfig> {
        let cfg: PersonaConfig =
            toml::from_str(self.get_bundled_config(kind)).map_err(|e| Error::PersonaInvalid {
                name: kind.slug().to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        cfg.validate().map_err(|reason| Error::PersonaInvalid {
            name: kind.slug().to_string(),
            reason,
        })?;

        Ok(cfg)
    }

    /// Look a persona up by slug or agent name.
    pub fn load_by_name(&self, name: &str) -> Result<PersonaConfig> {
        let kind: PersonaKind = name.parse().map_err(|_| Error::PersonaNotFound {
            name: name.to_string(),
        })?;
        self.load(kind)
    }

    /// List all bundled personas.
    pub fn list_available(&self) -> Vec<PersonaListing> {
        PersonaKind::all()
            .iter()
            .map(|kind| PersonaListing {
                kind: *kind,
                persona: self.load(*kind),
            })
            .collect()
    }
}

/// Summary of a bundled persona.
#[derive(Debug)]
pub struct PersonaListing {
    pub kind: PersonaKind,
    pub persona: Result<PersonaConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_bundled_personas_load() {
        let registry = PersonaRegistry::new();
        for kind in PersonaKind::all() {
            let cfg = registry.load(*kind).unwrap();
            assert_eq!(cfg.instructions.len(), 5);
        }
    }

    #[test]
    fn test_dwarf_literals() {
        let dwarf = PersonaRegistry::new().load(PersonaKind::Dwarf).unwrap();
        assert_eq!(dwarf.name, "Gimli");
        assert_eq!(dwarf.role, "Dwarf");
        assert_eq!(
            dwarf.goal,
            "Fight fiercely in battle, protect allies, and expertly navigate underground realms and stonework."
        );
        assert_eq!(
            dwarf.instructions,
            vec![
                "Speak like Gimli, with boldness and a warrior's pride.",
                "Be strong-willed, fiercely loyal, and protective of companions.",
                "Excel in close combat and battlefield tactics, favoring axes and brute strength.",
                "Navigate caves, tunnels, and ancient stonework with expert knowledge.",
                "Respond concisely, accurately, and relevantly, ensuring clarity and strict alignment with the task.",
            ]
        );
    }

    #[test]
    fn test_ranger_literals() {
        let ranger = PersonaRegistry::new().load(PersonaKind::Ranger).unwrap();
        assert_eq!(ranger.name, "Aragorn");
        assert_eq!(ranger.role, "Ranger");
        assert_eq!(
            ranger.goal,
            "Lead and protect the Fellowship, ensuring Frodo reaches his destination while uniting the Free Peoples against Sauron."
        );
        assert_eq!(
            ranger.instructions,
            vec![
                "Speak like Aragorn, with calm authority, wisdom, and unwavering leadership.",
                "Lead by example, inspiring courage and loyalty in allies.",
                "Navigate wilderness with expert tracking and survival skills.",
                "Master both swordplay and battlefield strategy, excelling in one-on-one combat and large-scale warfare.",
                "Respond concisely, accurately, and relevantly, ensuring clarity and strict alignment with the task.",
            ]
        );
    }

    #[test]
    fn test_load_by_name() {
        let registry = PersonaRegistry::new();
        assert_eq!(registry.load_by_name("aragorn").unwrap().name, "Aragorn");
        assert!(matches!(
            registry.load_by_name("wizard"),
            Err(Error::PersonaNotFound { .. })
        ));
    }

    #[test]
    fn test_list_available() {
        let list = PersonaRegistry::new().list_available();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|l| l.persona.is_ok()));
    }
}
