//! Core types for the persona system.
//!
//! A persona is the identity an assistant agent speaks with: a name, a role,
//! a goal and an ordered list of behavioural instructions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Persona Kind
// ─────────────────────────────────────────────────────────────────

/// The bundled personas, one per bootstrap process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersonaKind {
    /// Gimli: close combat, caves and stonework.
    Dwarf,
    /// Aragorn: leadership, tracking and strategy.
    Ranger,
}

impl PersonaKind {
    /// Slug used in file names and CLI args.
    pub fn slug(&self) -> &'static str {
        match self {
            PersonaKind::Dwarf => "dwarf",
            PersonaKind::Ranger => "ranger",
        }
    }

    pub fn all() -> &'static [PersonaKind] {
        &[PersonaKind::Dwarf, PersonaKind::Ranger]
    }
}

impl fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PersonaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dwarf" | "gimli" => Ok(PersonaKind::Dwarf),
            "ranger" | "aragorn" => Ok(PersonaKind::Ranger),
            _ => Err(format!("Unknown persona '{}'. Valid: dwarf, ranger", s)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Config (loaded from TOML)
// ─────────────────────────────────────────────────────────────────

/// Identity of an assistant agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Agent name; also the agent's pub/sub topic.
    pub name: String,

    pub role: String,

    pub goal: String,

    /// Behavioural instructions, in authored order.
    pub instructions: Vec<String>,
}

impl PersonaConfig {
    /// Check that every field is present and non-empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.role.trim().is_empty() {
            return Err("role must not be empty".to_string());
        }
        if self.goal.trim().is_empty() {
            return Err("goal must not be empty".to_string());
        }
        if self.instructions.is_empty() {
            return Err("at least one instruction is required".to_string());
        }
        if let Some(idx) = self.instructions.iter().position(|i| i.trim().is_empty()) {
            return Err(format!("instruction {} is empty", idx + 1));
        }
        Ok(())
    }

    /// Render the system message the agent sends ahead of every conversation.
    pub fn system_prompt(&self, date: &str) -> String {
        let mut prompt = format!(
            "# Today's date is: {date}\n\n\
             ## Name\nYour name is {name}.\n\n\
             ## Role\nYour role is {role}.\n\n\
             ## Goal\n{goal}\n\n\
             ## Instructions\n",
            date = date,
            name = self.name,
            role = self.role,
            goal = self.goal,
        );
        for instruction in &self.instructions {
            prompt.push_str("- ");
            prompt.push_str(instruction);
            prompt.push('\n');
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PersonaConfig {
        PersonaConfig {
            name: "Legolas".to_string(),
            role: "Elf".to_string(),
            goal: "Keep watch.".to_string(),
            instructions: vec!["First.".to_string(), "Second.".to_string()],
        }
    }

    #[test]
    fn test_persona_kind_round_trip() {
        for kind in PersonaKind::all() {
            assert_eq!(kind.slug().parse::<PersonaKind>().unwrap(), *kind);
        }
        assert_eq!("Gimli".parse::<PersonaKind>().unwrap(), PersonaKind::Dwarf);
        assert!("hobbit".parse::<PersonaKind>().is_err());
    }

    #[test]
    fn test_serde_slug() {
        let json = serde_json::to_string(&PersonaKind::Ranger).unwrap();
        assert_eq!(json, "\"ranger\"");
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut blank_goal = sample();
        blank_goal.goal = "  ".to_string();
        assert!(blank_goal.validate().is_err());

        let mut empty_instruction = sample();
        empty_instruction.instructions.push(String::new());
        assert_eq!(empty_instruction.validate().unwrap_err(), "instruction 3 is empty");
    }

    #[test]
    fn test_system_prompt_keeps_instruction_order() {
        let prompt = sample().system_prompt("2025-01-01");
        assert!(prompt.starts_with("# Today's date is: 2025-01-01"));
        assert!(prompt.contains("Your name is Legolas."));
        assert!(prompt.contains("Your role is Elf."));

        let first = prompt.find("- First.").unwrap();
        let second = prompt.find("- Second.").unwrap();
        assert!(first < second);
    }
}
