//! Gimli, the dwarf persona agent

use fellowship_agent::{launch, PersonaKind};

fn main() {
    launch(PersonaKind::Dwarf, None, 0, false);
}
