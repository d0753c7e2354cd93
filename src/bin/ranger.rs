//! Aragorn, the ranger persona agent

use fellowship_agent::{launch, PersonaKind};

fn main() {
    launch(PersonaKind::Ranger, None, 0, false);
}
