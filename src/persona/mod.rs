//! Persona system: the identities the assistant agents speak with.
//!
//! Each bootstrap process runs exactly one persona. Personas are bundled as
//! TOML under `config/personas/` and compiled into the binaries.

pub mod registry;
pub mod types;

pub use registry::{PersonaListing, PersonaRegistry};
pub use types::{PersonaConfig, PersonaKind};
