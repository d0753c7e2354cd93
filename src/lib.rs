//! Fellowship agents
//!
//! Persona-driven assistant agents (Gimli the dwarf, Aragorn the ranger)
//! that talk to a hosted language model and collaborate over Dapr pub/sub.
//! Each persona binary builds one LLM client and one agent and serves until
//! interrupted; see [`bootstrap::launch`].

pub mod agent;
pub mod bootstrap;
pub mod config;
pub mod dapr;
pub mod dotenv;
pub mod error;
pub mod llm;
pub mod logging;
pub mod persona;
pub mod version;

pub use bootstrap::{launch, Bootstrap, BootstrapState};
pub use error::{Error, Result};
pub use persona::PersonaKind;
