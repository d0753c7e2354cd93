//! Common test utilities and fixtures
//!
//! This module provides shared test infrastructure

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use assert_cmd::Command;
use tempfile::TempDir;

use fellowship_agent::agent::{AgentSpec, AssistantAgent};
use fellowship_agent::config::AgentConfig;
use fellowship_agent::dapr::InMemorySidecar;
use fellowship_agent::llm::MockChatClient;
use fellowship_agent::persona::{PersonaKind, PersonaRegistry};

/// Environment variables that would leak host configuration into a test run
const HOST_VARS: &[&str] = &[
    "APP_PORT",
    "DAPR_HTTP_ENDPOINT",
    "DAPR_HTTP_PORT",
    "DAPR_API_TOKEN",
    "HUGGINGFACE_API_KEY",
    "HF_TOKEN",
    "FELLOWSHIP_CONFIG",
    "FELLOWSHIP_PERSONA",
    "FELLOWSHIP_LOG_LEVEL",
    "FELLOWSHIP_LOG_FILE",
    "FELLOWSHIP_SIDECAR_WAIT_SECS",
];

/// A binary of this crate, run from an empty directory with a clean environment
pub fn bin_cmd(name: &str, workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin(name).unwrap();
    cmd.current_dir(workdir.path());
    for var in HOST_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Temporary directory holding a single config file
pub struct ConfigFixture {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
}

impl ConfigFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("agent.toml");
        Self { temp_dir, config_path }
    }

    pub fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    pub fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }
}

/// An agent on an in-memory sidecar
pub fn test_agent(kind: PersonaKind, llm: MockChatClient) -> (AssistantAgent, Arc<InMemorySidecar>, Arc<MockChatClient>) {
    let sidecar = Arc::new(InMemorySidecar::new());
    let llm = Arc::new(llm);
    let persona = PersonaRegistry::new().load(kind).unwrap();
    let mut config = AgentConfig::default();
    config.agent.app_port = 0;
    let agent = AssistantAgent::new(AgentSpec::new(persona), llm.clone(), sidecar.clone(), &config);
    (agent, sidecar, llm)
}
