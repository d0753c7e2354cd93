//! Process bootstrap for a persona agent
//!
//! Builds one LLM client bound to [`MODEL_ID`], builds one assistant agent
//! for the persona, and awaits its start. Any failure on the way is written
//! to the output as `Error starting service: <error>` and swallowed; the
//! process still exits 0.

use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info, Level};

use crate::agent::{AgentSpec, AssistantAgent};
use crate::config::AgentConfig;
use crate::dapr::DaprClient;
use crate::error::{Error, Result};
use crate::llm::{ChatClient, HfHubChatClient, MODEL_ID};
use crate::persona::{PersonaConfig, PersonaKind, PersonaRegistry};
use crate::{dotenv, logging, version};

// ─────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapState {
    NotStarted,
    Running,
    FailedSilently,
}

impl std::fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapState::NotStarted => write!(f, "not started"),
            BootstrapState::Running => write!(f, "running"),
            BootstrapState::FailedSilently => write!(f, "failed"),
        }
    }
}

/// Handed to the agent so it can report when it is serving.
///
/// Only `NotStarted` moves; once running or failed the state is final.
#[derive(Debug, Clone)]
pub struct ReadyNotifier {
    state: Arc<RwLock<BootstrapState>>,
}

impl ReadyNotifier {
    fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(BootstrapState::NotStarted)),
        }
    }

    pub fn notify_ready(&self) {
        self.transition(BootstrapState::Running);
    }

    pub fn state(&self) -> BootstrapState {
        *self.state.read()
    }

    fn transition(&self, to: BootstrapState) -> bool {
        let mut state = self.state.write();
        if *state == BootstrapState::NotStarted {
            *state = to;
            true
        } else {
            false
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Launcher seams
// ─────────────────────────────────────────────────────────────────

/// An agent that can be started
#[async_trait]
pub trait RunnableAgent: Send + Sync {
    fn name(&self) -> &str;

    /// Serve until shut down. Calls `ready.notify_ready()` once serving.
    async fn start(&self, ready: ReadyNotifier) -> Result<()>;
}

/// Builds the LLM client and the agent
pub trait AgentLauncher {
    fn build_llm(&self, model: &str) -> Result<Arc<dyn ChatClient>>;

    fn build_agent(&self, spec: AgentSpec, llm: Arc<dyn ChatClient>) -> Result<Box<dyn RunnableAgent>>;
}

/// Production launcher: Hugging Face chat client and an agent on the Dapr sidecar
pub struct DaprLauncher {
    config: AgentConfig,
}

impl DaprLauncher {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }
}

impl AgentLauncher for DaprLauncher {
    fn build_llm(&self, model: &str) -> Result<Arc<dyn ChatClient>> {
        Ok(Arc::new(HfHubChatClient::new(model, self.config.llm.clone())?))
    }

    fn build_agent(&self, spec: AgentSpec, llm: Arc<dyn ChatClient>) -> Result<Box<dyn RunnableAgent>> {
        let sidecar = Arc::new(DaprClient::new(&self.config.dapr)?);
        Ok(Box::new(AssistantAgent::new(spec, llm, sidecar, &self.config)))
    }
}

#[async_trait]
impl RunnableAgent for AssistantAgent {
    fn name(&self) -> &str {
        AssistantAgent::name(self)
    }

    async fn start(&self, ready: ReadyNotifier) -> Result<()> {
        AssistantAgent::start(self, move |addr| {
            debug!(%addr, "Callback server bound");
            ready.notify_ready();
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────
// Bootstrap
// ─────────────────────────────────────────────────────────────────

pub struct Bootstrap<L> {
    launcher: L,
    ready: ReadyNotifier,
}

impl<L: AgentLauncher> Bootstrap<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            ready: ReadyNotifier::new(),
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.ready.state()
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Build and start the agent. Failures are written to `out`, never returned.
    pub async fn run<W: Write>(&self, persona: PersonaConfig, out: &mut W) -> BootstrapState {
        if let Err(e) = self.start(persona).await {
            self.ready.transition(BootstrapState::FailedSilently);
            report_failure(out, &e);
        }
        self.state()
    }

    async fn start(&self, persona: PersonaConfig) -> Result<()> {
        let llm = self.launcher.build_llm(MODEL_ID)?;
        let agent = self.launcher.build_agent(AgentSpec::new(persona), llm)?;
        info!(agent = %agent.name(), model = MODEL_ID, "Starting agent");
        agent.start(self.ready.clone()).await
    }
}

/// Write the startup failure line
pub fn report_failure<W: Write>(out: &mut W, err: &Error) {
    error!("{}", err.format_for_log());
    let _ = writeln!(out, "Error starting service: {}", err.chain_message());
    let _ = out.flush();
}

/// Entry point of the persona binaries.
///
/// Loads `.env`, configuration and logging, then runs the bootstrap on a
/// current-thread runtime with stdout as the failure sink. Always returns;
/// callers exit 0.
pub fn launch(kind: PersonaKind, config_path: Option<&str>, verbose: u8, quiet: bool) -> BootstrapState {
    let from_dotenv = dotenv::load_dotenv();
    let mut stdout = io::stdout();

    let config = match AgentConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            let _ = logging::init_simple(Level::INFO);
            report_failure(&mut stdout, &e);
            return BootstrapState::FailedSilently;
        }
    };

    let _guards = match logging::init_logging(&config.logging, verbose, quiet) {
        Ok(guards) => guards,
        Err(e) => {
            report_failure(&mut stdout, &e);
            return BootstrapState::FailedSilently;
        }
    };
    debug!(variables = from_dotenv, "Loaded .env");

    let build = version::build_info();
    info!(
        version = %build.full_version(),
        persona = %kind,
        target = %build.target,
        "Starting fellowship agent"
    );

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            report_failure(&mut stdout, &Error::Io(e));
            return BootstrapState::FailedSilently;
        }
    };

    runtime.block_on(async {
        match PersonaRegistry::new().load(kind) {
            Ok(persona) => {
                let bootstrap = Bootstrap::new(DaprLauncher::new(config));
                bootstrap.run(persona, &mut stdout).await
            }
            Err(e) => {
                report_failure(&mut stdout, &e);
                BootstrapState::FailedSilently
            }
        }
    })
}
