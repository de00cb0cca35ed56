//! Built-in services
//!
//! | Label | Provider | Source |
//! |-------|----------|--------|
//! | `"Program Arguments"` | [`ProgramArguments`] | seeded by the host with [`ProgramArguments::provide`] |
//! | `"Config Reader"` | [`ConfigReader`] | link-time entry in [`SERVICES`] |

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use svcg_domain::{BoxError, Error, Result, Token};
use svcg_infrastructure::config::{ConfigLoader, RuntimeConfig};
use svcg_infrastructure::di::{
    Container, Declarations, InitContext, Inject, SERVICES, Service, ServiceEntry,
};
use tracing::debug;

/// Command line the process was started with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramArguments {
    /// Raw arguments, program name excluded
    pub args: Vec<String>,
    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
    /// Raise the log level to debug
    pub verbose: bool,
}

impl ProgramArguments {
    /// Token label
    pub const LABEL: &'static str = "Program Arguments";

    /// Register these arguments as an already complete service
    pub fn provide(self, container: &Container) -> Result<Token<Self>> {
        let token = container.create_token::<Self>(Self::LABEL)?;
        container.provide_value(&token, Arc::new(self))?;
        Ok(token)
    }
}

/// Loads the runtime configuration once program arguments are known
#[derive(Debug)]
pub struct ConfigReader {
    arguments: Inject<ProgramArguments>,
    config: OnceLock<RuntimeConfig>,
}

impl ConfigReader {
    /// Loaded configuration
    pub fn config(&self) -> Result<&RuntimeConfig> {
        self.config
            .get()
            .ok_or_else(|| Error::configuration("Configuration has not been loaded yet"))
    }
}

#[async_trait]
impl Service for ConfigReader {
    const LABEL: &'static str = "Config Reader";
    type Args = ();

    fn construct() -> Self {
        Self {
            arguments: Inject::new(),
            config: OnceLock::new(),
        }
    }

    fn declare(deps: &mut Declarations<'_, Self>) {
        deps.require(ProgramArguments::LABEL, "arguments", |s| &s.arguments);
    }

    async fn init(self: Arc<Self>, _cx: InitContext, _args: ()) -> std::result::Result<(), BoxError> {
        let arguments = self
            .arguments
            .get()
            .ok_or_else(|| Error::internal("program arguments were not injected"))?;

        let mut loader = ConfigLoader::new();
        if let Some(path) = &arguments.config_path {
            loader = loader.with_config_path(path);
        }
        let mut config = loader.load()?;
        if arguments.verbose {
            config.logging.level = "debug".to_string();
        }

        debug!(level = %config.logging.level, "runtime configuration loaded");
        let _ = self.config.set(config);
        Ok(())
    }
}

#[linkme::distributed_slice(SERVICES)]
static CONFIG_READER: ServiceEntry = ServiceEntry {
    label: ConfigReader::LABEL,
    description: "Loads the runtime configuration from file and environment",
    register: |container| container.register::<ConfigReader>().map(drop),
};
