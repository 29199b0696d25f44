//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use turbo_cart::{CartConfig, CartSyncEngine};

use crate::config;
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Effective configuration.
    pub config: CartConfig,
    /// The file the configuration came from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from an explicit config file, or the nearest one found
    /// above the working directory. Without either, defaults apply.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let path = match config_path {
            Some(path) => Some(resolve(&cwd, path)),
            None => config::find(&cwd),
        };

        let config = match &path {
            Some(path) => {
                output.debug(&format!("Using config {}", path.display()));
                let mut config = config::load(path)?;
                config::anchor_storage(&mut config, path);
                config
            }
            None => {
                output.debug("No config file found; using defaults");
                CartConfig::default()
            }
        };

        Ok(Self {
            config,
            config_path: path,
            output,
            cwd,
        })
    }

    /// Build an engine wired to the configured cart service, catalog and
    /// ledger storage.
    pub fn engine(&self) -> Result<CartSyncEngine> {
        tracing::debug!(
            base_url = %self.config.upstream.base_url,
            storage = %self.config.storage.dir.display(),
            "building cart engine"
        );
        let engine = CartSyncEngine::from_config(&self.config)
            .context("Failed to set up the cart engine")?;
        engine.ensure_initialized();
        if !engine.ledger().is_persistent() {
            self.output
                .warn("Ledger storage is unavailable; add-on prices will not be remembered");
        }
        Ok(engine)
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        resolve(&self.cwd, path)
    }
}

fn resolve(cwd: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}
