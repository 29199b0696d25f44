//! CLI configuration files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use turbo_cart::CartConfig;

/// File names searched for, in order, in each directory up from the cwd.
pub const CONFIG_NAMES: [&str; 3] = ["cart.toml", ".cart.toml", "cart.json"];

/// Load and validate a config file.
pub fn load(path: &Path) -> Result<CartConfig> {
    CartConfig::load(path).with_context(|| format!("Failed to load config: {}", path.display()))
}

/// Find the nearest config file at or above `start`.
pub fn find(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in &CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Make a relative storage directory relative to the config file's
/// directory, so the ledger lives next to the config wherever the CLI runs.
pub fn anchor_storage(config: &mut CartConfig, config_path: &Path) {
    if config.storage.dir.is_relative() {
        if let Some(parent) = config_path.parent() {
            config.storage.dir = parent.join(&config.storage.dir);
        }
    }
}

/// Generate a commented default `cart.toml`.
pub fn generate_default_config(base_url: &str) -> String {
    format!(
        r#"# Cart CLI configuration

currency = "USD"

[upstream]
base_url = "{base_url}"
# catalog_url = "https://shop.example.com/wp-json/addons/v1"
timeout_secs = 10

[upstream.headers]
# Carry one session across invocations:
# Cart-Token = "..."

[cache]
short_ttl_secs = 5
long_ttl_secs = 300

[storage]
backend = "file"
dir = ".turbo-cart"
key = "turbo-cart:addon-ledger"
"#,
        base_url = base_url
    )
}
