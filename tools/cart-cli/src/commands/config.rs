//! Configuration management commands.

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CONFIG_NAMES};
use crate::context::Context;

const DEFAULT_BASE_URL: &str = "https://shop.example.com/wp-json/wc/store/v1";

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { base_url, force } => init_config(base_url.as_deref(), force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }
    ctx.output.kv("currency", ctx.config.currency.code());

    ctx.output.info("[upstream]");
    ctx.output.kv("base_url", &ctx.config.upstream.base_url);
    if let Some(ref url) = ctx.config.upstream.catalog_url {
        ctx.output.kv("catalog_url", url);
    }
    ctx.output.kv("timeout_secs", &ctx.config.upstream.timeout_secs.to_string());
    for name in ctx.config.upstream.headers.keys() {
        ctx.output.kv("header", name);
    }

    ctx.output.info("[cache]");
    ctx.output.kv("short_ttl_secs", &ctx.config.cache.short_ttl_secs.to_string());
    ctx.output.kv("long_ttl_secs", &ctx.config.cache.long_ttl_secs.to_string());

    ctx.output.info("[storage]");
    ctx.output.kv("backend", &format!("{:?}", ctx.config.storage.backend).to_lowercase());
    ctx.output.kv("dir", &ctx.config.storage.dir.display().to_string());
    ctx.output.kv("key", &ctx.config.storage.key);

    Ok(())
}

fn init_config(base_url: Option<&str>, force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.resolve_path(CONFIG_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let content = generate_default_config(base_url.unwrap_or(DEFAULT_BASE_URL));
    std::fs::write(&config_path, content)?;
    crate::config::load(&config_path)?;

    ctx.output.success(&format!("Created: {}", config_path.display()));
    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    let Some(path) = &ctx.config_path else {
        bail!("No config file found (looked for {})", CONFIG_NAMES.join(", "));
    };

    ctx.config.validate()?;
    let mut warnings = Vec::new();
    if ctx.config.upstream.base_url.starts_with("http://")
        && !ctx.config.upstream.base_url.contains("localhost")
    {
        warnings.push("upstream.base_url is plain http; session cookies will travel unencrypted");
    }
    if ctx.config.cache.short_ttl_secs == 0 {
        warnings.push("cache.short_ttl_secs is 0; every view will refetch the cart");
    }

    for warning in &warnings {
        ctx.output.warn(warning);
    }
    ctx.output.success(&format!("{} is valid", path.display()));
    Ok(())
}
