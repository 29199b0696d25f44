//! CLI command implementations.

pub mod add;
pub mod config;
pub mod coupon;
pub mod ledger;
pub mod shipping;
pub mod show;
pub mod update;

use std::future::Future;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use turbo_cart::CartError;

use crate::context::Context;

/// Arguments for the show command.
#[derive(Args)]
pub struct ShowArgs {
    /// Show a single line by key.
    #[arg(short, long)]
    pub key: Option<String>,
}

/// Arguments for the add command.
#[derive(Args)]
pub struct AddArgs {
    /// Product id.
    pub product: u64,

    /// Quantity to add.
    #[arg(short, long, default_value = "1")]
    pub quantity: i64,

    /// Add-on value as FIELD=VALUE. Choice values are option indices
    /// (comma separated for multi-choice); dates are YYYY-MM-DD.
    #[arg(short, long = "addon", value_name = "FIELD=VALUE")]
    pub addons: Vec<String>,
}

/// Arguments for the update command.
#[derive(Args)]
pub struct UpdateArgs {
    /// Line key.
    pub key: String,

    /// New quantity; 0 removes the line.
    pub quantity: i64,
}

/// Arguments for the remove command.
#[derive(Args)]
pub struct RemoveArgs {
    /// Line key.
    pub key: String,
}

/// Arguments for the coupon command.
#[derive(Args)]
pub struct CouponArgs {
    #[command(subcommand)]
    pub command: CouponCommand,
}

#[derive(Subcommand)]
pub enum CouponCommand {
    /// Apply a coupon code.
    Apply {
        /// Coupon code.
        code: String,
    },
    /// Remove an applied coupon.
    Remove {
        /// Coupon code.
        code: String,
    },
}

/// Arguments for the shipping command.
#[derive(Args)]
pub struct ShippingArgs {
    /// Rate id, e.g. `flat_rate:1`.
    pub rate: String,

    /// Shipping package index.
    #[arg(short, long, default_value = "0")]
    pub package: u32,
}

/// Arguments for the ledger command.
#[derive(Args)]
pub struct LedgerArgs {
    /// Delete every entry, in memory and on disk.
    #[arg(long)]
    pub clear: bool,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Write a new cart.toml in the current directory.
    Init {
        /// Cart API base URL.
        #[arg(long)]
        base_url: Option<String>,

        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}

/// Await one cart service call behind a spinner.
pub(crate) async fn with_spinner<T, F>(ctx: &Context, msg: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T, CartError>>,
{
    let spinner = ctx.output.spinner(msg);
    let result = call.await;
    spinner.finish_and_clear();

    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_retryable() => {
            Err(e).context("The cart service or add-on catalog could not be reached")
        }
        Err(e) => Err(e.into()),
    }
}
