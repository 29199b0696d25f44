//! Cart CLI - inspect and edit a storefront cart with add-on prices filled in.
//!
//! Commands:
//! - `cart show` - Show the reconciled cart
//! - `cart add` - Add a product with add-on selections
//! - `cart update` - Change a line's quantity
//! - `cart remove` - Remove a line
//! - `cart coupon` - Apply or remove a coupon
//! - `cart shipping` - Select a shipping rate
//! - `cart ledger` - Inspect or clear the local add-on ledger
//! - `cart config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{
    AddArgs, ConfigArgs, CouponArgs, LedgerArgs, RemoveArgs, ShippingArgs, ShowArgs, UpdateArgs,
};

/// Cart CLI - price-complete carts over a session cart service
#[derive(Parser)]
#[command(name = "cart")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart with add-on prices
    Show(ShowArgs),

    /// Add a product to the cart
    Add(AddArgs),

    /// Change the quantity of a line
    Update(UpdateArgs),

    /// Remove a line from the cart
    Remove(RemoveArgs),

    /// Apply or remove coupons
    Coupon(CouponArgs),

    /// Select a shipping rate
    Shipping(ShippingArgs),

    /// Inspect or clear the local add-on ledger
    Ledger(LedgerArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    let result = match cli.command {
        Commands::Show(args) => commands::show::run(args, &ctx).await,
        Commands::Add(args) => commands::add::run(args, &ctx).await,
        Commands::Update(args) => commands::update::run(args, &ctx).await,
        Commands::Remove(args) => commands::update::remove(args, &ctx).await,
        Commands::Coupon(args) => commands::coupon::run(args, &ctx).await,
        Commands::Shipping(args) => commands::shipping::run(args, &ctx).await,
        Commands::Ledger(args) => commands::ledger::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
