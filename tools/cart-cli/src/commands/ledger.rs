//! Local add-on ledger commands.

use anyhow::{bail, Result};
use dialoguer::Confirm;

use super::LedgerArgs;
use crate::context::Context;

/// Run the ledger command.
pub async fn run(args: LedgerArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let ledger = engine.ledger().clone();

    if args.clear {
        if !args.yes && !ctx.output.is_json() {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Forget add-on prices for {} line(s)? Lines still in the cart will show as missing",
                    ledger.len()
                ))
                .default(false)
                .interact()?;
            if !confirmed {
                engine.dispose();
                bail!("Aborted");
            }
        }
        ledger.clear();
        engine.dispose();
        ctx.output.success("Ledger cleared");
        return Ok(());
    }

    let entries = ledger.entries();
    engine.dispose();

    if ctx.output.is_json() {
        ctx.output.json(&entries);
        return Ok(());
    }

    ctx.output.header("Add-on ledger");
    ctx.output.kv("storage", &ctx.config.storage.dir.display().to_string());
    ctx.output.kv("key", &ctx.config.storage.key);
    if !ledger.is_persistent() {
        ctx.output.warn("Storage is unavailable; showing memory only");
    }
    if entries.is_empty() {
        ctx.output.info("No entries");
        return Ok(());
    }

    for (key, addons) in &entries {
        println!();
        ctx.output.info(key.as_str());
        for addon in addons {
            let quantity = addon.quantity.map(|q| format!(" x{}", q)).unwrap_or_default();
            ctx.output.list_item(&format!("{} ({} each{})", addon.label, addon.unit_price, quantity));
        }
    }

    Ok(())
}
