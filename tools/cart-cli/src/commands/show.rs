//! Show the reconciled cart.

use anyhow::{bail, Result};
use turbo_commerce::LineItemKey;

use super::{with_spinner, ShowArgs};
use crate::context::Context;
use crate::output::source_badge;

/// Run the show command.
pub async fn run(args: ShowArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let view = with_spinner(ctx, "Fetching cart...", engine.view()).await;
    engine.dispose();
    let view = view?;

    let Some(key) = args.key else {
        ctx.output.cart(&view);
        return Ok(());
    };

    let key = LineItemKey::new(key);
    let Some(line) = view.get_item(&key) else {
        bail!("No line with key {} in the cart", key);
    };

    if ctx.output.is_json() {
        ctx.output.json(line);
        return Ok(());
    }

    ctx.output.header(&line.name);
    ctx.output.kv("key", line.key.as_str());
    ctx.output.kv("product", &line.product_id.to_string());
    ctx.output.kv("quantity", &line.quantity.to_string());
    ctx.output.kv("unit price", &line.base_unit_price.to_string());
    ctx.output.kv("add-ons from", &source_badge(line.addon_source));
    for addon in &line.addons {
        ctx.output.list_item(&format!("{} ({} each)", addon.label, addon.unit_price));
    }
    ctx.output.kv("line total", &line.line_total.to_string());

    Ok(())
}
