//! Quantity changes and removals.

use anyhow::Result;
use turbo_commerce::LineItemKey;

use super::{with_spinner, RemoveArgs, UpdateArgs};
use crate::context::Context;

/// Run the update command.
pub async fn run(args: UpdateArgs, ctx: &Context) -> Result<()> {
    let key = LineItemKey::new(args.key);
    let engine = ctx.engine()?;
    let view = with_spinner(ctx, "Updating cart...", engine.update_item(&key, args.quantity)).await;
    engine.dispose();
    let view = view?;

    if args.quantity == 0 {
        ctx.output.success(&format!("Removed {}", key));
    } else {
        ctx.output.success(&format!("Set {} to quantity {}", key, args.quantity));
    }
    ctx.output.cart(&view);
    Ok(())
}

/// Run the remove command.
pub async fn remove(args: RemoveArgs, ctx: &Context) -> Result<()> {
    let key = LineItemKey::new(args.key);
    let engine = ctx.engine()?;
    let view = with_spinner(ctx, "Removing line...", engine.remove_item(&key)).await;
    engine.dispose();
    let view = view?;

    ctx.output.success(&format!("Removed {}", key));
    ctx.output.cart(&view);
    Ok(())
}
