//! Shipping rate selection.

use anyhow::Result;

use super::{with_spinner, ShippingArgs};
use crate::context::Context;

/// Run the shipping command.
pub async fn run(args: ShippingArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let view = with_spinner(
        ctx,
        "Selecting shipping rate...",
        engine.select_shipping_rate(args.package, &args.rate),
    )
    .await;
    engine.dispose();
    let view = view?;

    ctx.output.success(&format!("Selected {} for package {}", args.rate, args.package));
    ctx.output.cart(&view);
    Ok(())
}
