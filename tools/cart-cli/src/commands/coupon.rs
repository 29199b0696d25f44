//! Coupon commands.

use anyhow::Result;
use turbo_commerce::CouponCode;

use super::{with_spinner, CouponArgs, CouponCommand};
use crate::context::Context;

/// Run the coupon command.
pub async fn run(args: CouponArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let (view, done) = match args.command {
        CouponCommand::Apply { code } => {
            let code = CouponCode::new(code);
            let view = with_spinner(ctx, "Applying coupon...", engine.apply_coupon(&code)).await;
            (view, format!("Applied {}", code))
        }
        CouponCommand::Remove { code } => {
            let code = CouponCode::new(code);
            let view = with_spinner(ctx, "Removing coupon...", engine.remove_coupon(&code)).await;
            (view, format!("Removed {}", code))
        }
    };
    engine.dispose();
    let view = view?;

    ctx.output.success(&done);
    ctx.output.cart(&view);
    Ok(())
}
