//! Add a product with add-on selections.

use anyhow::{anyhow, bail, Result};
use turbo_cart::AddonCatalog;
use turbo_commerce::{AddonConfig, AddonConfigValue, AddonFieldId, ProductAddons, ProductId};

use super::{with_spinner, AddArgs};
use crate::context::Context;

/// Run the add command.
pub async fn run(args: AddArgs, ctx: &Context) -> Result<()> {
    let product_id = ProductId(args.product);
    let engine = ctx.engine()?;

    let result = async {
        let product = with_spinner(
            ctx,
            "Loading add-ons...",
            engine.catalog().product_addons(product_id),
        )
        .await?;
        let config = parse_addons(&product, &args.addons)?;
        with_spinner(ctx, "Adding to cart...", engine.add_item(product_id, args.quantity, config)).await
    }
    .await;
    engine.dispose();
    let view = result?;

    ctx.output.success(&format!("Added {} x product {}", args.quantity, product_id));
    ctx.output.cart(&view);
    Ok(())
}

/// Turn `FIELD=VALUE` arguments into an add-on config, typed by the
/// product's add-on definitions.
fn parse_addons(product: &ProductAddons, raw: &[String]) -> Result<AddonConfig> {
    let mut config = AddonConfig::new();
    for pair in raw {
        let (field, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected FIELD=VALUE, got {:?}", pair))?;
        let field = AddonFieldId::new(field.trim());
        let Some(definition) = product.addons.iter().find(|a| a.field_id == field) else {
            let known: Vec<&str> = product.addons.iter().map(|a| a.field_id.as_str()).collect();
            bail!(
                "Product {} has no add-on {:?} (available: {})",
                product.product_id,
                field.as_str(),
                if known.is_empty() { "none".to_string() } else { known.join(", ") }
            );
        };
        let value = AddonConfigValue::parse(&field, definition.kind, value)?;
        if config.insert(field.clone(), value).is_some() {
            bail!("Add-on {:?} given more than once", field.as_str());
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbo_commerce::{AddonDefinition, AddonKind, AddonOption, Currency, Money};

    fn product() -> ProductAddons {
        ProductAddons {
            product_id: ProductId(12),
            base_unit_price: Money::new(10000, Currency::USD),
            addons: vec![
                AddonDefinition::new("wrap", "Gift wrap", AddonKind::SingleChoice)
                    .with_option(AddonOption::new("None", None))
                    .with_option(AddonOption::new("Premium", None)),
                AddonDefinition::new("extras", "Extras", AddonKind::MultiChoice),
                AddonDefinition::new("engraving", "Engraving", AddonKind::Text),
            ],
        }
    }

    #[test]
    fn test_parse_addons() {
        let raw = vec![
            "wrap=1".to_string(),
            "extras=0,2".to_string(),
            "engraving=For Sam = always".to_string(),
        ];
        let config = parse_addons(&product(), &raw).unwrap();

        assert_eq!(config[&AddonFieldId::new("wrap")], AddonConfigValue::Choice(1));
        assert_eq!(config[&AddonFieldId::new("extras")], AddonConfigValue::Choices(vec![0, 2]));
        assert_eq!(
            config[&AddonFieldId::new("engraving")],
            AddonConfigValue::Text("For Sam = always".into())
        );
    }

    #[test]
    fn test_parse_addons_rejects_bad_input() {
        assert!(parse_addons(&product(), &["wrap".to_string()]).is_err());
        assert!(parse_addons(&product(), &["color=red".to_string()]).is_err());
        assert!(parse_addons(&product(), &["wrap=premium".to_string()]).is_err());
        assert!(parse_addons(&product(), &["wrap=1".to_string(), "wrap=0".to_string()]).is_err());
    }

    #[test]
    fn test_no_addons_is_empty_config() {
        assert!(parse_addons(&product(), &[]).unwrap().is_empty());
    }
}
