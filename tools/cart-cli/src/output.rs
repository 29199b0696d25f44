//! Output formatting for the CLI.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use turbo_commerce::{AddonSource, CartView};

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    /// Print an info message.
    pub fn info(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("ℹ").blue(), msg);
    }

    /// Print a success message.
    pub fn success(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("✓").green(), msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: &str) {
        if self.json {
            return;
        }
        eprintln!("{} {}", style("⚠").yellow(), msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
            return;
        }
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Print a debug message (only in verbose mode).
    pub fn debug(&self, msg: &str) {
        if !self.verbose || self.json {
            return;
        }
        eprintln!("{} {}", style("→").dim(), style(msg).dim());
    }

    /// Print a header/title.
    pub fn header(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print JSON output.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Print a key-value pair.
    pub fn kv(&self, key: &str, value: &str) {
        if self.json {
            return;
        }
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(&self, item: &str) {
        if self.json {
            return;
        }
        println!("  {} {}", style("•").dim(), item);
    }

    /// Print a table row.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        if self.json {
            return;
        }
        let formatted: Vec<String> = cols
            .iter()
            .zip(widths.iter())
            .map(|(col, width)| format!("{:width$}", col, width = width))
            .collect();
        println!("  {}", formatted.join("  "));
    }

    /// Create a spinner for a call to the cart service.
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        if self.json {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(spinner) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Print a cart: the JSON view in JSON mode, a table otherwise.
    pub fn cart(&self, view: &CartView) {
        if self.json {
            self.json(view);
            return;
        }

        self.header("Cart");
        if view.is_empty() {
            self.info("The cart is empty");
            return;
        }

        let widths = [18, 28, 4, 12, 8];
        self.table_row(&["KEY", "PRODUCT", "QTY", "TOTAL", "ADD-ONS"], &widths);
        for line in &view.items {
            let quantity = line.quantity.to_string();
            let total = line.line_total.to_string();
            let source = source_badge(line.addon_source);
            self.table_row(&[line.key.as_str(), &line.name, &quantity, &total, &source], &widths);
            for addon in &line.addons {
                println!(
                    "  {:18}  {} {} ({} each)",
                    "",
                    style("+").dim(),
                    addon.label,
                    addon.unit_price
                );
            }
        }

        println!();
        for coupon in &view.coupons {
            self.kv(&format!("coupon {}", coupon.code), &format!("-{}", coupon.discount));
        }
        self.kv("items", &view.grand_total.to_string());
        if view.discount_total.is_positive() {
            self.kv("discount", &format!("-{}", view.discount_total));
        }
        self.kv("shipping", &view.shipping_total.to_string());
        self.kv("tax", &view.tax_total.to_string());
        match view.amount_due() {
            Ok(due) => self.kv("amount due", &style(due).bold().to_string()),
            Err(e) => self.warn(&format!("Cannot total the cart: {}", e)),
        }

        if view.has_gaps() {
            self.warn(&format!(
                "{} line(s) have add-ons the cart service did not price and this ledger does not know; \
                 their totals exclude add-ons",
                view.gaps.len()
            ));
        }
    }
}

/// Short coloured label for where a line's add-on prices came from.
pub fn source_badge(source: AddonSource) -> String {
    match source {
        AddonSource::Server => style("server").cyan().to_string(),
        AddonSource::Ledger => style("ledger").green().to_string(),
        AddonSource::None => style("-").dim().to_string(),
        AddonSource::Missing => style("missing").red().to_string(),
    }
}
