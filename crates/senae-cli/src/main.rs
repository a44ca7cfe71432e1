use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use senae_core::{BatchResult, Category, LineItem, ProductType, TariffEngine, TariffInput};
use senae_web::{breakdown_rows, compliance_notes, BreakdownRow, WebConfig};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "senae")]
#[command(about = "SENAE import tariff calculator")]
struct Cli {
    /// YAML file overriding the built-in rate table (default: $SENAE_RATES_PATH).
    #[arg(long, global = true)]
    rates: Option<PathBuf>,
    /// Print machine-readable JSON instead of a table.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Calculate taxes for a single shipment.
    Calc {
        #[arg(long)]
        value: Decimal,
        #[arg(long)]
        weight: Decimal,
        #[arg(long)]
        category: Category,
        #[arg(long)]
        product_type: Option<ProductType>,
        #[arg(long)]
        import_count: Option<u32>,
    },
    /// Quote every line item of a JSON or YAML order file.
    Batch { path: PathBuf },
    /// Suggest a category for a shipment.
    Suggest {
        #[arg(long)]
        value: Decimal,
        #[arg(long)]
        weight: Decimal,
        #[arg(long)]
        product_type: Option<ProductType>,
        /// Free-text catalog category, used when --product-type is absent.
        #[arg(long)]
        label: Option<String>,
    },
    /// Show the active rate table.
    Rates,
    /// Run the web calculator (default).
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Wrapped { items: Vec<LineItem> },
    Bare(Vec<LineItem>),
}

impl BatchFile {
    fn into_items(self) -> Vec<LineItem> {
        match self {
            BatchFile::Wrapped { items } | BatchFile::Bare(items) => items,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = WebConfig::from_env();
    if let Some(path) = cli.rates.clone() {
        config.rates_path = Some(path);
    }
    let rates = config.load_rates()?;
    debug!(source = ?config.rates_path, "rate table loaded");
    let engine = TariffEngine::new(rates);

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Calc {
            value,
            weight,
            category,
            product_type,
            import_count,
        } => {
            let mut input = TariffInput::new(value, weight, category)
                .with_import_count(import_count.unwrap_or(1));
            if let Some(product_type) = product_type {
                input = input.with_product_type(product_type);
            } else if category == Category::D {
                anyhow::bail!("--product-type is required for category D");
            }
            let result = engine.calculate(&input)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Category {}", result.category());
                print_rows(&breakdown_rows(&result));
                for note in compliance_notes(&result) {
                    println!("  * {note}");
                }
            }
        }
        Commands::Batch { path } => {
            let items = read_batch_file(&path)?;
            let batch = engine.calculate_batch(&items)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&batch)?);
            } else {
                print_batch(&batch);
            }
        }
        Commands::Suggest {
            value,
            weight,
            product_type,
            label,
        } => {
            let product_type =
                product_type.or_else(|| label.as_deref().and_then(ProductType::from_label));
            let category = engine.suggest_category(value, weight, product_type);
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "category": category, "product_type": product_type })
                );
            } else {
                println!("{category}");
            }
        }
        Commands::Rates => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(engine.rates())?);
            } else {
                print!("{}", serde_yaml::to_string(engine.rates())?);
            }
        }
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            senae_web::serve(config).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("SENAE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_batch_file(path: &Path) -> Result<Vec<LineItem>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let file: BatchFile = if is_yaml {
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
    };
    Ok(file.into_items())
}

fn print_rows(rows: &[BreakdownRow]) {
    let width = rows.iter().map(|r| r.label.len()).max().unwrap_or(0);
    for row in rows {
        println!("  {:<width$}  {:>12}", row.label, row.amount);
    }
}

fn print_batch(batch: &BatchResult) {
    for item in &batch.items {
        let name = item
            .description
            .clone()
            .unwrap_or_else(|| format!("item {}", item.index + 1));
        println!("{name} x{} (category {})", item.quantity, item.tariff.category());
        print_rows(&breakdown_rows(&item.tariff));
    }
    let s = &batch.summary;
    println!("Order summary ({} items)", s.item_count);
    print_rows(&[
        summary_row("Total value", s.total_value),
        BreakdownRow {
            label: "Total weight (kg)".to_string(),
            amount: format!("{:.3}", s.total_weight.normalize()),
        },
        summary_row("Total duty", s.total_duty),
        summary_row("Total VAT", s.total_vat),
        summary_row("Total FODINFA", s.total_fodinfa),
        summary_row("Total taxes", s.total_taxes),
        summary_row("Total cost", s.total_cost),
    ]);
}

fn summary_row(label: &str, amount: Decimal) -> BreakdownRow {
    BreakdownRow {
        label: label.to_string(),
        amount: format!("${:.2}", senae_core::round_for_display(amount)),
    }
}
