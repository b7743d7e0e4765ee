//! Command-line front end for till-printer

mod logger;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use till_printer::{
    ConfigStore, DeviceRegistry, LabelData, PrintDispatcher, PrinterSettings, ReceiptData,
    TextOptions,
};

#[derive(Parser, Debug)]
#[command(name = "till-printer")]
#[command(about = "Receipt and label printing for the till", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Printer config document
    #[arg(long, global = true, env = "TILL_PRINTER_CONFIG")]
    config: Option<PathBuf>,

    /// Printer id; defaults to the saved default, else the first found
    #[arg(short, long, global = true)]
    printer: Option<String>,

    #[arg(long, global = true, env = "TILL_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Also write daily rotating JSON logs here
    #[arg(long, global = true, env = "TILL_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// JSON console logs
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every discovered printer as JSON
    #[command(alias = "ls")]
    List,

    /// Probe a subnet for raw TCP printers
    Scan {
        /// First three octets, e.g. 192.168.1; defaults to the local subnet
        #[arg(long)]
        subnet: Option<String>,
        #[arg(long)]
        start: Option<u8>,
        #[arg(long)]
        end: Option<u8>,
    },

    /// Check whether a network printer accepts connections
    Probe {
        host: String,
        #[arg(long)]
        port: Option<u16>,
    },

    /// Save a network printer
    AddNetwork {
        host: String,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long, default_value = "")]
        name: String,
    },

    /// Forget a network printer
    #[command(alias = "rm-network")]
    RemoveNetwork {
        host: String,
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show or set the default printer
    Default {
        id: Option<String>,
        /// Clear the saved default
        #[arg(long, conflicts_with = "id")]
        clear: bool,
    },

    /// Show or merge per-printer settings (`key=value`, JSON values accepted)
    Settings {
        id: String,
        pairs: Vec<String>,
    },

    /// Print the built-in sample receipt
    Test,

    /// Print plain text
    Text {
        text: String,
        #[arg(long)]
        center: bool,
        #[arg(long)]
        bold: bool,
        #[arg(long)]
        cut: bool,
    },

    /// Print a receipt from a JSON file (`-` for stdin)
    Receipt { file: PathBuf },

    /// Print one label or an array of labels from a JSON file (`-` for stdin)
    Label { file: PathBuf },

    /// Pulse the cash drawer
    Drawer,

    /// Report printer reachability
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logger::init_logger(&cli.log_level, cli.json_logs, cli.log_dir.as_deref())
        .context("Failed to initialize logging")?;

    let store = match &cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_location().context("Failed to locate printer config")?,
    };
    tracing::debug!(config = %store.path().display(), "using printer config");

    let registry = Arc::new(DeviceRegistry::new(store));
    let dispatcher = PrintDispatcher::new(registry.clone());
    let printer = cli.printer.as_deref();

    match cli.command {
        Commands::List => print_json(&registry.list_printers().await)?,
        Commands::Scan { subnet, start, end } => {
            let found = registry
                .scan_network_printers(subnet.as_deref(), start, end)
                .await
                .context("Scan failed")?;
            print_json(&found)?;
        }
        Commands::Probe { host, port } => {
            if !registry.check_network_printer(&host, port, None).await {
                bail!("{} is offline", host);
            }
            println!("online");
        }
        Commands::AddNetwork { host, port, name } => {
            print_json(&registry.add_network_printer(&host, port, &name)?)?;
        }
        Commands::RemoveNetwork { host, port } => {
            if !registry.remove_network_printer(&host, port)? {
                bail!("No network printer {} saved", host);
            }
        }
        Commands::Default { id, clear } => {
            if clear {
                registry.set_default_printer(None)?;
            } else if let Some(id) = id {
                registry.set_default_printer(Some(&id))?;
            } else if let Some(id) = registry.get_default_printer() {
                println!("{}", id);
            }
        }
        Commands::Settings { id, pairs } => {
            if pairs.is_empty() {
                print_json(&registry.get_printer_settings(&id))?;
            } else {
                let merged = registry.save_printer_settings(&id, parse_pairs(&pairs)?)?;
                print_json(&merged)?;
            }
        }
        Commands::Test => dispatcher.print_test_receipt(printer).await?,
        Commands::Text {
            text,
            center,
            bold,
            cut,
        } => {
            dispatcher
                .print_text(printer, &text, TextOptions { center, bold, cut })
                .await?
        }
        Commands::Receipt { file } => {
            let receipt: ReceiptData = serde_json::from_value(read_json(&file)?)
                .context("Invalid receipt payload")?;
            dispatcher.print_receipt(printer, &receipt).await?;
        }
        Commands::Label { file } => match read_json(&file)? {
            Value::Array(items) => {
                let labels: Vec<LabelData> = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<_, _>>()
                    .context("Invalid label payload")?;
                dispatcher.print_barcode_labels(printer, &labels).await?;
            }
            value => {
                let label: LabelData =
                    serde_json::from_value(value).context("Invalid label payload")?;
                dispatcher.print_barcode_label(printer, &label).await?;
            }
        },
        Commands::Drawer => dispatcher.open_cash_drawer(printer).await?,
        Commands::Status => print_json(&dispatcher.get_printer_status(printer).await?)?,
    }

    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).with_context(|| format!("{} is not JSON", path.display()))
}

/// `width=58 encoding=cp866 drawerPin=5`; values that parse as JSON keep
/// their type, anything else is a string
fn parse_pairs(pairs: &[String]) -> anyhow::Result<PrinterSettings> {
    let mut settings = PrinterSettings::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Expected key=value, got {:?}", pair);
        };
        let value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        settings.insert(key.trim().to_string(), value);
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pairs() {
        let pairs = vec![
            "width=58".to_string(),
            "encoding=cp866".to_string(),
            "cut=true".to_string(),
        ];
        let settings = parse_pairs(&pairs).unwrap();
        assert_eq!(settings["width"], json!(58));
        assert_eq!(settings["encoding"], json!("cp866"));
        assert_eq!(settings["cut"], json!(true));

        assert!(parse_pairs(&["width".to_string()]).is_err());
    }

    #[test]
    fn test_read_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.json");
        std::fs::write(&path, r#"{"productName": "Tea", "price": "2,50"}"#).unwrap();

        let label: LabelData = serde_json::from_value(read_json(&path).unwrap()).unwrap();
        assert_eq!(label.product_name, "Tea");
        assert_eq!(label.price, 2.5);
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "till-printer",
            "--printer",
            "network-10.0.0.5:9100",
            "text",
            "hello",
            "--cut",
        ])
        .unwrap();
        assert_eq!(cli.printer.as_deref(), Some("network-10.0.0.5:9100"));
        assert!(matches!(cli.command, Commands::Text { cut: true, .. }));
    }
}
