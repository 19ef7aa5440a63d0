//! # wms-cli
//!
//! Command-line runner for the allocation services, operating on a JSON
//! snapshot of SKUs, orders and allocations.
//!
//! ## Commands
//!
//! - `wms process` - allocate every released order
//! - `wms allocate <order>` - allocate one order
//! - `wms cancel <order> [--line <id>]` - cancel an order or one line item
//! - `wms correct <sku> <total>` - correct a SKU's total quantity
//! - `wms show` - print SKUs and orders
//!
//! ## Configuration
//!
//! Flags override the environment:
//!
//! - `WMS_SNAPSHOT` - snapshot file
//! - `WMS_LOG_FORMAT` - `json` (default) or `pretty`
//! - `WMS_AUDIT_ACTOR` - actor recorded in audit entries (default `system`)

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wms_infra::{LogFormat, RunnerConfig};

/// Warehouse stock allocation runner.
#[derive(Debug, Parser)]
#[command(name = "wms")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Snapshot file to operate on (overrides WMS_SNAPSHOT).
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Log output format: json or pretty (overrides WMS_LOG_FORMAT).
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Actor recorded in audit entries (overrides WMS_AUDIT_ACTOR).
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Save the updated snapshot back to the file.
    #[arg(long, global = true)]
    pub write: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Layer command-line flags over `base` (usually read from the environment).
    #[must_use]
    pub fn config(&self, base: RunnerConfig) -> RunnerConfig {
        RunnerConfig {
            snapshot_path: self.snapshot.clone().or(base.snapshot_path),
            log_format: self.log_format.unwrap_or(base.log_format),
            audit_actor: self.actor.clone().unwrap_or(base.audit_actor),
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Allocate every order in Received or NotAllocated status.
    Process,
    /// Allocate a single order.
    Allocate {
        /// Order id.
        order: String,
    },
    /// Cancel an order, or one of its line items with --line.
    Cancel {
        /// Order id.
        order: String,
        /// Line item id.
        #[arg(long)]
        line: Option<String>,
    },
    /// Correct a SKU's total quantity after a recount.
    Correct {
        /// SKU id.
        sku: String,
        /// New total quantity.
        #[arg(allow_negative_numbers = true)]
        total: i64,
    },
    /// Print SKUs and orders.
    Show,
}

impl Commands {
    /// Whether the command changes the stores.
    pub fn mutates(&self) -> bool {
        !matches!(self, Commands::Show)
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let cli = Cli::parse_from([
            "wms",
            "--snapshot",
            "/tmp/state.json",
            "--log-format",
            "pretty",
            "--actor",
            "ops",
            "--format",
            "json",
            "process",
        ]);
        let base = RunnerConfig {
            snapshot_path: Some(PathBuf::from("/env/state.json")),
            log_format: LogFormat::Json,
            audit_actor: "env-actor".to_string(),
        };

        let config = cli.config(base);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/state.json")));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.audit_actor, "ops");
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.command, Commands::Process);
    }

    #[test]
    fn environment_fills_missing_flags() {
        let cli = Cli::parse_from(["wms", "show"]);
        let base = RunnerConfig {
            snapshot_path: Some(PathBuf::from("/env/state.json")),
            ..RunnerConfig::default()
        };
        let config = cli.config(base);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/env/state.json")));
        assert_eq!(config.audit_actor, "system");
        assert!(!cli.command.mutates());
    }

    #[test]
    fn parses_operation_arguments() {
        let cli = Cli::parse_from(["wms", "cancel", "ORD001", "--line", "LINE002", "--write"]);
        assert!(cli.write);
        assert_eq!(
            cli.command,
            Commands::Cancel {
                order: "ORD001".to_string(),
                line: Some("LINE002".to_string()),
            }
        );

        let cli = Cli::parse_from(["wms", "correct", "SKU001", "-5"]);
        assert_eq!(
            cli.command,
            Commands::Correct {
                sku: "SKU001".to_string(),
                total: -5,
            }
        );
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["wms", "--log-format", "xml", "show"]).is_err());
    }
}
