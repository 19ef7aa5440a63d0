//! Command execution against snapshot-backed in-memory stores.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use wms_allocation::{
    AllocationEngine, AllocationOutcome, CancellationCoordinator, CancellationOutcome,
    CorrectionOutcome, CorrectionReconciler,
};
use wms_core::{LineItemId, OrderId, SkuId};
use wms_infra::{InMemoryStores, OrderStore, RunnerConfig, Snapshot};
use wms_inventory::Sku;
use wms_orders::Order;

use crate::{Cli, Commands, OutputFormat};

/// Result of one command, printable as text or JSON.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Allocation { outcomes: Vec<AllocationOutcome> },
    Cancellation { outcome: CancellationOutcome },
    Correction { outcome: CorrectionOutcome },
    State { skus: Vec<Sku>, orders: Vec<Order> },
}

impl Report {
    /// Whether every operation in the report succeeded.
    pub fn success(&self) -> bool {
        match self {
            Report::Allocation { outcomes } => outcomes.iter().all(|o| o.success),
            Report::Cancellation { outcome } => outcome.success,
            Report::Correction { outcome } => outcome.success,
            Report::State { .. } => true,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        match self {
            Report::Allocation { outcomes } => {
                if outcomes.is_empty() {
                    out.push_str("No released orders to allocate.\n");
                }
                for o in outcomes {
                    let _ = writeln!(
                        out,
                        "[{}] {} ({}, {} units)",
                        mark(o.success),
                        o.message,
                        o.status,
                        o.allocated_quantity()
                    );
                }
            }
            Report::Cancellation { outcome } => {
                let _ = writeln!(out, "[{}] {}", mark(outcome.success), outcome.message);
                if outcome.success {
                    let _ = writeln!(out, "  released quantity: {}", outcome.released_quantity);
                }
            }
            Report::Correction { outcome } => {
                let _ = writeln!(out, "[{}] {}", mark(outcome.success), outcome.message);
                for r in &outcome.reallocations {
                    let _ = writeln!(out, "  {} -> {}: {}", r.order_id, r.status, r.message);
                }
            }
            Report::State { skus, orders } => {
                let _ = writeln!(out, "SKUs:");
                for s in skus {
                    let _ = writeln!(
                        out,
                        "  {:<12} {:<10} {:<8} total {:>6}  available {:>6}{}",
                        s.id_typed(),
                        s.product_number(),
                        s.warehouse_location(),
                        s.total_quantity(),
                        s.available_quantity(),
                        if s.is_location_locked() { "  (locked)" } else { "" }
                    );
                }
                let _ = writeln!(out, "Orders:");
                for o in orders {
                    let _ = writeln!(
                        out,
                        "  {:<12} {:<8} {:<20} {}",
                        o.id_typed(),
                        o.priority(),
                        o.status(),
                        o.placed_at().to_rfc3339()
                    );
                    for li in o.line_items() {
                        let _ = writeln!(
                            out,
                            "    {:<12} {:<10} {:>4}/{:<4} {}",
                            li.id_typed(),
                            li.product_number(),
                            li.allocated_quantity(),
                            li.requested_quantity(),
                            li.status()
                        );
                    }
                }
            }
        }
        out
    }
}

fn mark(success: bool) -> &'static str {
    if success { "ok" } else { "failed" }
}

/// Run `command` against `mem`, attributing audit entries to `actor`.
///
/// # Errors
///
/// Returns an error if a store operation fails. Business failures are
/// reported in the returned outcomes instead.
pub fn execute(command: &Commands, mem: &InMemoryStores, actor: &str) -> Result<Report> {
    let stores = mem.stores(actor);
    let engine = Arc::new(AllocationEngine::new(stores.clone()));

    let report = match command {
        Commands::Process => Report::Allocation {
            outcomes: engine.process_released_orders()?,
        },
        Commands::Allocate { order } => {
            let id = OrderId::new(order.as_str());
            let mut order = mem
                .orders
                .get(&id)?
                .with_context(|| format!("Order {id} not found"))?;
            Report::Allocation {
                outcomes: vec![engine.allocate_order(&mut order)?],
            }
        }
        Commands::Cancel { order, line } => {
            let coordinator = CancellationCoordinator::new(stores);
            let order_id = OrderId::new(order.as_str());
            let outcome = match line {
                Some(line) => coordinator.cancel_line_item(&order_id, &LineItemId::new(line.as_str()))?,
                None => coordinator.cancel_order(&order_id)?,
            };
            Report::Cancellation { outcome }
        }
        Commands::Correct { sku, total } => {
            let reconciler = CorrectionReconciler::new(stores, engine);
            Report::Correction {
                outcome: reconciler.correct_sku_quantity(&SkuId::new(sku.as_str()), *total)?,
            }
        }
        Commands::Show => Report::State {
            skus: mem.skus.list()?,
            orders: mem.orders.list()?,
        },
    };
    Ok(report)
}

/// Load the snapshot, execute the command, print the report and, with
/// `--write`, save the updated snapshot.
///
/// # Errors
///
/// Returns an error if no snapshot is configured, the snapshot cannot be
/// read or written, or a store operation fails.
pub fn run(cli: &Cli, config: &RunnerConfig) -> Result<Report> {
    let path = config
        .snapshot_path
        .as_deref()
        .context("Snapshot path is required. Set WMS_SNAPSHOT or use --snapshot")?;

    let snapshot = Snapshot::read_from(path)
        .with_context(|| format!("failed to load snapshot {}", path.display()))?;
    let mem = snapshot.into_stores()?;
    tracing::debug!(snapshot = %path.display(), command = ?cli.command, "executing command");

    let report = execute(&cli.command, &mem, &config.audit_actor)?;
    println!("{}", report.render(cli.format)?);

    if cli.write && cli.command.mutates() {
        Snapshot::capture(&mem)?
            .write_to(path)
            .with_context(|| format!("failed to save snapshot {}", path.display()))?;
        tracing::info!(snapshot = %path.display(), "snapshot updated");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wms_core::ProductNumber;
    use wms_infra::SkuStore;
    use wms_orders::{OrderPriority, OrderStatus};

    fn seeded() -> InMemoryStores {
        let mem = InMemoryStores::new();
        let sku = Sku::new(SkuId::new("SKU001"), ProductNumber::new("P001"), 100, "A-01").unwrap();
        mem.skus.save(&sku).unwrap();
        let mut order = Order::new(OrderId::new("ORD001"), OrderPriority::High, Utc::now(), false);
        order
            .add_line_item(LineItemId::new("LINE001"), ProductNumber::new("P001"), 40)
            .unwrap();
        mem.orders.save(&order).unwrap();
        mem
    }

    #[test]
    fn process_then_cancel_restores_stock() {
        let mem = seeded();

        let report = execute(&Commands::Process, &mem, "ops").unwrap();
        assert!(report.success());
        let text = report.render(OutputFormat::Text).unwrap();
        assert!(text.contains("ORD001"));
        assert_eq!(
            mem.skus.get(&SkuId::new("SKU001")).unwrap().unwrap().available_quantity(),
            60
        );

        let cancel = Commands::Cancel {
            order: "ORD001".to_string(),
            line: None,
        };
        let report = execute(&cancel, &mem, "ops").unwrap();
        assert!(report.success());
        assert_eq!(
            mem.skus.get(&SkuId::new("SKU001")).unwrap().unwrap().available_quantity(),
            100
        );
        let order = mem.orders.get(&OrderId::new("ORD001")).unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn allocate_unknown_order_is_an_error() {
        let mem = seeded();
        let cmd = Commands::Allocate {
            order: "NOPE".to_string(),
        };
        let err = execute(&cmd, &mem, "ops").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn correction_failure_is_reported_not_raised() {
        let mem = seeded();
        let cmd = Commands::Correct {
            sku: "SKU001".to_string(),
            total: -3,
        };
        let report = execute(&cmd, &mem, "ops").unwrap();
        assert!(!report.success());

        let json: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["kind"], "correction");
        assert_eq!(json["outcome"]["failure"], "invalid_input");
    }

    #[test]
    fn show_lists_state() {
        let mem = seeded();
        let report = execute(&Commands::Show, &mem, "ops").unwrap();
        let text = report.render(OutputFormat::Text).unwrap();
        assert!(text.contains("SKU001"));
        assert!(text.contains("LINE001"));
    }

    #[test]
    fn run_writes_snapshot_back() {
        let path = std::env::temp_dir().join(format!("wms-cli-{}.json", std::process::id()));
        Snapshot::capture(&seeded()).unwrap().write_to(&path).unwrap();

        let cli = <Cli as clap::Parser>::parse_from([
            "wms",
            "--write",
            "--format",
            "json",
            "process",
        ]);
        let config = RunnerConfig {
            snapshot_path: Some(path.clone()),
            ..RunnerConfig::default()
        };
        run(&cli, &config).unwrap();

        let saved = Snapshot::read_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(saved.allocations.len(), 1);
        assert!(saved.audit.iter().all(|e| e.changed_by == "system"));
        assert!(!saved.audit.is_empty());
    }

    #[test]
    fn run_requires_a_snapshot() {
        let cli = <Cli as clap::Parser>::parse_from(["wms", "show"]);
        let err = run(&cli, &RunnerConfig::default()).unwrap_err();
        assert!(err.to_string().contains("WMS_SNAPSHOT"));
    }
}
