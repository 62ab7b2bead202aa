//! # Order Service Ops Tool
//!
//! Command-line access to the order store for staff and support.
//!
//! ## Usage
//! ```bash
//! # Look up an order the way a customer would
//! order-service track K7M2-X9PQ
//!
//! # The bar's queue
//! order-service queue pending
//!
//! # Move an order along (compare-and-set)
//! order-service status 3f2b...-... pending in_progress
//!
//! # Use another config file or database
//! order-service --config ./store.toml --db ./data/brewline.db queue ready
//! ```

use std::env;
use std::path::PathBuf;

use brewline_core::{Money, OrderStatus};
use brewline_db::{Database, DbConfig};
use brewline_order_service::commands::{list_queue, track_order, update_order_status};
use brewline_order_service::{init_tracing, AppConfig};

fn print_help() {
    println!("Brewline Order Service");
    println!();
    println!("Usage: order-service [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  track <CODE>                          Show an order by tracking code");
    println!("  queue <STATUS>                        List orders in a status");
    println!("  status <ORDER_ID> <FROM> <TO>         Move an order to another status");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>    Config file (default: platform config dir)");
    println!("  -d, --db <PATH>        Database file path (overrides config)");
    println!("  -h, --help             Show this help message");
    println!();
    println!("Statuses: pending, in_progress, ready, picked_up, cancelled");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut command: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => command.push(other.to_string()),
        }
        i += 1;
    }

    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = Some(path);
    }
    init_tracing(config.logging.level.as_deref());

    let db = Database::new(
        DbConfig::new(config.database_path()).max_connections(config.database.max_connections),
    )
    .await?;
    if !db.health_check().await {
        return Err(format!("database at {} is not usable", config.database_path().display()).into());
    }

    let money = |cents: i64| config.format_money(Money::from_cents(cents));

    match command.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["track", code] => {
            let order = track_order(&db, &config, code).await?;

            println!("Order {}  {}", order.tracking_code, order.status);
            println!(
                "Pickup {} · {}",
                order.pickup_at.format("%Y-%m-%d %H:%M"),
                order.contact_name
            );
            for item in &order.items {
                println!(
                    "  {} × {} ({})  {}",
                    item.quantity,
                    item.drink_name,
                    item.size_name,
                    money(item.line_total_cents)
                );
                for line in &item.extra_lines {
                    println!(
                        "      + {} {} {}  +{}",
                        line.ingredient_name,
                        line.amount,
                        line.unit,
                        money(line.price_cents)
                    );
                }
            }
            let estimate = if order.nutrition_complete { "" } else { " (estimate)" };
            println!(
                "Nutrition: {:.0} kcal · {:.1} g sugar{}",
                order.nutrition.energy_kcal, order.nutrition.sugar_g, estimate
            );
            println!(
                "Subtotal {} · Discount {} · Total {}",
                money(order.subtotal_cents),
                money(order.discount_cents),
                money(order.total_cents)
            );
            if !order.next_statuses.is_empty() {
                let next: Vec<String> = order.next_statuses.iter().map(|s| s.to_string()).collect();
                println!("Next: {}", next.join(", "));
            }
        }
        ["queue", status] => {
            let status: OrderStatus = status.parse()?;
            let queue = list_queue(&db, &config, status).await?;

            println!("{} order(s) {}", queue.len(), status);
            for order in &queue {
                println!(
                    "  {}  {}  {}  {}  {}",
                    order.tracking_code,
                    order.pickup_at.format("%H:%M"),
                    order.contact_name,
                    money(order.total_cents),
                    order.id
                );
            }
        }
        ["status", order_id, from, to] => {
            let expected: OrderStatus = from.parse()?;
            let desired: OrderStatus = to.parse()?;
            let order = update_order_status(&db, &config, order_id, expected, desired).await?;

            println!("✓ {} is now {}", order.tracking_code, order.status);
        }
        _ => {
            print_help();
            std::process::exit(2);
        }
    }

    db.close().await;
    Ok(())
}
