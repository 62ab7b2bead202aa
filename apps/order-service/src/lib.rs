//! # Brewline Order Service
//!
//! Application layer over `brewline-core` and `brewline-db`.
//!
//! ## Module Structure
//! ```text
//! src/
//! ├── lib.rs              ◄─── You are here (module wiring, tracing)
//! ├── config.rs           ◄─── TOML + environment configuration
//! ├── error.rs            ◄─── ApiError returned by every command
//! ├── retry.rs            ◄─── Exponential backoff around the database
//! ├── state/
//! │   ├── mod.rs
//! │   └── carts.rs        ◄─── Per-session carts
//! ├── commands/
//! │   ├── cart.rs         ◄─── add / update / remove / clear
//! │   ├── promotion.rs    ◄─── apply / remove a code
//! │   ├── checkout.rs     ◄─── cart → persisted order
//! │   ├── tracking.rs     ◄─── tracking code → order view
//! │   └── status.rs       ◄─── staff queue, status updates
//! └── bin/
//!     └── order-service.rs ◄── ops binary
//! ```
//!
//! ## Order Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  add_to_cart ──► apply_promotion ──► checkout ──► track_order           │
//! │       │                │                │              │                │
//! │       ▼                ▼                ▼              ▼                │
//! │  SessionCarts     promotion::       orders().      orders().            │
//! │  (in memory)      validate/apply    create_order   get_by_tracking_code │
//! │                                                                         │
//! │  staff: list_queue ──► update_order_status (compare-and-set)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod retry;
pub mod state;

pub use config::{AppConfig, ConfigError};
pub use error::{ApiError, ErrorCode};
pub use state::{CartSession, SessionCarts};

use tracing_subscriber::EnvFilter;

/// Default filter when neither `RUST_LOG` nor a configured level is set.
const DEFAULT_FILTER: &str = "info,brewline=debug,sqlx=warn";

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins; otherwise `level` (from config) is used, then the
/// built-in default.
pub fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| match level {
            Some(level) => EnvFilter::try_new(level),
            None => EnvFilter::try_new(DEFAULT_FILTER),
        })
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // try_init: tests and embedders may already have installed a subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
