//! # brewline-db: Database Layer for Brewline
//!
//! SQLite persistence for the catalog, promotions and orders, using sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Brewline Data Flow                               │
//! │                                                                         │
//! │  order-service command (checkout, track, update status)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  brewline-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌─────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │   │  Repositories   │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │   │                 │   │  (embedded)  │   │   │
//! │  │   │               │   │ CatalogRepo     │   │              │   │   │
//! │  │   │ SqlitePool    │◄──│ PromotionRepo   │   │ 001_initial  │   │   │
//! │  │   │ WAL, FKs      │   │ OrderRepo       │   │              │   │   │
//! │  │   └───────────────┘   └─────────────────┘   └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use brewline_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/brewline.db")).await?;
//! let snapshot = db.catalog().load_snapshot(&ingredient_ids).await?;
//! let order = db.orders().get_by_tracking_code("K7M2X9PQ").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::catalog::CatalogRepository;
pub use repository::order::{NewOrder, OrderDetails, OrderLine, OrderRepository};
pub use repository::promotion::PromotionRepository;
