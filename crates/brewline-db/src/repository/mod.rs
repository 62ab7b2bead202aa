//! # Repository Module
//!
//! Database repository implementations for Brewline.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  order-service command                                                  │
//! │       │                                                                 │
//! │       │  db.catalog().load_snapshot(&ids)                               │
//! │       ▼                                                                 │
//! │  CatalogRepository ──► rows ──► brewline-core types                     │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked, bound parameters only)                   │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row structs (`*Row`) mirror table columns. JSON and flag columns are
//! decoded into core types at the repository boundary, so nothing above
//! this layer sees storage encodings.
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Ingredients, drinks, sizes, recipes
//! - [`PromotionRepository`](promotion::PromotionRepository) - Promotion records and redemptions
//! - [`OrderRepository`](order::OrderRepository) - Checkout writes, lookups, status updates

pub mod catalog;
pub mod order;
pub mod promotion;
