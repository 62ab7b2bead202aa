//! # State Module
//!
//! Application state for the order service.
//!
//! One type per concern, so each command declares exactly the state it
//! needs:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐          │
//! │  │   Database   │  │  SessionCarts    │  │    AppConfig     │          │
//! │  │              │  │                  │  │                  │          │
//! │  │  SQLite pool │  │  Arc<Mutex<      │  │  store, orders,  │          │
//! │  │  (brewline-  │  │   HashMap<id,    │  │  retry, logging  │          │
//! │  │   db)        │  │   CartSession>>> │  │                  │          │
//! │  └──────────────┘  └──────────────────┘  └──────────────────┘          │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Database: internal connection pool (thread-safe)                    │
//! │  • SessionCarts: one Mutex, held only for synchronous cart edits       │
//! │  • AppConfig: read-only after startup                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod carts;

pub use carts::{CartSession, SessionCarts};
