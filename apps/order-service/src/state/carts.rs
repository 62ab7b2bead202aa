//! # Session Carts
//!
//! One `CartState` per storefront session.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Session Cart Operations                              │
//! │                                                                         │
//! │  Storefront Action        Command                 Session Change        │
//! │  ─────────────────        ───────                 ──────────────        │
//! │                                                                         │
//! │  Pick drink + size ──────► add_to_cart() ────────► cart.add_item()     │
//! │                                                                         │
//! │  Change Quantity ────────► update_cart_item() ───► cart.update_qty()   │
//! │                                                                         │
//! │  Enter code ─────────────► apply_promotion() ────► promotion_code=..   │
//! │                                                                         │
//! │  Place order ────────────► checkout() ───────────► session removed     │
//! │                                                                         │
//! │  NOTE: the lock is never held across an await; commands fetch from     │
//! │        the database first, then lock, edit and release.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use brewline_core::CartState;
use serde::Serialize;

/// A session's cart plus the promotion code it carries to checkout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CartSession {
    pub cart: CartState,

    /// Normalized code from the last successful `apply_promotion`.
    pub promotion_code: Option<String>,
}

/// Registry of session carts.
///
/// Cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct SessionCarts {
    sessions: Arc<Mutex<HashMap<String, CartSession>>>,
}

impl SessionCarts {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CartSession>> {
        // Poisoned: take the map as the panicking edit left it
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads a session. Unknown sessions read as an empty cart.
    pub fn with_cart<F, R>(&self, session_id: &str, f: F) -> R
    where
        F: FnOnce(&CartSession) -> R,
    {
        let sessions = self.lock();
        match sessions.get(session_id) {
            Some(session) => f(session),
            None => f(&CartSession::default()),
        }
    }

    /// Edits a session, creating it on first use.
    pub fn with_cart_mut<F, R>(&self, session_id: &str, f: F) -> R
    where
        F: FnOnce(&mut CartSession) -> R,
    {
        let mut sessions = self.lock();
        f(sessions.entry(session_id.to_string()).or_default())
    }

    /// Drops a session (after checkout or on expiry).
    pub fn remove(&self, session_id: &str) -> Option<CartSession> {
        self.lock().remove(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }
}
