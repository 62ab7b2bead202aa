//! # Order Fulfillment State Machine
//!
//! ```text
//!   pending ──► in_progress ──► ready ──► picked_up
//!      │  └──────────┼─────────────┘▲          (terminal)
//!      │             │  forward skips allowed
//!      ▼             ▼             ▼
//!   ┌──────────────────────────────────┐
//!   │            cancelled             │  (terminal)
//!   └──────────────────────────────────┘
//! ```
//!
//! Updates are compare-and-set: the caller names the status it last saw
//! and the status it wants. The persisted status must still equal the
//! expected one, otherwise the update is a `conflict`.

use uuid::Uuid;

use crate::error::TransitionError;
use crate::types::OrderStatus;

/// Alphabet for tracking codes. No 0/O, 1/I/L, or 5/S.
pub const TRACKING_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRTUVWXYZ2346789";

/// Longest code one UUID can fill (29^16 < 2^122).
pub const MAX_TRACKING_CODE_LENGTH: usize = 16;

/// Position on the forward path; `None` for cancelled.
fn stage(status: OrderStatus) -> Option<u8> {
    match status {
        OrderStatus::Pending => Some(0),
        OrderStatus::InProgress => Some(1),
        OrderStatus::Ready => Some(2),
        OrderStatus::PickedUp => Some(3),
        OrderStatus::Cancelled => None,
    }
}

impl OrderStatus {
    /// picked_up and cancelled accept no further transitions.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::PickedUp | OrderStatus::Cancelled)
    }

    /// Statuses shown on the staff queue.
    pub const fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() || *self == next {
            return false;
        }
        match (stage(*self), stage(next)) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }

    /// Every status reachable from `self` in one update.
    pub fn next_statuses(&self) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .into_iter()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }
}

/// Decides a compare-and-set status update.
///
/// `persisted` is the status currently stored, `expected` the status the
/// caller last observed, `desired` the target.
///
/// ## Errors
/// - `Conflict` when `persisted != expected` (checked first)
/// - `InvalidTransition` for backward moves, self-transitions and moves out
///   of a terminal state
pub fn check_transition(
    persisted: OrderStatus,
    expected: OrderStatus,
    desired: OrderStatus,
) -> Result<(), TransitionError> {
    if persisted != expected {
        return Err(TransitionError::Conflict {
            expected,
            actual: persisted,
        });
    }
    if !persisted.can_transition_to(desired) {
        return Err(TransitionError::InvalidTransition {
            from: persisted,
            to: desired,
        });
    }
    Ok(())
}

/// Generates a customer-facing tracking code of `length` characters.
///
/// The 122 random bits of a v4 UUID are read as one number and written
/// out in base 29 over [`TRACKING_ALPHABET`]. Lengths are capped at 16.
///
/// ```text
/// bit  127 ........ 80 | 79..76  | 75 .. 64 | 63..62  | 61 ......... 0
///      random (48)     | version | rand(12) | variant | random (62)
/// ```
pub fn generate_tracking_code(length: usize) -> String {
    let raw = Uuid::new_v4().as_u128();
    let mut random = (raw >> 80) << 74 | ((raw >> 64) & 0xFFF) << 62 | (raw & ((1 << 62) - 1));

    let base = TRACKING_ALPHABET.len() as u128;
    (0..length.min(MAX_TRACKING_CODE_LENGTH))
        .map(|_| {
            let digit = (random % base) as usize;
            random /= base;
            TRACKING_ALPHABET[digit] as char
        })
        .collect()
}

/// Normalizes a customer-entered tracking code for lookup.
pub fn normalize_tracking_code(code: &str) -> String {
    code.trim()
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderStatus::*;

    #[test]
    fn test_forward_moves_allowed() {
        assert!(check_transition(Pending, Pending, InProgress).is_ok());
        assert!(check_transition(InProgress, InProgress, Ready).is_ok());
        assert!(check_transition(Ready, Ready, PickedUp).is_ok());
        // skip straight to ready
        assert!(check_transition(Pending, Pending, Ready).is_ok());
    }

    #[test]
    fn test_cancellation_from_any_open_status() {
        for status in [Pending, InProgress, Ready] {
            assert!(check_transition(status, status, Cancelled).is_ok());
        }
    }

    #[test]
    fn test_backward_and_terminal_moves_rejected() {
        assert_eq!(
            check_transition(PickedUp, PickedUp, Pending),
            Err(TransitionError::InvalidTransition {
                from: PickedUp,
                to: Pending
            })
        );
        assert!(check_transition(Ready, Ready, InProgress).is_err());
        assert!(check_transition(Cancelled, Cancelled, Pending).is_err());
        assert!(check_transition(PickedUp, PickedUp, Cancelled).is_err());
        assert!(check_transition(Ready, Ready, Ready).is_err());
    }

    #[test]
    fn test_stale_expected_status_conflicts() {
        assert_eq!(
            check_transition(InProgress, Pending, Cancelled),
            Err(TransitionError::Conflict {
                expected: Pending,
                actual: InProgress
            })
        );
    }

    #[test]
    fn test_next_statuses() {
        assert_eq!(Pending.next_statuses(), vec![InProgress, Ready, PickedUp, Cancelled]);
        assert_eq!(Ready.next_statuses(), vec![PickedUp, Cancelled]);
        assert!(PickedUp.next_statuses().is_empty());
    }

    #[test]
    fn test_tracking_code_alphabet() {
        for _ in 0..50 {
            let code = generate_tracking_code(8);
            assert_eq!(code.len(), 8);
            assert!(code.bytes().all(|b| TRACKING_ALPHABET.contains(&b)));
        }
        assert_eq!(generate_tracking_code(40).len(), 16);
    }

    #[test]
    fn test_tracking_code_every_position_uses_whole_alphabet() {
        let mut seen = [[false; 29]; MAX_TRACKING_CODE_LENGTH];
        for _ in 0..2000 {
            let code = generate_tracking_code(MAX_TRACKING_CODE_LENGTH);
            for (position, b) in code.bytes().enumerate() {
                let digit = TRACKING_ALPHABET.iter().position(|a| *a == b).unwrap();
                seen[position][digit] = true;
            }
        }

        for (position, digits) in seen.iter().enumerate() {
            assert!(
                digits.iter().all(|d| *d),
                "position {} never drew some characters",
                position
            );
        }
    }

    #[test]
    fn test_normalize_tracking_code() {
        assert_eq!(normalize_tracking_code(" abcd-2346 "), "ABCD2346");
    }
}
