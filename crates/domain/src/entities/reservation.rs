//! Credit reservations.
//!
//! A reservation is created atomically with a balance check and must end in
//! exactly one of COMMITTED or RELEASED. Terminal transitions are idempotent
//! so an external reconciliation sweep can retry them safely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ReservationId, SessionId, UserId};

/// Lifecycle state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationState {
    Held,
    Committed,
    Released,
}

/// A held-but-not-final credit debit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditReservation {
    pub id: ReservationId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub amount: u32,
    pub state: ReservationState,
    /// When the hold was placed; a reconciliation sweep uses this to find
    /// reservations that were never resolved.
    pub held_since: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl CreditReservation {
    pub fn new(session_id: SessionId, user_id: UserId, amount: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: ReservationId::new(),
            session_id,
            user_id,
            amount,
            state: ReservationState::Held,
            held_since: now,
            resolved_at: None,
        }
    }

    /// Finalize the debit. Returns true iff this call performed the
    /// transition; calling on an already-terminal reservation is a no-op.
    pub fn commit(&mut self, now: DateTime<Utc>) -> bool {
        if self.state == ReservationState::Held {
            self.state = ReservationState::Committed;
            self.resolved_at = Some(now);
            true
        } else {
            false
        }
    }

    /// Cancel the hold and make the amount refundable. Returns true iff
    /// this call performed the transition.
    pub fn release(&mut self, now: DateTime<Utc>) -> bool {
        if self.state == ReservationState::Held {
            self.state = ReservationState::Released;
            self.resolved_at = Some(now);
            true
        } else {
            false
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state != ReservationState::Held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held() -> CreditReservation {
        CreditReservation::new(SessionId::new(), UserId::new(), 75, Utc::now())
    }

    #[test]
    fn commit_transitions_once() {
        let mut r = held();
        let now = Utc::now();
        assert!(r.commit(now));
        assert_eq!(r.state, ReservationState::Committed);
        // Second call is a no-op, not an error
        assert!(!r.commit(now));
        assert_eq!(r.state, ReservationState::Committed);
    }

    #[test]
    fn release_transitions_once() {
        let mut r = held();
        let now = Utc::now();
        assert!(r.release(now));
        assert!(!r.release(now));
        assert_eq!(r.state, ReservationState::Released);
    }

    #[test]
    fn commit_after_release_is_a_noop() {
        let mut r = held();
        let now = Utc::now();
        assert!(r.release(now));
        assert!(!r.commit(now));
        assert_eq!(r.state, ReservationState::Released);
    }

    #[test]
    fn terminal_reservations_record_resolution_time() {
        let mut r = held();
        assert!(!r.is_terminal());
        assert!(r.resolved_at.is_none());
        r.commit(Utc::now());
        assert!(r.is_terminal());
        assert!(r.resolved_at.is_some());
    }
}
