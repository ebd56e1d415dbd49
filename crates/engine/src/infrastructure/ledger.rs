//! In-memory credit ledger.
//!
//! A single mutex guards balances and reservations together so the
//! balance check and the hold are one atomic step. Suitable for a single
//! engine process; a database-backed ledger would use a transactional
//! check-and-deduct instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use personaforge_domain::{CreditReservation, ReservationId, ReservationState, SessionId, UserId};

use super::ports::{ClockPort, CreditLedgerPort, LedgerError};

#[derive(Default)]
struct LedgerState {
    balances: HashMap<UserId, u32>,
    reservations: HashMap<ReservationId, CreditReservation>,
}

pub struct InMemoryCreditLedger {
    state: Mutex<LedgerState>,
    clock: Arc<dyn ClockPort>,
    /// Balance granted to a user on first contact. Zero for tests;
    /// non-zero in the demo deployment where no billing system exists.
    starting_balance: u32,
}

impl InMemoryCreditLedger {
    pub fn new(clock: Arc<dyn ClockPort>, starting_balance: u32) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            clock,
            starting_balance,
        }
    }

    /// Add credits to a user's balance, creating the account if needed.
    pub async fn deposit(&self, user_id: UserId, amount: u32) {
        let mut state = self.state.lock().await;
        let starting = self.starting_balance;
        let balance = state.balances.entry(user_id).or_insert(starting);
        *balance = balance.saturating_add(amount);
    }

    /// Evict committed and released reservations. The reconciliation
    /// sweep only ever touches HELD ones, and terminal records would
    /// otherwise accumulate forever. Returns the eviction count.
    pub async fn prune_terminal(&self) -> usize {
        let mut state = self.state.lock().await;
        let before = state.reservations.len();
        state
            .reservations
            .retain(|_, r| r.state == ReservationState::Held);
        before - state.reservations.len()
    }
}

impl LedgerState {
    fn balance_or_starting(&mut self, user_id: UserId, starting: u32) -> &mut u32 {
        self.balances.entry(user_id).or_insert(starting)
    }
}

#[async_trait]
impl CreditLedgerPort for InMemoryCreditLedger {
    async fn reserve(
        &self,
        user_id: UserId,
        session_id: SessionId,
        amount: u32,
    ) -> Result<ReservationId, LedgerError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let balance = state.balance_or_starting(user_id, self.starting_balance);
        if *balance < amount {
            return Err(LedgerError::InsufficientBalance {
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        let reservation = CreditReservation::new(session_id, user_id, amount, now);
        let id = reservation.id;
        state.reservations.insert(id, reservation);
        tracing::debug!(%user_id, %session_id, amount, reservation_id = %id, "credits held");
        Ok(id)
    }

    async fn commit(&self, id: ReservationId) -> Result<(), LedgerError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let reservation = state
            .reservations
            .get_mut(&id)
            .ok_or_else(|| LedgerError::ReservationNotFound(id.to_string()))?;
        if reservation.commit(now) {
            tracing::debug!(reservation_id = %id, amount = reservation.amount, "credits committed");
        }
        Ok(())
    }

    async fn release(&self, id: ReservationId) -> Result<(), LedgerError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let reservation = state
            .reservations
            .get_mut(&id)
            .ok_or_else(|| LedgerError::ReservationNotFound(id.to_string()))?;
        if reservation.release(now) {
            let (user_id, amount) = (reservation.user_id, reservation.amount);
            let balance = state.balance_or_starting(user_id, self.starting_balance);
            *balance = balance.saturating_add(amount);
            tracing::debug!(reservation_id = %id, amount, "credits released");
        }
        Ok(())
    }

    async fn balance(&self, user_id: UserId) -> u32 {
        let mut state = self.state.lock().await;
        *state.balance_or_starting(user_id, self.starting_balance)
    }

    async fn reservation(&self, id: ReservationId) -> Option<CreditReservation> {
        let state = self.state.lock().await;
        state.reservations.get(&id).cloned()
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Vec<CreditReservation> {
        let state = self.state.lock().await;
        state
            .reservations
            .values()
            .filter(|r| r.state == ReservationState::Held && r.held_since < cutoff)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{FixedClock, SystemClock};
    use chrono::Duration;

    fn ledger() -> InMemoryCreditLedger {
        InMemoryCreditLedger::new(Arc::new(SystemClock), 0)
    }

    #[tokio::test]
    async fn reserve_deducts_from_balance() {
        let ledger = ledger();
        let user = UserId::new();
        ledger.deposit(user, 100).await;

        ledger
            .reserve(user, SessionId::new(), 75)
            .await
            .expect("reserve");
        assert_eq!(ledger.balance(user).await, 25);
    }

    #[tokio::test]
    async fn reserve_fails_on_insufficient_balance() {
        let ledger = ledger();
        let user = UserId::new();
        ledger.deposit(user, 30).await;

        let err = ledger
            .reserve(user, SessionId::new(), 50)
            .await
            .expect_err("must fail");
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                required: 50,
                available: 30
            }
        ));
        assert_eq!(ledger.balance(user).await, 30, "balance untouched");
    }

    #[tokio::test]
    async fn concurrent_reserves_never_overspend() {
        let ledger = Arc::new(ledger());
        let user = UserId::new();
        ledger.deposit(user, 75).await;

        let (a, b) = tokio::join!(
            ledger.reserve(user, SessionId::new(), 75),
            ledger.reserve(user, SessionId::new(), 75),
        );
        // Exactly one of the two concurrent holds may win.
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(ledger.balance(user).await, 0);
    }

    #[tokio::test]
    async fn release_refunds_once() {
        let ledger = ledger();
        let user = UserId::new();
        ledger.deposit(user, 100).await;
        let id = ledger
            .reserve(user, SessionId::new(), 75)
            .await
            .expect("reserve");

        ledger.release(id).await.expect("release");
        assert_eq!(ledger.balance(user).await, 100);

        // Second release is a no-op, not a double refund.
        ledger.release(id).await.expect("idempotent release");
        assert_eq!(ledger.balance(user).await, 100);
    }

    #[tokio::test]
    async fn commit_is_final_and_release_after_commit_does_not_refund() {
        let ledger = ledger();
        let user = UserId::new();
        ledger.deposit(user, 100).await;
        let id = ledger
            .reserve(user, SessionId::new(), 50)
            .await
            .expect("reserve");

        ledger.commit(id).await.expect("commit");
        ledger.release(id).await.expect("no-op release");
        assert_eq!(ledger.balance(user).await, 50);

        let reservation = ledger.reservation(id).await.expect("reservation exists");
        assert_eq!(reservation.state, ReservationState::Committed);
    }

    #[tokio::test]
    async fn prune_evicts_terminal_reservations_and_keeps_held() {
        let ledger = ledger();
        let user = UserId::new();
        ledger.deposit(user, 200).await;

        let held = ledger
            .reserve(user, SessionId::new(), 50)
            .await
            .expect("reserve");
        let committed = ledger
            .reserve(user, SessionId::new(), 50)
            .await
            .expect("reserve");
        let released = ledger
            .reserve(user, SessionId::new(), 50)
            .await
            .expect("reserve");
        ledger.commit(committed).await.expect("commit");
        ledger.release(released).await.expect("release");

        assert_eq!(ledger.prune_terminal().await, 2);
        assert!(ledger.reservation(held).await.is_some(), "hold kept");
        assert!(ledger.reservation(committed).await.is_none());
        assert!(ledger.reservation(released).await.is_none());
        // Refund from the released hold survives the eviction.
        assert_eq!(ledger.balance(user).await, 100);
    }

    #[tokio::test]
    async fn lists_only_stale_held_reservations() {
        let now = Utc::now();
        let ledger = InMemoryCreditLedger::new(Arc::new(FixedClock(now)), 0);
        let user = UserId::new();
        ledger.deposit(user, 200).await;

        let held = ledger
            .reserve(user, SessionId::new(), 50)
            .await
            .expect("reserve");
        let committed = ledger
            .reserve(user, SessionId::new(), 50)
            .await
            .expect("reserve");
        ledger.commit(committed).await.expect("commit");

        let stale = ledger.list_stale(now + Duration::hours(1)).await;
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, held);

        let fresh = ledger.list_stale(now - Duration::hours(1)).await;
        assert!(fresh.is_empty());
    }
}
