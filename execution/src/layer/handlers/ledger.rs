use super::super::*;

impl<'a, S: State> Layer<'a, S> {
    // === Ledger Handlers ===

    /// Appends one ledger entry. Zero amounts are dropped without error.
    pub(in crate::layer) fn record(
        &mut self,
        player: PlayerId,
        amount: Credits,
        description: &str,
        direction: TransactionType,
    ) -> Option<EntryId> {
        let created_at_ms = self.clock.now_ms();
        let Some(entry) = LedgerEntry::new(
            EntryId::random(),
            player,
            direction,
            amount,
            description,
            created_at_ms,
        ) else {
            debug!(player = %player, description, "skipping zero-amount ledger entry");
            return None;
        };
        let id = entry.id;
        self.stage(Key::LedgerEntry(id), Value::LedgerEntry(entry));
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Memory;

    #[tokio::test]
    async fn zero_amount_is_a_no_op() {
        let memory = Memory::default();
        let economy = Economy::default();
        let clock = MonotonicClock::default();
        let mut layer = Layer::new(&memory, &economy, &clock);

        let player = PlayerId::random();
        assert!(layer
            .record(player, Credits::ZERO, constants::HACK_DESCRIPTION, TransactionType::Send)
            .is_none());
        assert!(layer.commit().is_empty());
    }

    #[tokio::test]
    async fn positive_amount_is_staged() {
        let memory = Memory::default();
        let economy = Economy::default();
        let clock = MonotonicClock::default();
        let mut layer = Layer::new(&memory, &economy, &clock);

        let player = PlayerId::random();
        let id = layer
            .record(
                player,
                Credits::from_whole(5),
                constants::BONUS_DESCRIPTION,
                TransactionType::Receive,
            )
            .expect("recorded");
        let changes = layer.commit();
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            (Key::LedgerEntry(key), Status::Update(Value::LedgerEntry(entry))) => {
                assert_eq!(*key, id);
                assert_eq!(entry.player, player);
                assert_eq!(entry.amount, Credits::from_whole(5));
                assert_eq!(entry.direction, TransactionType::Receive);
                assert_eq!(entry.description, "Daily Bonus");
            }
            other => panic!("expected ledger entry, got {other:?}"),
        }
    }
}
