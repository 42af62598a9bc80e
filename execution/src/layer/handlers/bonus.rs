use super::super::*;

impl<'a, S: State> Layer<'a, S> {
    // === Bonus Handlers ===

    /// Credits one bonus to an active player, at most once per cycle.
    pub(crate) async fn grant_bonus(
        &mut self,
        id: PlayerId,
        cycle: u64,
    ) -> Result<bool, EconomyError> {
        let mut player = self.player(id).await?;
        if !player.active {
            return Ok(false);
        }
        if player.last_bonus_cycle.is_some_and(|last| last >= cycle) {
            debug!(player = %id, cycle, "bonus already granted for cycle");
            return Ok(false);
        }
        let amount = self.economy.bonus_amount;
        Self::credit(&mut player, amount)?;
        player.last_bonus_cycle = Some(cycle);

        self.stage_player(player);
        self.record(id, amount, constants::BONUS_DESCRIPTION, TransactionType::Receive);
        Ok(true)
    }
}
