use super::super::*;

impl<'a, S: State> Layer<'a, S> {
    // === Combat Handlers ===

    /// Resolves one hack. The first matching rule decides the outcome:
    /// 1. the defender's standing defender is the attacker: defended for free,
    /// 2. the defender holds a defense charge: one charge is spent,
    /// 3. otherwise the (possibly multiplied) amount moves, capped at the defender's balance.
    ///
    /// The attempt itself is recorded in every branch.
    pub(crate) async fn resolve_hack(
        &mut self,
        attacker_id: PlayerId,
        defender_id: PlayerId,
        requested: Credits,
    ) -> Result<HackAttempt, EconomyError> {
        if requested.is_zero() {
            return Err(EconomyError::InvalidHackAmount);
        }
        let self_hack = attacker_id == defender_id;
        if self_hack && !self.economy.allow_self_hack {
            return Err(EconomyError::SelfHack);
        }

        let mut attacker = self.player(attacker_id).await?;
        let mut defender = self.player(defender_id).await?;

        let (status, transferred) = if defender.standing_defender == Some(attacker_id) {
            (HackStatus::Defended, Credits::ZERO)
        } else if self.consume_defense_charge(&mut defender).await? {
            self.stage_player(defender);
            (HackStatus::Defended, Credits::ZERO)
        } else {
            let nominal = if self.holds_offense_upgrade(&attacker).await? {
                self.economy.apply_offense_multiplier(requested)
            } else {
                requested
            };
            let transferred = nominal.min(defender.credits);

            if self_hack {
                // One record on both sides; the transfer nets to zero.
                self.stage_player(defender);
            } else {
                Self::debit(&mut defender, transferred)?;
                Self::credit(&mut attacker, transferred)?;
                self.stage_player(defender);
                self.stage_player(attacker);
            }
            self.record(
                attacker_id,
                transferred,
                constants::HACK_DESCRIPTION,
                TransactionType::Receive,
            );
            self.record(
                defender_id,
                transferred,
                constants::HACK_DESCRIPTION,
                TransactionType::Send,
            );
            (HackStatus::Succeeded, transferred)
        };

        let attempt = HackAttempt {
            id: HackId::random(),
            attacker: attacker_id,
            defender: defender_id,
            status,
            credits: transferred,
            created_at_ms: self.clock.now_ms(),
        };
        info!(
            attacker = %attacker_id,
            defender = %defender_id,
            %requested,
            %status,
            credits = %transferred,
            "hack resolved"
        );
        self.stage(Key::Hack(attempt.id), Value::Hack(attempt.clone()));
        Ok(attempt)
    }

    /// Names `target` as the one attacker `player` is always defended against. Naming yourself
    /// is ignored.
    pub(crate) async fn set_standing_defender(
        &mut self,
        player_id: PlayerId,
        target: PlayerId,
    ) -> Result<bool, EconomyError> {
        if player_id == target {
            debug!(player = %player_id, "ignoring self as standing defender");
            return Ok(false);
        }
        let mut player = self.player(player_id).await?;
        self.player(target).await?;

        player.standing_defender = Some(target);
        player.validate_invariants()?;
        info!(player = %player_id, target = %target, "standing defender set");
        self.stage_player(player);
        Ok(true)
    }

    pub(crate) async fn clear_standing_defender(
        &mut self,
        player_id: PlayerId,
    ) -> Result<bool, EconomyError> {
        let mut player = self.player(player_id).await?;
        if player.standing_defender.take().is_none() {
            return Ok(false);
        }
        info!(player = %player_id, "standing defender cleared");
        self.stage_player(player);
        Ok(true)
    }
}
