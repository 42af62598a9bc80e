use super::super::*;

impl<'a, S: State> Layer<'a, S> {
    // === Upgrade Handlers ===

    /// The defense upgrade `player` points at.
    ///
    /// A reference whose record is gone counts as not owned; it is cleared on `player` so the
    /// caller's next write of the player repairs it.
    pub(in crate::layer) async fn owned_defense_upgrade(
        &mut self,
        player: &mut Player,
    ) -> Result<Option<DefenseUpgrade>> {
        let Some(id) = player.defense_upgrade else {
            return Ok(None);
        };
        match self.defense_upgrade(id).await? {
            Some(upgrade) if upgrade.uses > 0 => Ok(Some(upgrade)),
            leftover => {
                warn!(
                    player = %player.id,
                    upgrade = %id,
                    "dropping dangling defense upgrade reference"
                );
                if leftover.is_some() {
                    self.unstage(Key::DefenseUpgrade(id));
                }
                player.defense_upgrade = None;
                Ok(None)
            }
        }
    }

    pub(in crate::layer) async fn holds_offense_upgrade(&self, player: &Player) -> Result<bool> {
        let Some(id) = player.offense_upgrade else {
            return Ok(false);
        };
        Ok(self.offense_upgrade(id).await?.is_some())
    }

    pub(crate) async fn buy_defense_upgrade(
        &mut self,
        id: PlayerId,
    ) -> Result<DefenseUpgrade, EconomyError> {
        let mut player = self.player(id).await?;
        let price = self.economy.defense_upgrade_price;
        Self::debit(&mut player, price)?;

        let upgrade = match self.owned_defense_upgrade(&mut player).await? {
            Some(mut upgrade) => {
                upgrade.uses = upgrade.uses.saturating_add(1);
                upgrade
            }
            None => {
                let upgrade = DefenseUpgrade::new(UpgradeId::random(), player.id);
                player.defense_upgrade = Some(upgrade.id);
                upgrade
            }
        };

        info!(
            player = %player.id,
            upgrade = %upgrade.id,
            uses = upgrade.uses,
            balance = %player.credits,
            "bought defense upgrade"
        );
        self.stage(
            Key::DefenseUpgrade(upgrade.id),
            Value::DefenseUpgrade(upgrade.clone()),
        );
        self.stage_player(player);
        self.record(
            id,
            price,
            constants::DEFENSE_PURCHASE_DESCRIPTION,
            TransactionType::Send,
        );
        Ok(upgrade)
    }

    pub(crate) async fn buy_offense_upgrade(
        &mut self,
        id: PlayerId,
    ) -> Result<OffenseUpgrade, EconomyError> {
        let mut player = self.player(id).await?;
        if self.holds_offense_upgrade(&player).await? {
            return Err(EconomyError::AlreadyOwned);
        }
        let price = self.economy.offense_upgrade_price;
        Self::debit(&mut player, price)?;

        let upgrade = OffenseUpgrade {
            id: UpgradeId::random(),
            owner: player.id,
            multiplier_bps: self.economy.offense_multiplier_bps,
            price,
        };
        player.offense_upgrade = Some(upgrade.id);

        info!(
            player = %player.id,
            upgrade = %upgrade.id,
            balance = %player.credits,
            "bought offense upgrade"
        );
        self.stage(
            Key::OffenseUpgrade(upgrade.id),
            Value::OffenseUpgrade(upgrade.clone()),
        );
        self.stage_player(player);
        self.record(
            id,
            price,
            constants::OFFENSE_PURCHASE_DESCRIPTION,
            TransactionType::Send,
        );
        Ok(upgrade)
    }

    /// Spends one charge of `player`'s defense upgrade, deleting the record and clearing the
    /// reference when it runs out. Returns `false` when there was nothing to spend.
    ///
    /// Only the upgrade record is staged; the caller writes `player`.
    pub(in crate::layer) async fn consume_defense_charge(
        &mut self,
        player: &mut Player,
    ) -> Result<bool> {
        let Some(mut upgrade) = self.owned_defense_upgrade(player).await? else {
            return Ok(false);
        };
        if upgrade.consume() {
            debug!(player = %player.id, upgrade = %upgrade.id, "defense upgrade depleted");
            self.unstage(Key::DefenseUpgrade(upgrade.id));
            player.defense_upgrade = None;
        } else {
            self.stage(
                Key::DefenseUpgrade(upgrade.id),
                Value::DefenseUpgrade(upgrade),
            );
        }
        Ok(true)
    }
}
