use super::super::*;
use hacknet_types::player::validate_handle;

impl<'a, S: State> Layer<'a, S> {
    // === Directory Handlers ===

    async fn claim_handle(&mut self, handle: &str, owner: PlayerId) -> Result<(), EconomyError> {
        validate_handle(handle)?;
        let key = Key::Handle(handle.to_string());
        if self.get(&key).await?.is_some() {
            return Err(EconomyError::HandleTaken(handle.to_string()));
        }
        self.stage(key, Value::PlayerRef(owner));
        Ok(())
    }

    pub(crate) async fn register(
        &mut self,
        handle: &str,
        email: Option<String>,
    ) -> Result<Player, EconomyError> {
        let player = Player::new(
            PlayerId::random(),
            handle.to_string(),
            email,
            self.clock.now_ms(),
        );
        self.claim_handle(handle, player.id).await?;
        player.validate_invariants()?;

        info!(player = %player.id, handle, "player registered");
        self.stage_player(player.clone());
        Ok(player)
    }

    /// Seeds the root administrator into an empty directory. Returns `None` once any player
    /// exists.
    pub(crate) async fn bootstrap_root(
        &mut self,
        handle: &str,
    ) -> Result<Option<Player>, EconomyError> {
        if !self.scan(KeyKind::Player).await?.is_empty() {
            debug!(handle, "directory already populated; skipping root bootstrap");
            return Ok(None);
        }
        let mut root = Player::new(
            PlayerId::random(),
            handle.to_string(),
            None,
            self.clock.now_ms(),
        );
        root.role = Role::Admin;
        root.rank = self.economy.root_rank;
        self.claim_handle(handle, root.id).await?;

        info!(player = %root.id, handle, rank = root.rank, "root administrator created");
        self.stage_player(root.clone());
        Ok(Some(root))
    }

    pub(crate) async fn set_active(
        &mut self,
        id: PlayerId,
        active: bool,
    ) -> Result<Player, EconomyError> {
        let mut player = self.player(id).await?;
        if player.active != active {
            player.active = active;
            info!(player = %id, active, "player status changed");
            self.stage_player(player.clone());
        }
        Ok(player)
    }

    pub(crate) async fn toggle_status(&mut self, id: PlayerId) -> Result<Player, EconomyError> {
        let active = !self.player(id).await?.active;
        self.set_active(id, active).await
    }

    pub(crate) async fn set_role(
        &mut self,
        id: PlayerId,
        role: Role,
    ) -> Result<Player, EconomyError> {
        let mut player = self.player(id).await?;
        if player.role != role {
            player.role = role;
            info!(player = %id, %role, "player role changed");
            self.stage_player(player.clone());
        }
        Ok(player)
    }

    pub(crate) async fn toggle_role(&mut self, id: PlayerId) -> Result<Player, EconomyError> {
        let role = self.player(id).await?.role.toggled();
        self.set_role(id, role).await
    }

    pub(crate) async fn rank_up(&mut self, id: PlayerId) -> Result<Player, EconomyError> {
        let mut player = self.player(id).await?;
        let cost = self.economy.rank_up_cost;
        Self::debit(&mut player, cost)?;
        player.rank = player.rank.saturating_add(1);

        info!(player = %id, rank = player.rank, balance = %player.credits, "player ranked up");
        self.stage_player(player.clone());
        self.record(id, cost, constants::RANK_UP_DESCRIPTION, TransactionType::Send);
        Ok(player)
    }

    /// Applies a profile edit. An empty handle keeps the current one.
    pub(crate) async fn edit_profile(
        &mut self,
        id: PlayerId,
        edit: ProfileEdit,
    ) -> Result<Player, EconomyError> {
        let mut player = self.player(id).await?;
        if !edit.handle.is_empty() && edit.handle != player.handle {
            self.claim_handle(&edit.handle, id).await?;
            self.unstage(Key::Handle(player.handle.clone()));
            info!(player = %id, from = %player.handle, to = %edit.handle, "handle changed");
            player.handle = edit.handle;
        }
        player.email = edit.email;
        player.profile_picture = edit.profile_picture;
        player.validate_invariants()?;

        self.stage_player(player.clone());
        Ok(player)
    }
}
