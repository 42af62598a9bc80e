mod bonus;
mod combat;
mod directory;
mod ledger;
mod upgrades;
