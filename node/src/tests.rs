use crate::{
    scheduler::{cycle_at, run_bonus_loop, BonusSchedule},
    sqlite::SqliteState,
    Config, ConfigError,
};
use hacknet_execution::{mocks::FailingState, Engine, Memory, State, Status};
use hacknet_types::{Credits, HackStatus, Key, KeyKind, PlayerId, Role, Value};
use std::{
    sync::Arc,
    time::{Duration, UNIX_EPOCH},
};
use tracing::Level;

fn parse(yaml: &str) -> Config {
    serde_yaml::from_str(yaml).expect("parse config")
}

#[test]
fn empty_config_uses_defaults() {
    let config = parse("{}").validate().expect("valid");
    let economy = &config.economy;
    assert_eq!(economy.defense_upgrade_price, Credits::from_whole(200));
    assert_eq!(economy.offense_upgrade_price, Credits::from_whole(250));
    assert_eq!(economy.offense_multiplier_bps, 15_000);
    assert_eq!(economy.rank_up_cost, Credits::from_whole(50));
    assert_eq!(economy.bonus_amount, Credits::from_whole(5));
    assert_eq!(config.hack_min, Credits::from_whole(1));
    assert_eq!(config.hack_max, Credits::from_whole(50));
    assert!(economy.allow_self_hack);
    assert_eq!(economy.root_rank, 999);
    assert_eq!(config.bonus_interval, Duration::from_secs(300));
    assert_eq!(config.log_level, Level::INFO);
    assert_eq!(config.root_handle, "root");
    assert_eq!(*economy, hacknet_types::Economy::default());
}

#[test]
fn example_config_matches_defaults() {
    let example = parse(include_str!("../config.example.yaml"))
        .validate()
        .expect("valid");
    let defaults = Config::default().validate().expect("valid");
    assert_eq!(example.economy, defaults.economy);
    assert_eq!(example.bonus_interval, defaults.bonus_interval);
    assert_eq!(example.root_handle, defaults.root_handle);
}

#[test]
fn overrides_are_applied() {
    let config = parse(
        "defense_upgrade_price: 12.5
offense_multiplier: 2.25
hack_max: 100
allow_self_hack: false
bonus_interval_secs: 60
log_level: debug
database: /tmp/hacknet-test.db
",
    )
    .validate()
    .expect("valid");
    assert_eq!(config.economy.defense_upgrade_price, Credits::from_milli(12_500));
    assert_eq!(config.economy.offense_multiplier_bps, 22_500);
    assert_eq!(config.hack_max, Credits::from_whole(100));
    assert!(!config.economy.allow_self_hack);
    assert_eq!(config.bonus_interval, Duration::from_secs(60));
    assert_eq!(config.log_level, Level::DEBUG);
    assert_eq!(config.database.to_str(), Some("/tmp/hacknet-test.db"));
}

#[test]
fn invalid_values_are_rejected() {
    assert!(matches!(
        parse("rank_up_cost: -1").validate(),
        Err(ConfigError::InvalidAmount {
            field: "rank_up_cost",
            ..
        })
    ));
    assert!(matches!(
        parse("defense_upgrade_price: .nan").validate(),
        Err(ConfigError::InvalidAmount { .. })
    ));
    assert!(matches!(
        parse("offense_multiplier: 0.5").validate(),
        Err(ConfigError::InvalidMultiplier { .. })
    ));
    assert!(matches!(
        parse("hack_min: 60").validate(),
        Err(ConfigError::InvalidHackRange { .. })
    ));
    assert!(matches!(
        parse("hack_min: 0").validate(),
        Err(ConfigError::InvalidNonZero {
            field: "hack_min",
            ..
        })
    ));
    assert!(matches!(
        parse("bonus_interval_secs: 0").validate(),
        Err(ConfigError::InvalidNonZero { .. })
    ));
    assert!(matches!(
        parse("log_level: loud").validate(),
        Err(ConfigError::InvalidLogLevel { .. })
    ));
    assert!(matches!(
        parse("root_handle: ''").validate(),
        Err(ConfigError::InvalidRootHandle { .. })
    ));
}

#[test]
fn hack_command_bounds_requested_amount() {
    let config = Config::default().validate().expect("valid");
    assert!(config.hack_amount_allowed(Credits::from_whole(1)));
    assert!(config.hack_amount_allowed(Credits::from_whole(50)));
    assert!(!config.hack_amount_allowed(Credits::ZERO));
    assert!(!config.hack_amount_allowed(Credits::from_milli(50_001)));
    assert!(!config.hack_amount_allowed(Credits::from_whole(100)));
}

#[test]
fn cycles_align_to_interval() {
    let interval = Duration::from_secs(300);
    assert_eq!(cycle_at(UNIX_EPOCH + Duration::from_secs(299), interval), 0);
    assert_eq!(cycle_at(UNIX_EPOCH + Duration::from_secs(300), interval), 1);
    assert_eq!(cycle_at(UNIX_EPOCH + Duration::from_secs(3_000), interval), 10);
}

#[tokio::test]
async fn sqlite_round_trips_records() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = SqliteState::open(&dir.path().join("state.db")).unwrap();

    let id = PlayerId::random();
    let handle = Key::Handle("neo".to_string());
    state
        .insert(handle.clone(), Value::PlayerRef(id))
        .await
        .unwrap();
    assert_eq!(state.get(&handle).await.unwrap(), Some(Value::PlayerRef(id)));
    assert_eq!(state.scan(KeyKind::Handle).await.unwrap().len(), 1);
    assert!(state.scan(KeyKind::Player).await.unwrap().is_empty());

    state.delete(&handle).await.unwrap();
    assert_eq!(state.get(&handle).await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_apply_is_all_or_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");
    let mut state = SqliteState::open(&path).unwrap();

    let kept = Key::Handle("neo".to_string());
    state
        .insert(kept.clone(), Value::PlayerRef(PlayerId::random()))
        .await
        .unwrap();

    // A trigger makes the second write of the batch fail inside the transaction.
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_smith BEFORE INSERT ON records
             WHEN NEW.key = 'handle:smith'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
    }

    let result = state
        .apply(vec![
            (kept.clone(), Status::Delete),
            (
                Key::Handle("smith".to_string()),
                Status::Update(Value::PlayerRef(PlayerId::random())),
            ),
        ])
        .await;
    assert!(result.is_err());
    assert!(state.get(&kept).await.unwrap().is_some());
    assert!(state
        .get(&Key::Handle("smith".to_string()))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn engine_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hacknet.db");

    let (neo, smith) = {
        let engine = Engine::new(SqliteState::open(&path).unwrap(), Default::default());
        let root = engine.bootstrap_root("root").await.unwrap().unwrap();
        assert_eq!(root.role, Role::Admin);
        let neo = engine.register("neo", None).await.unwrap();
        let smith = engine.register("smith", None).await.unwrap();
        assert_eq!(engine.grant_bonus(1).await.unwrap(), 3);
        let attempt = engine
            .resolve_hack(neo.id, smith.id, Credits::from_whole(3))
            .await
            .unwrap();
        assert_eq!(attempt.status, HackStatus::Succeeded);
        (neo.id, smith.id)
    };

    let engine = Engine::new(SqliteState::open(&path).unwrap(), Default::default());
    assert!(engine.bootstrap_root("root").await.unwrap().is_none());
    assert_eq!(
        engine.player(neo).await.unwrap().credits,
        Credits::from_whole(8)
    );
    assert_eq!(
        engine.player_by_handle("smith").await.unwrap().credits,
        Credits::from_whole(2)
    );
    assert_eq!(engine.history(smith).await.unwrap().len(), 1);
    // Three bonus receipts plus one entry per side of the hack.
    assert_eq!(engine.ledger_entries().await.unwrap().len(), 5);
    assert_eq!(engine.grant_bonus(1).await.unwrap(), 0);
    assert_eq!(engine.list_ranked().await.unwrap()[0].handle, "root");
}

#[tokio::test]
async fn bonus_loop_grants_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(Engine::new(
        SqliteState::open(&dir.path().join("hacknet.db")).unwrap(),
        Default::default(),
    ));
    let neo = engine.register("neo", None).await.unwrap();

    run_bonus_loop(
        engine.clone(),
        Duration::from_millis(20),
        tokio::time::sleep(Duration::from_millis(150)),
    )
    .await;

    // Ticks inside one second share a cycle, so at most a boundary crossing adds a second grant.
    let credits = engine.player(neo.id).await.unwrap().credits;
    assert!(
        credits == Credits::from_whole(5) || credits == Credits::from_whole(10),
        "unexpected balance {credits}"
    );
    assert_eq!(
        engine.ledger_entries_for(neo.id).await.unwrap().len() as u64,
        credits.milli() / Credits::from_whole(5).milli()
    );
}

#[tokio::test]
async fn failed_bonus_cycle_is_finished_before_the_next() {
    let state = FailingState::new(Memory::default());
    let failing = state.switch();
    let engine = Engine::new(state, Default::default());
    let mut ids = Vec::new();
    for handle in ["neo", "smith", "trinity"] {
        ids.push(engine.register(handle, None).await.unwrap().id);
    }
    let mut schedule = BonusSchedule::starting_at(7);

    // Only the first player of cycle 7 is paid before storage fails.
    failing.fail_after(1);
    assert!(schedule.catch_up(&engine, 7).await.is_err());
    assert_eq!(schedule.next(), 7);
    failing.disarm();

    // The next tick lands in cycle 8; the rest of cycle 7 is paid first.
    assert_eq!(schedule.catch_up(&engine, 8).await.unwrap(), 5);
    assert_eq!(schedule.next(), 9);
    for id in &ids {
        assert_eq!(
            engine.player(*id).await.unwrap().credits,
            Credits::from_whole(10)
        );
    }

    // A late tick that jumps a boundary still grants the cycle in between.
    assert_eq!(schedule.catch_up(&engine, 10).await.unwrap(), 6);
    assert_eq!(schedule.catch_up(&engine, 10).await.unwrap(), 0);
    for id in &ids {
        assert_eq!(
            engine.player(*id).await.unwrap().credits,
            Credits::from_whole(20)
        );
        assert_eq!(engine.ledger_entries_for(*id).await.unwrap().len(), 4);
    }
}
