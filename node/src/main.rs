use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use hacknet_execution::Engine;
use hacknet_node::{
    scheduler::{cycle_at, run_bonus_loop},
    sqlite::SqliteState,
    Config, ValidatedConfig,
};
use hacknet_types::{Credits, Player, ProfileEdit};
use std::{sync::Arc, time::SystemTime};
use tracing::info;

type Hacknet = Engine<SqliteState>;

fn handle_arg(name: &'static str) -> Arg {
    Arg::new(name).required(true).help("Player handle")
}

fn command() -> Command {
    Command::new("hacknet")
        .about("Persistent hacking economy.")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("YAML configuration file; defaults apply when omitted"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Validate the configuration and exit")
                .action(ArgAction::SetTrue),
        )
        .subcommand_required(true)
        .subcommand(Command::new("run").about("Seed the root admin and grant bonuses until Ctrl-C"))
        .subcommand(
            Command::new("register")
                .about("Register a player")
                .arg(handle_arg("handle"))
                .arg(Arg::new("email").long("email")),
        )
        .subcommand(
            Command::new("hack")
                .about("Hack another player")
                .arg(handle_arg("attacker"))
                .arg(handle_arg("defender"))
                .arg(
                    Arg::new("amount")
                        .required(true)
                        .value_parser(value_parser!(Credits)),
                ),
        )
        .subcommand(
            Command::new("buy")
                .about("Buy an upgrade")
                .arg(handle_arg("handle"))
                .arg(
                    Arg::new("upgrade")
                        .required(true)
                        .value_parser(["defense", "offense"]),
                ),
        )
        .subcommand(
            Command::new("defend")
                .about("Set or clear the standing defender")
                .arg(handle_arg("handle"))
                .arg(Arg::new("target").help("Attacker to block; clears when omitted")),
        )
        .subcommand(
            Command::new("rank-up")
                .about("Spend credits on one rank")
                .arg(handle_arg("handle")),
        )
        .subcommand(
            Command::new("rename")
                .about("Change a player's handle")
                .arg(handle_arg("handle"))
                .arg(handle_arg("new-handle")),
        )
        .subcommand(
            Command::new("moderate")
                .about("Moderate a player")
                .arg(
                    Arg::new("action")
                        .required(true)
                        .value_parser([
                            "ban",
                            "unban",
                            "toggle-status",
                            "promote",
                            "demote",
                            "toggle-role",
                        ]),
                )
                .arg(handle_arg("handle")),
        )
        .subcommand(
            Command::new("players")
                .about("List players")
                .arg(
                    Arg::new("ranked")
                        .long("ranked")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("except")
                        .long("except")
                        .help("Omit this handle, inactive players included"),
                ),
        )
        .subcommand(
            Command::new("history")
                .about("Hack history, newest first")
                .arg(handle_arg("handle")),
        )
        .subcommand(
            Command::new("ledger")
                .about("Ledger entries, newest first")
                .arg(Arg::new("handle").help("Only this player's entries")),
        )
        .subcommand(
            Command::new("bonus")
                .about("Grant one bonus cycle now")
                .arg(
                    Arg::new("cycle")
                        .long("cycle")
                        .value_parser(value_parser!(u64)),
                ),
        )
}

fn main() {
    if let Err(err) = main_result() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn main_result() -> Result<()> {
    let matches = command().get_matches();

    // Load config
    let config: Config = match matches.get_one::<String>("config") {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read config file {path}"))?;
            serde_yaml::from_str(&raw).context("Could not parse config file")?
        }
        None => Config::default(),
    };
    let config = config.validate().context("Invalid config")?;
    if matches.get_flag("dry-run") {
        println!("{config:#?}");
        println!("config ok");
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();
    info!(config = ?config, "loaded config");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(dispatch(config, &matches))
}

async fn dispatch(config: ValidatedConfig, matches: &ArgMatches) -> Result<()> {
    let state = SqliteState::open(&config.database)?;
    let engine = Arc::new(Engine::new(state, config.economy.clone()));

    let Some((name, args)) = matches.subcommand() else {
        anyhow::bail!("missing subcommand");
    };
    match name {
        "run" => {
            if let Some(root) = engine.bootstrap_root(&config.root_handle).await? {
                info!(player = %root.id, handle = %root.handle, "seeded root administrator");
            }
            run_bonus_loop(engine, config.bonus_interval, async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::warn!(?err, "failed to listen for Ctrl-C");
                }
            })
            .await;
        }
        "register" => {
            let email = args.get_one::<String>("email").cloned();
            let player = engine.register(required(args, "handle")?, email).await?;
            print_player(&player);
        }
        "hack" => {
            let attacker = lookup(&engine, required(args, "attacker")?).await?;
            let defender = lookup(&engine, required(args, "defender")?).await?;
            let amount = *args
                .get_one::<Credits>("amount")
                .context("missing amount")?;
            if !config.hack_amount_allowed(amount) {
                anyhow::bail!(
                    "hack amount {amount} outside [{}, {}]",
                    config.hack_min,
                    config.hack_max
                );
            }
            let attempt = engine
                .resolve_hack(attacker.id, defender.id, amount)
                .await?;
            println!("{} ({} credits)", attempt.status, attempt.credits);
        }
        "buy" => {
            let player = lookup(&engine, required(args, "handle")?).await?;
            match required(args, "upgrade")? {
                "defense" => {
                    let upgrade = engine.buy_defense_upgrade(player.id).await?;
                    println!("defense upgrade {} ({} uses)", upgrade.id, upgrade.uses);
                }
                _ => {
                    let upgrade = engine.buy_offense_upgrade(player.id).await?;
                    println!("offense upgrade {}", upgrade.id);
                }
            }
        }
        "defend" => {
            let player = lookup(&engine, required(args, "handle")?).await?;
            match args.get_one::<String>("target") {
                Some(target) => {
                    let target = lookup(&engine, target).await?;
                    engine.set_standing_defender(player.id, target.id).await?;
                }
                None => {
                    engine.clear_standing_defender(player.id).await?;
                }
            }
            print_player(&engine.player(player.id).await?);
        }
        "rank-up" => {
            let player = lookup(&engine, required(args, "handle")?).await?;
            print_player(&engine.rank_up(player.id).await?);
        }
        "rename" => {
            let player = lookup(&engine, required(args, "handle")?).await?;
            let edit = ProfileEdit {
                handle: required(args, "new-handle")?.to_string(),
                email: player.email.clone(),
                profile_picture: player.profile_picture.clone(),
            };
            print_player(&engine.edit_profile(player.id, edit).await?);
        }
        "moderate" => {
            let player = lookup(&engine, required(args, "handle")?).await?;
            let updated = match required(args, "action")? {
                "ban" => engine.ban(player.id).await?,
                "unban" => engine.unban(player.id).await?,
                "toggle-status" => engine.switch_status(player.id).await?,
                "promote" => engine.promote(player.id).await?,
                "demote" => engine.demote(player.id).await?,
                _ => engine.switch_role(player.id).await?,
            };
            print_player(&updated);
        }
        "players" => {
            let players = match args.get_one::<String>("except") {
                Some(handle) => engine.list_all_except(handle).await?,
                None if args.get_flag("ranked") => engine.list_ranked().await?,
                None => engine.list_active().await?,
            };
            for player in players.iter() {
                print_player(player);
            }
        }
        "history" => {
            let player = lookup(&engine, required(args, "handle")?).await?;
            for attempt in engine.history(player.id).await? {
                println!(
                    "{} {} -> {} {} ({})",
                    attempt.created_at_ms,
                    attempt.attacker,
                    attempt.defender,
                    attempt.status,
                    attempt.credits
                );
            }
        }
        "ledger" => {
            let entries = match args.get_one::<String>("handle") {
                Some(handle) => {
                    let player = lookup(&engine, handle).await?;
                    engine.ledger_entries_for(player.id).await?
                }
                None => engine.ledger_entries().await?,
            };
            for entry in entries {
                println!(
                    "{} {} {:?} {} {}",
                    entry.created_at_ms,
                    entry.player,
                    entry.direction,
                    entry.amount,
                    entry.description
                );
            }
        }
        "bonus" => {
            let cycle = match args.get_one::<u64>("cycle") {
                Some(cycle) => *cycle,
                None => cycle_at(SystemTime::now(), config.bonus_interval),
            };
            let granted = engine.grant_bonus(cycle).await?;
            println!("cycle {cycle}: {granted} players credited");
        }
        other => anyhow::bail!("unknown subcommand {other}"),
    }
    Ok(())
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing {name}"))
}

async fn lookup(engine: &Hacknet, handle: &str) -> Result<Player> {
    engine
        .player_by_handle(handle)
        .await
        .with_context(|| format!("unknown player {handle}"))
}

fn print_player(player: &Player) {
    println!(
        "{} {} credits={} rank={} role={} active={}",
        player.id, player.handle, player.credits, player.rank, player.role, player.active
    );
}
