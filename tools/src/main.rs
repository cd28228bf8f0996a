//! cosmic-runner: headless driver for the Cosmic Clicker core.
//!
//! Usage:
//!   cosmic-runner --identity ada --taps 200 --db cache.db
//!   cosmic-runner --ipc-mode --db cache.db --remote-url https://x.supabase.co --api-key KEY
//!
//! In IPC mode every stdin line is one JSON command and every reply is one
//! JSON line on stdout.

use anyhow::Result;
use cosmic_core::{
    app::{ClickerApp, CommandReply},
    command::PlayerCommand,
    config::{CoreConfig, RemoteConfig},
    context::CoreContext,
};
use std::env;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Command { command: PlayerCommand },
    /// Let background tasks run for `ms` of real time.
    Wait { ms: u64 },
    Quit,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", chrono::Utc::now().timestamp_millis() as u64);
    let taps = parse_arg(&args, "--taps", 100u32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");
    let identity = string_arg(&args, "--identity");

    let mut config = match CoreConfig::load(data_dir) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{e}; using built-in defaults");
            CoreConfig::default()
        }
    };
    if let (Some(base_url), Some(api_key)) =
        (string_arg(&args, "--remote-url"), string_arg(&args, "--api-key"))
    {
        let table = config
            .remote
            .as_ref()
            .map(|r| r.table.clone())
            .unwrap_or_else(|| "profiles".into());
        config.remote = Some(RemoteConfig {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            table,
            timeout_secs: 10,
        });
    }

    if !ipc_mode {
        println!("Cosmic Clicker: cosmic-runner");
        println!("  seed:      {seed}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  remote:    {}", config.remote.as_ref().map_or("in-process", |r| r.base_url.as_str()));
        println!();
    }

    let ctx = CoreContext::from_config(db, config)?;
    let mut app = ClickerApp::new(ctx, seed);

    if ipc_mode {
        run_ipc_loop(&mut app).await?;
    } else {
        run_scripted(&mut app, identity, taps).await?;
    }

    app.close();
    Ok(())
}

async fn run_ipc_loop(app: &mut ClickerApp) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let cmd: IpcCommand = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                reply(app.execute(PlayerCommand::State).await)?;
            }
            IpcCommand::Command { command } => reply(app.execute(command).await)?,
        }
    }
    Ok(())
}

fn reply(result: cosmic_core::error::CoreResult<CommandReply>) -> Result<()> {
    let line = match result {
        Ok(reply) => serde_json::to_string(&reply)?,
        Err(e) => serde_json::json!({ "error": e.to_string() }).to_string(),
    };
    println!("{line}");
    Ok(())
}

/// Log in (or resume), tap, try the timed reward, show the leaderboard.
async fn run_scripted(app: &mut ClickerApp, identity: Option<&str>, taps: u32) -> Result<()> {
    let resumed = match identity {
        Some(_) => false,
        None => app.resume().await?.is_some(),
    };
    if !resumed {
        app.login(identity.unwrap_or("pilot")).await?;
    }

    let session = app.session().ok_or_else(|| anyhow::anyhow!("no session after login"))?;
    if let Some(advisory) = session.advisory() {
        println!("  ! {advisory}");
    }

    let mut earned = 0;
    let mut done = 0;
    for _ in 0..taps {
        match session.tap() {
            Ok(points) => {
                earned += points;
                done += 1;
            }
            Err(e) => {
                println!("  tap stopped: {e}");
                break;
            }
        }
    }
    let reward = session.claim_timed_reward();
    let leaderboard = session.leaderboard().await;
    let snapshot = session.snapshot();

    println!("=== SESSION SUMMARY ===");
    println!("  identity:   {}", snapshot.identity);
    println!("  mode:       {:?}", snapshot.mode);
    println!("  taps:       {done} (+{earned})");
    match reward {
        Ok(amount) => println!("  reward:     +{amount}"),
        Err(e) => println!("  reward:     {e}"),
    }
    println!("  score:      {}", snapshot.score);
    println!("  energy:     {:.0}/{:.0}", snapshot.resource, snapshot.resource_capacity);
    println!("  variant:    {}", snapshot.active_variant);

    println!();
    println!("=== LEADERBOARD ({:?}) ===", leaderboard.source);
    if let Some(advisory) = &leaderboard.advisory {
        println!("  {advisory}");
    }
    for row in leaderboard.rows.iter().take(10) {
        println!("  {:>3}. {:<20} {}", row.rank, row.identity, row.score);
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
