//! Simulated secret council games played by random bots.
//!
//! Spawns many concurrent sessions on a shared worker pool, lets bots play
//! every seat, and reports how the games ended.

mod bot;
mod config;
mod logging;
mod metrics;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use rand::{SeedableRng, rngs::StdRng};
use secret_council::{Session, WorkerPool};
use tokio::task::JoinSet;

use bot::GameSummary;
use config::BotsConfig;

const HELP: &str = "\
Run simulated secret council games with random bots

USAGE:
  sc_bots [OPTIONS]

OPTIONS:
  --games      N           Number of games to play       [default: env SC_GAMES or 10]
  --players    N           Seats per game (5-10)         [default: env SC_PLAYERS or 7]
  --seed       N           Base seed for reproducible runs [default: env SC_SEED or random]

FLAGS:
  --json                   Print the final summary as JSON
  -h, --help               Print help information

ENVIRONMENT:
  SC_MAX_SESSIONS_PER_WORKER   Sessions per worker before a new one is spawned
  SC_INBOX_CAPACITY            Bounded inbox size of each worker
  SC_MAX_EVENTS_PER_GAME       Event budget before a game is abandoned
  SC_METRICS_BIND              Prometheus exporter address (e.g., 127.0.0.1:9090)
  RUST_LOG                     Log filter [default: info]
";

struct Args {
    games: Option<usize>,
    players: Option<usize>,
    seed: Option<u64>,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        games: pargs.opt_value_from_str("--games")?,
        players: pargs.opt_value_from_str("--players")?,
        seed: pargs.opt_value_from_str("--seed")?,
        json: pargs.contains("--json"),
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = BotsConfig::from_env(args.games, args.players, args.seed)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Metrics exporter listening on {}", addr);
    }

    info!(
        "Playing {} game(s) with {} players each",
        config.games, config.players
    );

    let pool = Arc::new(WorkerPool::init(config.pool)?);
    let summaries = run_games(&pool, &config).await;

    metrics::pool_workers(pool.worker_count().await);
    metrics::pool_sessions(pool.session_counts().await.iter().sum());
    info!("Pool used {} worker(s)", pool.worker_count().await);
    pool.shutdown().await;

    report(&summaries, args.json)?;
    Ok(())
}

/// Play every configured game concurrently on the shared pool.
async fn run_games(pool: &Arc<WorkerPool>, config: &BotsConfig) -> Vec<GameSummary> {
    let mut games = JoinSet::new();

    for index in 0..config.games {
        let pool = Arc::clone(pool);
        let players = config.players;
        let max_events = config.max_events_per_game;
        let seed = config.game_seed(index);

        games.spawn(play_one(pool, players, seed, max_events));
    }

    let mut summaries = Vec::with_capacity(config.games);
    while let Some(joined) = games.join_next().await {
        match joined {
            Ok(Ok(summary)) => {
                metrics::games_finished_total(summary.ending);
                summaries.push(summary);
            }
            Ok(Err(e)) => log::error!("Game failed: {:#}", e),
            Err(e) => log::error!("Game task panicked: {}", e),
        }
    }
    summaries
}

async fn play_one(
    pool: Arc<WorkerPool>,
    players: usize,
    seed: Option<u64>,
    max_events: usize,
) -> Result<GameSummary, Error> {
    let (session, rng) = match seed {
        Some(seed) => (Session::with_seed(seed), StdRng::seed_from_u64(seed)),
        None => (Session::new(), StdRng::from_rng(&mut rand::rng())),
    };
    let mut link = pool.attach(session).await?;
    metrics::pool_workers(pool.worker_count().await);

    let summary = bot::play_game(&mut link, players, rng, max_events).await?;
    if summary.ending.is_none() {
        // Abandoned games are still attached.
        link.handle().detach().await?;
    }
    Ok(summary)
}

fn report(summaries: &[GameSummary], json: bool) -> Result<(), Error> {
    let mut endings: BTreeMap<String, usize> = BTreeMap::new();
    for summary in summaries {
        let key = match summary.ending {
            Some(ending) => ending.to_string(),
            None => "stalled".to_string(),
        };
        *endings.entry(key).or_default() += 1;
    }
    let events: usize = summaries.iter().map(|s| s.events).sum();
    let rejected: usize = summaries.iter().map(|s| s.rejected).sum();

    if json {
        let report = serde_json::json!({
            "games": summaries.len(),
            "events": events,
            "rejected": rejected,
            "endings": endings,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    info!(
        "{} game(s) finished, {} events applied, {} rejected",
        summaries.len(),
        events,
        rejected
    );
    for (ending, count) in &endings {
        info!("  - {}: {}", ending, count);
    }
    Ok(())
}
