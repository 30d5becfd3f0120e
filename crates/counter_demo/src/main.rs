// Example: Fan-out/fan-in over a shared counter
// Spawns N workers that each increment one counter k times, waits for all of
// them, then prints the joined total. Ctrl-C interrupts the wait.

use clap::Parser;
use shared_counter::Coordinator;
use shared_counter::RunConfig;
use shared_counter::DEFAULT_INCREMENTS_PER_WORKER;
use shared_counter::DEFAULT_WORKERS;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Increment a shared counter from parallel workers")]
struct Args {
    /// Number of workers to spawn.
    #[arg(short, long, default_value_t = DEFAULT_WORKERS, env = "COUNTER_WORKERS")]
    workers: usize,

    /// Increments performed by each worker.
    #[arg(short, long, default_value_t = DEFAULT_INCREMENTS_PER_WORKER, env = "COUNTER_INCREMENTS")]
    increments: u64,

    /// Repeat the whole run this many times. Any run that does not reach
    /// workers x increments fails the process.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    repeat: u32,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let config = RunConfig::new(args.workers, args.increments);
    let coordinator = Coordinator::new(config)?;
    let expected = config.expected_total()?;

    // Ctrl-C breaks the join barrier instead of killing the process.
    let interrupt = coordinator.interrupt_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    println!("Thread Implementation:");
    for attempt in 1..=args.repeat {
        let report = match coordinator.run().await {
            Ok(report) => report,
            Err(err) => {
                error!(attempt, "run failed: {err}");
                return Err(err.into());
            }
        };
        println!("Final counter value: {}", report.value);
    }

    info!(runs = args.repeat, expected, "all runs matched");
    Ok(())
}
