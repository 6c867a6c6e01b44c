use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use workpool::PoolConfig;

/// Runtime configuration for the `workpool-server` binary.
///
/// These settings control the size of the demo worker pool, how much work is
/// pushed through it, and whether the HTTP request counter is served
/// alongside it. All values are parsed from CLI arguments or environment
/// variables (a `.env` file is loaded first), with defaults that run a short
/// demonstration.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "workpool-server",
    version,
    about = "Drives a bounded worker pool through start, submit, drain and stop"
)]
pub struct CliArgs {
    /// Number of worker tasks pulling from the submission queue.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 3)]
    pub num_workers: usize,

    /// Number of tasks submitted during the demo run. Task IDs run from 1 to
    /// this value.
    ///
    /// Environment variable: `NUM_TASKS`
    #[arg(long, env = "NUM_TASKS", default_value_t = 10)]
    pub num_tasks: u64,

    /// Capacity of the submission and result queues.
    ///
    /// Defaults to twice the number of workers. Lower values make
    /// backpressure visible sooner.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Upper bound, in milliseconds, of the random delay each task takes.
    ///
    /// Environment variable: `MAX_DELAY_MS`
    #[arg(long, env = "MAX_DELAY_MS", default_value_t = 1_000)]
    pub max_delay_ms: u64,

    /// Deadline, in seconds, for the whole demo run. When it elapses the
    /// pool is cancelled and whatever was produced so far is reported.
    ///
    /// Environment variable: `STOP_AFTER_SECS`
    #[arg(long, env = "STOP_AFTER_SECS", default_value_t = 5)]
    pub stop_after_secs: u64,

    /// Address to serve the request counter on (e.g. "0.0.0.0:8080").
    ///
    /// When unset the binary exits after the demo run. When set it keeps
    /// serving until Ctrl+C or SIGTERM.
    ///
    /// Environment variable: `HTTP_ADDR`
    #[arg(long, env = "HTTP_ADDR")]
    pub http_addr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub pool: PoolConfig,
    pub num_tasks: u64,
    pub max_delay: Duration,
    pub stop_after: Duration,
    pub http_addr: Option<String>,
}

impl TryFrom<CliArgs> for DemoConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.stop_after_secs == 0 {
            bail!("STOP_AFTER_SECS must be greater than 0");
        }

        let mut pool = PoolConfig::new(args.num_workers)?;
        if let Some(capacity) = args.queue_capacity {
            pool = pool.with_queue_capacity(capacity)?;
        }

        Ok(Self {
            pool,
            num_tasks: args.num_tasks,
            max_delay: Duration::from_millis(args.max_delay_ms),
            stop_after: Duration::from_secs(args.stop_after_secs),
            http_addr: args.http_addr,
        })
    }
}
