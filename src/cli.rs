use crate::config::BenchmarkSettings;
use clap::{Args, Parser, Subcommand};

/// Order Scope: structured order enrichment and spawn-cost benchmark
#[derive(Parser, Debug)]
#[command(name = "order_scope")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the order HTTP API (runs until Ctrl+C)
    Serve,

    /// Run many short units on OS threads or tokio tasks and report the cost
    Bench(BenchArgs),
}

/// Flags override the `benchmark` configuration section
#[derive(Args, Debug, Clone, Default)]
pub struct BenchArgs {
    /// Spawning strategy: platform|heavyweight or virtual|lightweight
    #[arg(long, short)]
    pub strategy: Option<String>,

    /// Number of units to launch
    #[arg(long, short = 'n')]
    pub tasks: Option<usize>,

    /// Sample resources every this many launches
    #[arg(long)]
    pub sample_interval: Option<usize>,

    /// Carrier threads for the lightweight strategy
    #[arg(long, env = "ORDER_SCOPE_BENCH_WORKERS")]
    pub workers: Option<usize>,

    /// Log each unit as it finishes
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the result as JSON instead of a summary line
    #[arg(long)]
    pub json: bool,
}

impl BenchArgs {
    pub fn apply(&self, mut settings: BenchmarkSettings) -> BenchmarkSettings {
        if let Some(strategy) = &self.strategy {
            settings.strategy = strategy.clone();
        }
        if let Some(tasks) = self.tasks {
            settings.task_count = tasks;
        }
        if let Some(interval) = self.sample_interval {
            settings.sample_interval = interval;
        }
        if self.workers.is_some() {
            settings.worker_threads = self.workers;
        }
        settings.verbose |= self.verbose;
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> BenchmarkSettings {
        BenchmarkSettings {
            strategy: "virtual".to_string(),
            task_count: 5000,
            sample_interval: 500,
            verbose: false,
            worker_threads: None,
        }
    }

    #[test]
    fn serve_parses() {
        let cli = Cli::try_parse_from(["order_scope", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve));
    }

    #[test]
    fn bench_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "order_scope",
            "bench",
            "--strategy",
            "platform",
            "--tasks",
            "100",
            "--sample-interval",
            "10",
            "--workers",
            "2",
            "--verbose",
            "--json",
        ])
        .unwrap();

        let Command::Bench(args) = cli.command else {
            panic!("expected bench");
        };
        assert!(args.json);

        let settings = args.apply(defaults());
        assert_eq!(settings.strategy, "platform");
        assert_eq!(settings.task_count, 100);
        assert_eq!(settings.sample_interval, 10);
        assert_eq!(settings.worker_threads, Some(2));
        assert!(settings.verbose);
    }

    #[test]
    fn bench_without_flags_keeps_settings() {
        let settings = BenchArgs::default().apply(defaults());
        assert_eq!(settings.strategy, "virtual");
        assert_eq!(settings.task_count, 5000);
        assert!(settings.worker_threads.is_none());
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["order_scope", "frobnicate"]).is_err());
    }
}
