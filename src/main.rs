use anyhow::Result;
use clap::Parser;
use order_scope::application::init_tracing;
use order_scope::benchmark::{BenchmarkConfig, BenchmarkRunner, ShutdownSignal};
use order_scope::cli::{BenchArgs, Cli, Command};
use order_scope::config::Settings;
use order_scope::Application;
use tracing::{info, instrument, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new()?;
    init_tracing(&settings.logging)?;

    match cli.command {
        Command::Serve => serve(settings),
        Command::Bench(args) => bench(&settings, &args),
    }
}

#[instrument(skip_all)]
fn serve(settings: Settings) -> Result<()> {
    info!("Starting Order Scope application");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let app = Application::new(settings).await?;
        app.run().await
    })?;

    Ok(())
}

// Runs outside any tokio runtime: the lightweight strategy builds its own.
#[instrument(skip_all)]
fn bench(settings: &Settings, args: &BenchArgs) -> Result<()> {
    let config = BenchmarkConfig::try_from(&args.apply(settings.benchmark.clone()))?;

    let mut runner = BenchmarkRunner::new()?;
    interrupt_on_ctrl_c(runner.shutdown_signal());

    let result = runner.run(&config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{result}");
    }

    Ok(())
}

/// Trigger `shutdown` on Ctrl-C from a detached watcher thread
fn interrupt_on_ctrl_c(shutdown: ShutdownSignal) {
    let watcher = std::thread::Builder::new()
        .name("ctrl-c-watcher".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .build()
            {
                Ok(runtime) => runtime,
                Err(error) => {
                    warn!(%error, "Ctrl-C handling unavailable");
                    return;
                }
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Ctrl-C received, interrupting remaining units");
                    shutdown.trigger();
                }
            });
        });

    if let Err(error) = watcher {
        warn!(%error, "Failed to start Ctrl-C watcher");
    }
}
