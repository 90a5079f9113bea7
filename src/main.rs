use clap::Parser;
use log::{debug, error, info};
use mc_fishing_bot::args::{Args, Command, RunArgs, SnapshotArgs, TargetArgs};
use mc_fishing_bot::capture::{FrameSource, ReplaySource, save_snapshot};
use mc_fishing_bot::input::{DryRunInjector, InputInjector};
use mc_fishing_bot::macro_automation::{
    AutomationEvent, MacroController, MacroRunner, create_event_channel,
};
use mc_fishing_bot::{MacroError, MacroResult};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    let result = match args.resolved_command() {
        Command::Run(run) => run_macro(&args.target, &run).await,
        Command::Snapshot(snapshot) => take_snapshot(&args.target, &snapshot),
        Command::Windows => list_windows(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

async fn run_macro(target: &TargetArgs, run: &RunArgs) -> MacroResult<()> {
    let config = run.resolve_config()?;
    let source = open_source(target)?;
    let injector = open_injector(target, run.dry_run)?;
    info!(
        "🎣 Fishing on {} (threshold {:.1}, limit {})",
        source.describe(),
        config.match_threshold,
        config.run_limit
    );

    let controller = MacroController::new();
    let (event_tx, mut event_rx) = create_event_channel();
    let mut runner = MacroRunner::prepare(source, injector, config, controller.clone(), event_tx)?;

    let stopper = controller.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 Ctrl-C received, stopping...");
            stopper.stop();
        }
    });

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                AutomationEvent::Calibrated { scale } => {
                    info!("📐 Frames are matched at scale {scale:.1}")
                }
                AutomationEvent::RunFinished(summary) => {
                    println!(
                        "✅ Caught {} fish in {} tick(s)",
                        summary.fished_count, summary.ticks
                    );
                }
                other => debug!("📨 {other:?}"),
            }
        }
    });

    runner.run().await?;
    Ok(())
}

fn open_source(target: &TargetArgs) -> MacroResult<Box<dyn FrameSource>> {
    if let Some(dir) = &target.replay {
        return Ok(Box::new(ReplaySource::from_directory(dir)?));
    }
    open_window(target)
}

#[cfg(feature = "desktop")]
fn open_window(target: &TargetArgs) -> MacroResult<Box<dyn FrameSource>> {
    use mc_fishing_bot::capture::WindowSource;

    let source = match (target.pid, &target.title) {
        (Some(pid), _) => WindowSource::for_process(pid),
        (None, Some(title)) => WindowSource::find_by_title(title)?,
        (None, None) => {
            return Err(MacroError::capture(
                "no target window, pass --pid, --title or --replay",
            ));
        }
    };
    Ok(Box::new(source))
}

#[cfg(not(feature = "desktop"))]
fn open_window(_target: &TargetArgs) -> MacroResult<Box<dyn FrameSource>> {
    Err(MacroError::capture(
        "live window capture needs the `desktop` feature, use --replay <dir>",
    ))
}

#[cfg(feature = "desktop")]
fn open_injector(target: &TargetArgs, dry_run: bool) -> MacroResult<Box<dyn InputInjector>> {
    if dry_run || target.replay.is_some() {
        return Ok(Box::new(DryRunInjector::new()));
    }
    Ok(Box::new(mc_fishing_bot::input::MouseInjector::new(
        target.pid,
    )?))
}

#[cfg(not(feature = "desktop"))]
fn open_injector(_target: &TargetArgs, dry_run: bool) -> MacroResult<Box<dyn InputInjector>> {
    if !dry_run {
        log::warn!("⚠️ Built without the `desktop` feature, clicks are only logged");
    }
    Ok(Box::new(DryRunInjector::new()))
}

fn take_snapshot(target: &TargetArgs, snapshot: &SnapshotArgs) -> MacroResult<()> {
    let mut source = open_source(target)?;
    let frame = save_snapshot(&mut source, &snapshot.output)?;
    let (width, height) = frame.dimensions();
    println!(
        "✅ Snapshot ({}x{}, {}ms) saved to {}",
        width,
        height,
        frame.duration_ms,
        snapshot.output.display()
    );
    Ok(())
}

#[cfg(feature = "desktop")]
fn list_windows() -> MacroResult<()> {
    for window in mc_fishing_bot::capture::list_windows()? {
        println!(
            "{:>8}  {:>5}x{:<5} {} - {}",
            window.pid, window.width, window.height, window.app_name, window.title
        );
    }
    Ok(())
}

#[cfg(not(feature = "desktop"))]
fn list_windows() -> MacroResult<()> {
    Err(MacroError::capture(
        "listing windows needs the `desktop` feature",
    ))
}
