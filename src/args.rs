//! Command line for the fishing bot

use crate::config::{MacroConfig, threshold_from_steps};
use crate::error::MacroResult;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mc-fishing-bot", version, about = "Minecraft auto-fishing macro")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Debug logging (per-tick scores, capture timings)
    #[arg(long, global = true)]
    pub debug: bool,
}

impl Args {
    /// `run` with default flags when no subcommand is given
    pub fn resolved_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Run(RunArgs::default()))
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Fish until stopped with Ctrl-C or the run limit is reached
    Run(RunArgs),
    /// Save one capture of the game window
    Snapshot(SnapshotArgs),
    /// List capturable windows and their process ids
    Windows,
}

/// Where frames come from
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct TargetArgs {
    /// Process id of the game window
    #[arg(long, global = true)]
    pub pid: Option<u32>,

    /// Pick the game window by (part of) its title
    #[arg(long, global = true, conflicts_with = "pid")]
    pub title: Option<String>,

    /// Replay PNG/JPEG frames from a directory instead of a live window
    #[arg(long, global = true, conflicts_with_all = ["pid", "title"])]
    pub replay: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, ClapArgs)]
pub struct RunArgs {
    /// JSON settings file; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Delay after throwing before the next bite may be handled (ms)
    #[arg(long)]
    pub start_delay: Option<u64>,

    /// Delay between collecting and throwing (ms)
    #[arg(long)]
    pub throw_delay: Option<u64>,

    /// Delay between spotting a bite and collecting (ms)
    #[arg(long)]
    pub collect_delay: Option<u64>,

    /// Match threshold between 0.0 and 1.0
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Match threshold as an integer step from 0 to 10
    #[arg(long, conflicts_with = "threshold", value_parser = clap::value_parser!(u8).range(0..=10))]
    pub threshold_steps: Option<u8>,

    /// Stop after this many fish (0 = unlimited)
    #[arg(long)]
    pub run_limit: Option<u32>,

    /// Use the bundled subtitle pattern
    #[arg(long)]
    pub default_pattern: bool,

    /// Pattern image cut from a capture at the game's resolution
    #[arg(long)]
    pub pattern: Option<PathBuf>,

    /// Timer period for capture and match (ms)
    #[arg(long)]
    pub tick_interval: Option<u64>,

    /// Log clicks instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Settings from the config file (or defaults) with flags applied.
    pub fn resolve_config(&self) -> MacroResult<MacroConfig> {
        let mut config = match &self.config {
            Some(path) => MacroConfig::load(path)?,
            None => MacroConfig::default(),
        };
        if let Some(ms) = self.start_delay {
            config.start_delay_ms = ms;
        }
        if let Some(ms) = self.throw_delay {
            config.throw_delay_ms = ms;
        }
        if let Some(ms) = self.collect_delay {
            config.collect_delay_ms = ms;
        }
        if let Some(threshold) = self.threshold {
            config.match_threshold = threshold;
        }
        if let Some(steps) = self.threshold_steps {
            config.match_threshold = threshold_from_steps(steps);
        }
        if let Some(limit) = self.run_limit {
            config.run_limit = limit;
        }
        if self.default_pattern {
            config.use_default_pattern = true;
        }
        if let Some(path) = &self.pattern {
            config.pattern_path = Some(path.clone());
        }
        if let Some(ms) = self.tick_interval {
            config.tick_interval_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, ClapArgs)]
pub struct SnapshotArgs {
    /// Output image; the format follows the extension
    #[arg(short, long, default_value = "snapshot.png")]
    pub output: PathBuf,
}
