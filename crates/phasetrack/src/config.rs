//! Application configuration from CLI flags and environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use phasetrack_core::{AggregatorOptions, EventVariant, StepCatalog};

use crate::errors::AppError;

/// Which dashboard's step catalog and event shape to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    /// Document analysis jobs (upload, extract, analyze, check, report).
    Job,
    /// URL validation runs (collect, resolve, validate, summarize).
    Validation,
}

/// Replay multi-phase progress events as a live progress bar.
#[derive(Parser, Debug)]
#[command(name = "phasetrack", version, about)]
#[allow(clippy::struct_excessive_bools)]
pub struct AppConfig {
    /// JSON-lines event file, or "-" for stdin.
    #[arg(default_value = "-")]
    pub input: String,

    /// Event variant and step catalog.
    #[arg(long, value_enum, default_value = "job", env = "PHASETRACK_VARIANT")]
    pub variant: Variant,

    /// Directory holding step timing history.
    #[arg(long, env = "PHASETRACK_HISTORY_DIR")]
    pub history_dir: Option<PathBuf>,

    /// Do not read or write step timing history.
    #[arg(long)]
    pub no_history: bool,

    /// Elapsed-time refresh interval (e.g., "1s", "250ms").
    #[arg(long, default_value = "1s", env = "PHASETRACK_TICK")]
    pub tick: String,

    /// Delay between replayed events (e.g., "200ms").
    #[arg(long, default_value = "0ms", env = "PHASETRACK_REPLAY_DELAY")]
    pub replay_delay: String,

    /// Trailing ETA samples to average (1 disables smoothing).
    #[arg(long, env = "PHASETRACK_SMOOTHING_WINDOW")]
    pub smoothing_window: Option<usize>,

    /// Overall percentage below which no ETA is shown.
    #[arg(long, env = "PHASETRACK_ETA_MIN_PCT")]
    pub eta_min_pct: Option<f64>,

    /// Remaining seconds under which the ETA reads "almost done".
    #[arg(long)]
    pub almost_done: Option<f64>,

    /// Print the final frame as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Verbose output (activity feed and live stats).
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (no progress bar, no summary).
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate shell completion.
    #[arg(long, value_enum)]
    pub completion: Option<clap_complete::Shell>,
}

impl AppConfig {
    /// Parse CLI arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    #[must_use]
    pub fn event_variant(&self) -> EventVariant {
        match self.variant {
            Variant::Job => EventVariant::Job,
            Variant::Validation => EventVariant::Validation,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> StepCatalog {
        match self.variant {
            Variant::Job => StepCatalog::document_analysis(),
            Variant::Validation => StepCatalog::url_validation(),
        }
    }

    /// Aggregator options: the variant's preset with CLI overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] for an unparseable tick interval.
    pub fn aggregator_options(&self) -> Result<AggregatorOptions, AppError> {
        let mut opts = match self.variant {
            Variant::Job => AggregatorOptions::document_analysis(),
            Variant::Validation => AggregatorOptions::url_validation(),
        };
        opts.tick_interval = parse_duration(&self.tick)
            .ok_or_else(|| AppError::Config(format!("invalid tick interval: {:?}", self.tick)))?;
        if let Some(window) = self.smoothing_window {
            opts.smoothing_window = window;
        }
        if let Some(pct) = self.eta_min_pct {
            opts.eta_min_pct = pct;
        }
        if let Some(secs) = self.almost_done {
            opts.almost_done_secs = secs;
        }
        Ok(opts.normalize())
    }

    /// Delay between replayed events.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] for an unparseable delay.
    pub fn replay_delay(&self) -> Result<Duration, AppError> {
        parse_duration(&self.replay_delay).ok_or_else(|| {
            AppError::Config(format!("invalid replay delay: {:?}", self.replay_delay))
        })
    }
}

/// Parse a duration string like "5m", "1h", "30s", "250ms".
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        let n: u64 = ms.parse().ok()?;
        Some(Duration::from_millis(n))
    } else if let Some(mins) = s.strip_suffix('m') {
        let n: u64 = mins.parse().ok()?;
        Some(Duration::from_secs(n * 60))
    } else if let Some(hours) = s.strip_suffix('h') {
        let n: u64 = hours.parse().ok()?;
        Some(Duration::from_secs(n * 3600))
    } else if let Some(secs) = s.strip_suffix('s') {
        let n: u64 = secs.parse().ok()?;
        Some(Duration::from_secs(n))
    } else {
        let n: u64 = s.parse().ok()?;
        Some(Duration::from_secs(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppConfig {
        let mut argv = vec!["phasetrack"];
        argv.extend_from_slice(args);
        AppConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parse_duration_formats() {
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("2"), Some(Duration::from_secs(2)));
    }

    #[test]
    fn parse_duration_ms() {
        assert_eq!(parse_duration("1ms"), Some(Duration::from_millis(1)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("fast"), None);
    }

    #[test]
    fn defaults() {
        let config = parse(&[]);
        assert_eq!(config.input, "-");
        assert_eq!(config.variant, Variant::Job);
        let opts = config.aggregator_options().unwrap();
        assert_eq!(opts.smoothing_window, 1);
        assert_eq!(opts.tick_interval, Duration::from_secs(1));
        assert_eq!(config.replay_delay().unwrap(), Duration::ZERO);
    }

    #[test]
    fn validation_variant_smooths() {
        let config = parse(&["--variant", "validation", "events.jsonl"]);
        assert_eq!(config.input, "events.jsonl");
        assert_eq!(config.event_variant(), EventVariant::Validation);
        assert_eq!(config.catalog().len(), 4);
        assert_eq!(config.aggregator_options().unwrap().smoothing_window, 5);
    }

    #[test]
    fn overrides_apply_and_normalize() {
        let config = parse(&[
            "--smoothing-window",
            "0",
            "--eta-min-pct",
            "10",
            "--tick",
            "250ms",
        ]);
        let opts = config.aggregator_options().unwrap();
        assert_eq!(opts.smoothing_window, 1);
        assert!((opts.eta_min_pct - 10.0).abs() < f64::EPSILON);
        assert_eq!(opts.tick_interval, Duration::from_millis(250));
    }

    #[test]
    fn bad_tick_is_config_error() {
        let config = parse(&["--tick", "soon"]);
        assert!(matches!(
            config.aggregator_options(),
            Err(AppError::Config(_))
        ));
    }
}
