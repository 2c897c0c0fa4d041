//! Application entry point and dispatch.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use phasetrack_cli::output::write_summary;
use phasetrack_cli::presenter::TerminalRenderer;
use phasetrack_cli::ui;
use phasetrack_core::sinks::LoggingSink;
use phasetrack_core::{
    JsonFileTimingStore, ProgressAggregator, RawEvent, RenderState, SinkSet, TimingStore,
    TrackError,
};
use phasetrack_session::LiveSession;

use crate::config::AppConfig;
use crate::errors::AppError;

/// Counters for one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Non-blank lines read.
    pub lines: usize,
    /// Lines that parsed as events.
    pub events: usize,
    /// Lines skipped as malformed JSON.
    pub malformed: usize,
}

/// Run the application.
pub fn run(config: &AppConfig) -> Result<()> {
    // Handle shell completion
    if let Some(shell) = config.completion {
        let mut cmd = <AppConfig as clap::CommandFactory>::command();
        phasetrack_cli::completion::generate_completion(&mut cmd, shell, &mut io::stdout());
        return Ok(());
    }

    let options = config.aggregator_options()?;
    let delay = config.replay_delay()?;

    let mut aggregator = ProgressAggregator::new(config.catalog(), options);
    if let Some(store) = open_store(config)? {
        aggregator = aggregator.with_store(store);
    }

    let sinks = Arc::new(SinkSet::new());
    sinks.register(Arc::new(TerminalRenderer::new(
        config.quiet || config.json,
        config.verbose,
    )));
    sinks.register(Arc::new(LoggingSink::new(500)));
    let mut session = LiveSession::new(aggregator, config.event_variant(), sinks);

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_clone = cancel.clone();
    ctrlc::set_handler(move || cancel_clone.store(true, Ordering::SeqCst))
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl+C handler: {e}"))?;

    let reader = open_input(&config.input)?;
    let (frame, stats) = replay(reader, &mut session, &cancel, delay)?;
    info!(
        lines = stats.lines,
        events = stats.events,
        malformed = stats.malformed,
        "Replay finished"
    );

    if config.json {
        let json = serde_json::to_string_pretty(&frame).map_err(TrackError::from)?;
        println!("{json}");
    } else if !config.quiet {
        ui::print_header("Summary");
        write_summary(&mut io::stdout().lock(), &frame)?;
        if frame.finished && frame.failed.is_none() {
            ui::print_success("All steps complete");
        }
    }

    match frame.failed {
        Some(reason) => Err(AppError::JobFailed(reason).into()),
        None => Ok(()),
    }
}

/// Feed every line of `reader` through the session.
///
/// Malformed lines are logged and skipped. A terminal event ends the replay;
/// reaching end of input completes the run.
///
/// # Errors
///
/// Returns [`AppError::Input`] on read failure and [`AppError::Canceled`]
/// once `cancel` is set.
pub fn replay<R: BufRead>(
    reader: R,
    session: &mut LiveSession,
    cancel: &AtomicBool,
    delay: Duration,
) -> Result<(RenderState, ReplayStats), AppError> {
    let mut stats = ReplayStats::default();
    session.start();
    let mut frame = session.snapshot();

    for (n, line) in reader.lines().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            session.destroy();
            return Err(AppError::Canceled);
        }
        let line = line.map_err(|e| AppError::Input(format!("line {}: {e}", n + 1)))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.lines += 1;

        match RawEvent::from_json(line) {
            Ok(raw) => {
                stats.events += 1;
                frame = session.ingest(raw);
            }
            Err(e) => {
                warn!(line = n + 1, error = %e, "Skipping malformed event");
                stats.malformed += 1;
                continue;
            }
        }

        if frame.finished || frame.failed.is_some() {
            break;
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    if cancel.load(Ordering::SeqCst) {
        session.destroy();
        return Err(AppError::Canceled);
    }
    if !frame.finished && frame.failed.is_none() {
        debug!("End of input, completing run");
        frame = session.complete();
    }
    Ok((frame, stats))
}

fn open_input(input: &str) -> Result<Box<dyn BufRead>, AppError> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(input).map_err(|e| AppError::Input(format!("{input}: {e}")))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Open the timing store unless history is disabled.
///
/// # Errors
///
/// Returns a store error if the history path exists but is not a directory.
pub fn open_store(config: &AppConfig) -> Result<Option<Arc<dyn TimingStore>>, AppError> {
    if config.no_history {
        return Ok(None);
    }
    let store = match &config.history_dir {
        Some(dir) => JsonFileTimingStore::new(dir),
        None => JsonFileTimingStore::in_default_location(),
    };
    let dir = store.dir();
    if dir.exists() && !dir.is_dir() {
        return Err(TrackError::Store(format!("{} is not a directory", dir.display())).into());
    }
    debug!(dir = %dir.display(), "Using timing history");
    Ok(Some(Arc::new(store)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use clap::Parser;
    use phasetrack_core::sinks::NoOpSink;
    use phasetrack_core::{AggregatorOptions, EventVariant, StepCatalog, StepStatus};

    fn job_session() -> LiveSession {
        let agg = ProgressAggregator::new(
            StepCatalog::document_analysis(),
            AggregatorOptions::document_analysis(),
        );
        LiveSession::new(agg, EventVariant::Job, Arc::new(NoOpSink::new()))
    }

    fn run_replay(input: &str) -> Result<(RenderState, ReplayStats), AppError> {
        let mut session = job_session();
        let cancel = AtomicBool::new(false);
        replay(Cursor::new(input.to_string()), &mut session, &cancel, Duration::ZERO)
    }

    #[test]
    fn terminal_event_finishes() {
        let input = r#"{"status":"uploading"}
{"status":"analysis","progress":50}
{"status":"completed"}
"#;
        let (frame, stats) = run_replay(input).unwrap();
        assert!(frame.finished);
        assert_eq!(frame.overall_pct, 100);
        assert_eq!(stats.events, 3);
        assert!(frame.steps.iter().all(|s| s.status == StepStatus::Done));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let input = "{\"status\":\"uploading\"}\nnot json\n\n{\"status\":\"ocr\"}\n";
        let (frame, stats) = run_replay(input).unwrap();
        assert_eq!(stats.lines, 3);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.events, 2);
        // end of input completes the run
        assert!(frame.finished);
    }

    #[test]
    fn failure_stops_replay() {
        let input = r#"{"status":"extraction"}
{"status":"failed","message":"OCR engine crashed"}
{"status":"report"}
"#;
        let (frame, stats) = run_replay(input).unwrap();
        assert_eq!(frame.failed.as_deref(), Some("OCR engine crashed"));
        assert!(!frame.finished);
        assert_eq!(stats.events, 2);
    }

    #[test]
    fn cancel_flag_aborts() {
        let mut session = job_session();
        let cancel = AtomicBool::new(true);
        let result = replay(
            Cursor::new("{\"status\":\"uploading\"}\n"),
            &mut session,
            &cancel,
            Duration::ZERO,
        );
        assert!(matches!(result, Err(AppError::Canceled)));
        assert!(!session.is_ticking());
    }

    #[test]
    fn empty_input_completes() {
        let (frame, stats) = run_replay("").unwrap();
        assert!(frame.finished);
        assert_eq!(stats, ReplayStats::default());
    }

    #[test]
    fn store_rejects_file_path() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let config = AppConfig::try_parse_from(["phasetrack", "--history-dir", path]).unwrap();
        let err = open_store(&config).err().unwrap();
        assert!(matches!(err, AppError::Track(TrackError::Store(_))));
    }

    #[test]
    fn no_history_skips_store() {
        let config = AppConfig::try_parse_from(["phasetrack", "--no-history"]).unwrap();
        assert!(open_store(&config).unwrap().is_none());
    }

    #[test]
    fn missing_input_is_input_error() {
        let err = open_input("/definitely/not/here.jsonl").err().unwrap();
        assert!(matches!(err, AppError::Input(_)));
    }
}
