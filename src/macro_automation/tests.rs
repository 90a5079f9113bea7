//! Tick and run behaviour with scripted frames and a recording injector

use super::*;
use crate::capture::FrameSource;
use crate::config::MacroConfig;
use crate::error::{MacroError, MacroResult};
use crate::input::{ActionKind, InputInjector};
use crate::match_image::{
    CalibrationConfig, MatchEngine, MatchResult, Pattern, PatternMatcher, ScaleCalibrator,
};
use image::{DynamicImage, GrayImage, Luma};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep};

fn textured(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let mut v = x
            .wrapping_mul(7919)
            .wrapping_add(y.wrapping_mul(104_729))
            .wrapping_add(seed.wrapping_mul(31_337));
        v ^= v >> 7;
        v = v.wrapping_mul(2_654_435_761);
        Luma([(v >> 24) as u8])
    })
}

/// Frame with the bite subtitle visible
fn bite_frame() -> DynamicImage {
    DynamicImage::ImageLuma8(textured(48, 32, 1))
}

/// Frame with nothing to find
fn calm_frame() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(48, 32, Luma([90])))
}

fn bite_pattern() -> Pattern {
    let crop = image::imageops::crop_imm(&textured(48, 32, 1), 10, 8, 12, 8).to_image();
    Pattern::from_luma("bite", crop).unwrap()
}

fn test_config() -> MacroConfig {
    MacroConfig {
        start_delay_ms: 200,
        throw_delay_ms: 100,
        collect_delay_ms: 50,
        match_threshold: 0.9,
        tick_interval_ms: 10,
        ..Default::default()
    }
}

/// Plays queued results, then repeats `fallback` forever.
struct ScriptedSource {
    queued: VecDeque<MacroResult<DynamicImage>>,
    fallback: DynamicImage,
    captures: u64,
}

impl ScriptedSource {
    fn repeating(frame: DynamicImage) -> Self {
        Self {
            queued: VecDeque::new(),
            fallback: frame,
            captures: 0,
        }
    }

    fn then(mut self, result: MacroResult<DynamicImage>) -> Self {
        self.queued.push_back(result);
        self
    }
}

impl FrameSource for ScriptedSource {
    fn capture_image(&mut self) -> MacroResult<DynamicImage> {
        self.captures += 1;
        self.queued
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

type ActionLog = Arc<Mutex<Vec<(ActionKind, Instant)>>>;

#[derive(Default)]
struct RecordingInjector {
    log: ActionLog,
    fail: bool,
}

impl RecordingInjector {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn log(&self) -> ActionLog {
        Arc::clone(&self.log)
    }
}

impl InputInjector for RecordingInjector {
    fn send_action(&mut self, kind: ActionKind) -> MacroResult<()> {
        self.log.lock().unwrap().push((kind, Instant::now()));
        if self.fail {
            return Err(MacroError::input("no input device"));
        }
        Ok(())
    }
}

/// Blocks inside `find` until released, announcing when it got there.
struct GatedMatcher {
    started: Mutex<Option<oneshot::Sender<()>>>,
    release: Mutex<std::sync::mpsc::Receiver<()>>,
}

impl PatternMatcher for GatedMatcher {
    fn find(&self, frame: &DynamicImage, pattern: &Pattern) -> MacroResult<MatchResult> {
        if let Some(started) = self.started.lock().unwrap().take() {
            let _ = started.send(());
        }
        let _ = self.release.lock().unwrap().recv();
        MatchEngine::new().find(frame, pattern)
    }
}

fn kinds(log: &ActionLog) -> Vec<ActionKind> {
    log.lock().unwrap().iter().map(|(kind, _)| *kind).collect()
}

fn sequencer(
    frame: DynamicImage,
    config: MacroConfig,
) -> (ActionSequencer<ScriptedSource, RecordingInjector>, ActionLog) {
    let injector = RecordingInjector::default();
    let log = injector.log();
    let sequencer = ActionSequencer::new(
        ScriptedSource::repeating(frame),
        injector,
        bite_pattern(),
        config,
    );
    (sequencer, log)
}

fn drain(rx: &mut mpsc::Receiver<AutomationEvent>) -> Vec<AutomationEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn finished_count(events: &[AutomationEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, AutomationEvent::RunFinished(_)))
        .count()
}

// ---- ActionSequencer ----

#[tokio::test(start_paused = true)]
async fn test_match_collects_counts_and_throws() {
    let (mut sequencer, log) = sequencer(bite_frame(), test_config());
    let controller = MacroController::new();
    controller.start(0);

    let outcome = sequencer.tick(&controller).await.unwrap();

    let TickOutcome::Fished {
        score,
        fished_count,
    } = outcome
    else {
        panic!("expected a catch, got {outcome:?}");
    };
    assert!(score >= 0.95);
    assert_eq!(fished_count, 1);
    assert_eq!(kinds(&log), vec![ActionKind::Collect, ActionKind::Throw]);
    let state = controller.snapshot();
    assert_eq!(state.fished_count(), 1);
    assert!(state.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_run_limit_three_ends_run() {
    let (mut sequencer, log) = sequencer(bite_frame(), test_config());
    let controller = MacroController::new();
    controller.start(3);

    assert!(matches!(
        sequencer.tick(&controller).await.unwrap(),
        TickOutcome::Fished { fished_count: 1, .. }
    ));
    assert!(matches!(
        sequencer.tick(&controller).await.unwrap(),
        TickOutcome::Fished { fished_count: 2, .. }
    ));
    assert_eq!(
        sequencer.tick(&controller).await.unwrap(),
        TickOutcome::LimitReached { fished_count: 3 }
    );

    let state = controller.snapshot();
    assert!(!state.is_active());
    assert_eq!(state.done_count(), 0);
    let actions_after_limit = kinds(&log);

    // A fourth tick does nothing
    assert_eq!(
        sequencer.tick(&controller).await.unwrap(),
        TickOutcome::Inactive
    );
    assert_eq!(kinds(&log), actions_after_limit);
    assert_eq!(controller.snapshot().fished_count(), 3);
    assert_eq!(sequencer.source().captures, 3);
}

#[tokio::test(start_paused = true)]
async fn test_limit_tick_collects_without_throwing() {
    let (mut sequencer, log) = sequencer(bite_frame(), test_config());
    let controller = MacroController::new();
    controller.start(1);

    sequencer.tick(&controller).await.unwrap();

    assert_eq!(kinds(&log), vec![ActionKind::Collect]);
}

#[tokio::test(start_paused = true)]
async fn test_no_match_changes_nothing() {
    let (mut sequencer, log) = sequencer(calm_frame(), test_config());
    let controller = MacroController::new();
    controller.start(2);

    for _ in 0..5 {
        let outcome = sequencer.tick(&controller).await.unwrap();
        assert!(matches!(outcome, TickOutcome::NoMatch { .. }), "{outcome:?}");
    }

    let state = controller.snapshot();
    assert_eq!(state.fished_count(), 0);
    assert_eq!(state.done_count(), 0);
    assert!(state.is_active());
    assert!(kinds(&log).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_inactive_tick_does_not_capture() {
    let (mut sequencer, log) = sequencer(bite_frame(), test_config());
    let controller = MacroController::new();

    assert_eq!(
        sequencer.tick(&controller).await.unwrap(),
        TickOutcome::Inactive
    );
    assert_eq!(sequencer.source().captures, 0);
    assert!(kinds(&log).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_collect_delay_interrupts() {
    let config = MacroConfig {
        collect_delay_ms: 1000,
        ..test_config()
    };
    let (mut sequencer, log) = sequencer(bite_frame(), config);
    let controller = MacroController::new();
    controller.start(0);

    let (outcome, ()) = tokio::join!(sequencer.tick(&controller), async {
        sleep(Duration::from_millis(500)).await;
        controller.stop();
    });

    assert_eq!(outcome.unwrap(), TickOutcome::Interrupted);
    assert!(kinds(&log).is_empty());
    assert_eq!(controller.snapshot().fished_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_throw_delay_skips_throw() {
    let config = MacroConfig {
        collect_delay_ms: 0,
        throw_delay_ms: 1000,
        ..test_config()
    };
    let (mut sequencer, log) = sequencer(bite_frame(), config);
    let controller = MacroController::new();
    controller.start(0);

    let (outcome, ()) = tokio::join!(sequencer.tick(&controller), async {
        sleep(Duration::from_millis(500)).await;
        controller.stop();
    });

    assert_eq!(outcome.unwrap(), TickOutcome::Interrupted);
    assert_eq!(kinds(&log), vec![ActionKind::Collect]);
    assert_eq!(controller.snapshot().fished_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_delays_separate_actions() {
    let (mut sequencer, log) = sequencer(bite_frame(), test_config());
    let controller = MacroController::new();
    controller.start(0);
    let begin = Instant::now();

    sequencer.tick(&controller).await.unwrap();

    let end = Instant::now();
    let log = log.lock().unwrap();
    let (_, collected_at) = log[0];
    let (_, thrown_at) = log[1];
    assert!(collected_at - begin >= Duration::from_millis(50));
    assert!(thrown_at - collected_at >= Duration::from_millis(100));
    assert!(end - thrown_at >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_minimized_window_skips_tick() {
    let source = ScriptedSource::repeating(bite_frame())
        .then(Err(MacroError::WindowMinimized { pid: 42 }));
    let injector = RecordingInjector::default();
    let log = injector.log();
    let mut sequencer = ActionSequencer::new(source, injector, bite_pattern(), test_config());
    let controller = MacroController::new();
    controller.start(0);

    let outcome = sequencer.tick(&controller).await.unwrap();
    assert_eq!(outcome, TickOutcome::WindowHidden { consecutive: 1 });
    assert!(kinds(&log).is_empty());
    assert!(controller.is_active());

    // The window came back
    assert!(sequencer.tick(&controller).await.unwrap().is_catch());
}

#[tokio::test(start_paused = true)]
async fn test_minimized_episodes_are_counted() {
    let minimized = || Err(MacroError::WindowMinimized { pid: 42 });
    let source = ScriptedSource::repeating(calm_frame())
        .then(minimized())
        .then(minimized())
        .then(minimized())
        .then(Ok(calm_frame()))
        .then(minimized());
    let mut sequencer = ActionSequencer::new(
        source,
        RecordingInjector::default(),
        bite_pattern(),
        test_config(),
    );
    let controller = MacroController::new();
    controller.start(0);

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        outcomes.push(sequencer.tick(&controller).await.unwrap());
    }

    assert_eq!(outcomes[0], TickOutcome::WindowHidden { consecutive: 1 });
    assert_eq!(outcomes[1], TickOutcome::WindowHidden { consecutive: 2 });
    assert_eq!(outcomes[2], TickOutcome::WindowHidden { consecutive: 3 });
    assert!(matches!(outcomes[3], TickOutcome::NoMatch { .. }));
    // A new episode starts counting again
    assert_eq!(outcomes[4], TickOutcome::WindowHidden { consecutive: 1 });
    assert!(controller.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_matching_is_observed() {
    let (started_tx, started_rx) = oneshot::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel();
    let matcher = Arc::new(GatedMatcher {
        started: Mutex::new(Some(started_tx)),
        release: Mutex::new(release_rx),
    });
    let config = MacroConfig {
        collect_delay_ms: 0,
        ..test_config()
    };
    let (sequencer, log) = sequencer(bite_frame(), config);
    let mut sequencer = sequencer.with_matcher(matcher);
    let controller = MacroController::new();
    controller.start(0);

    // The runtime stays free while the matcher works, so the stop lands
    // before the collect click
    let (outcome, ()) = tokio::join!(sequencer.tick(&controller), async {
        started_rx.await.unwrap();
        controller.stop();
        release_tx.send(()).unwrap();
    });

    assert_eq!(outcome.unwrap(), TickOutcome::Interrupted);
    assert!(kinds(&log).is_empty());
    assert_eq!(controller.snapshot().fished_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_capture_failure_is_returned() {
    let source =
        ScriptedSource::repeating(bite_frame()).then(Err(MacroError::capture("window closed")));
    let mut sequencer = ActionSequencer::new(
        source,
        RecordingInjector::default(),
        bite_pattern(),
        test_config(),
    );
    let controller = MacroController::new();
    controller.start(0);

    let err = sequencer.tick(&controller).await.unwrap_err();
    assert!(matches!(err, MacroError::CaptureFailure { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_oversized_pattern_skips_tick() {
    let tiny = DynamicImage::ImageLuma8(textured(8, 4, 3));
    let (mut sequencer, log) = sequencer(tiny, test_config());
    let controller = MacroController::new();
    controller.start(0);

    let outcome = sequencer.tick(&controller).await.unwrap();

    let TickOutcome::Skipped { reason } = outcome else {
        panic!("expected skip, got {outcome:?}");
    };
    assert!(reason.contains("12x8"));
    assert!(controller.is_active());
    assert!(kinds(&log).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_input_failure_does_not_abort_tick() {
    let injector = RecordingInjector::failing();
    let log = injector.log();
    let mut sequencer = ActionSequencer::new(
        ScriptedSource::repeating(bite_frame()),
        injector,
        bite_pattern(),
        test_config(),
    );
    let controller = MacroController::new();
    controller.start(0);

    let outcome = sequencer.tick(&controller).await.unwrap();

    assert!(outcome.is_catch());
    assert_eq!(kinds(&log), vec![ActionKind::Collect, ActionKind::Throw]);
    assert_eq!(controller.snapshot().fished_count(), 1);
}

#[test]
fn test_only_bundled_pattern_is_calibrated() {
    let bundled = ActionSequencer::new(
        ScriptedSource::repeating(calm_frame()),
        RecordingInjector::default(),
        Pattern::bundled().unwrap(),
        test_config(),
    );
    assert!(bundled.calibrator().is_some());

    let (user, _) = sequencer(calm_frame(), test_config());
    assert!(user.calibrator().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_small_frame_bypasses_calibration() {
    let calibrator = ScaleCalibrator::new(
        bite_pattern(),
        CalibrationConfig {
            reference_width: 64,
            reference_height: 48,
            ..Default::default()
        },
    );
    let (sequencer, log) = sequencer(bite_frame(), test_config());
    let mut sequencer = sequencer.with_calibrator(calibrator);
    let controller = MacroController::new();
    controller.start(0);

    assert!(sequencer.tick(&controller).await.unwrap().is_catch());
    assert_eq!(kinds(&log).len(), 2);
    assert_eq!(sequencer.take_calibrated_scale(), None);
}

// ---- MacroRunner ----

fn runner(
    source: ScriptedSource,
    config: MacroConfig,
) -> (
    MacroRunner<ScriptedSource, RecordingInjector>,
    ActionLog,
    mpsc::Receiver<AutomationEvent>,
) {
    let injector = RecordingInjector::default();
    let log = injector.log();
    let (event_tx, event_rx) = create_event_channel();
    let sequencer = ActionSequencer::new(source, injector, bite_pattern(), config);
    let runner = MacroRunner::new(sequencer, MacroController::new(), event_tx);
    (runner, log, event_rx)
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_at_limit_and_finishes_once() {
    let config = MacroConfig {
        run_limit: 2,
        ..test_config()
    };
    let (mut runner, log, mut event_rx) = runner(ScriptedSource::repeating(bite_frame()), config);

    let summary = runner.run().await.unwrap();

    assert_eq!(summary.fished_count, 2);
    assert_eq!(summary.ticks, 2);
    // Initial cast, then collect/throw, then the limit-reaching collect
    assert_eq!(
        kinds(&log),
        vec![
            ActionKind::Throw,
            ActionKind::Collect,
            ActionKind::Throw,
            ActionKind::Collect
        ]
    );
    assert!(!runner.controller().is_active());

    let events = drain(&mut event_rx);
    assert_eq!(finished_count(&events), 1);
    assert_eq!(events.first(), Some(&AutomationEvent::StateChanged(MacroState::Running)));
    assert!(events.contains(&AutomationEvent::FishedCountUpdated(1)));
    assert!(events.contains(&AutomationEvent::FishedCountUpdated(2)));
    assert_eq!(events.last(), Some(&AutomationEvent::RunFinished(summary)));
}

#[tokio::test(start_paused = true)]
async fn test_external_stop_finishes_run() {
    let (mut runner, log, mut event_rx) =
        runner(ScriptedSource::repeating(calm_frame()), test_config());
    let controller = runner.controller().clone();

    let (result, ()) = tokio::join!(runner.run(), async {
        sleep(Duration::from_millis(1000)).await;
        controller.stop();
    });

    let summary = result.unwrap();
    assert_eq!(summary.fished_count, 0);
    assert!(summary.ticks > 10);
    assert_eq!(kinds(&log), vec![ActionKind::Throw]);
    assert_eq!(finished_count(&drain(&mut event_rx)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_capture_failure_stops_run() {
    let source = ScriptedSource::repeating(calm_frame())
        .then(Ok(calm_frame()))
        .then(Err(MacroError::capture("window closed")));
    let (mut runner, _log, mut event_rx) = runner(source, test_config());

    let err = runner.run().await.unwrap_err();

    assert!(matches!(err, MacroError::CaptureFailure { .. }));
    assert!(!runner.controller().is_active());
    let events = drain(&mut event_rx);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, AutomationEvent::Error(msg) if msg.contains("window closed")))
    );
    assert_eq!(finished_count(&events), 1);
}

#[tokio::test(start_paused = true)]
async fn test_minimized_window_is_reported_once_per_episode() {
    let minimized = || Err(MacroError::WindowMinimized { pid: 7 });
    let source = ScriptedSource::repeating(bite_frame())
        .then(minimized())
        .then(minimized())
        .then(minimized());
    let config = MacroConfig {
        run_limit: 1,
        ..test_config()
    };
    let (mut runner, log, mut event_rx) = runner(source, config);

    let summary = runner.run().await.unwrap();

    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.fished_count, 1);
    assert_eq!(kinds(&log), vec![ActionKind::Throw, ActionKind::Collect]);
    let hidden = drain(&mut event_rx)
        .into_iter()
        .filter(|e| *e == AutomationEvent::WindowHidden)
        .count();
    assert_eq!(hidden, 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_is_rejected() {
    let (mut runner, log, mut event_rx) =
        runner(ScriptedSource::repeating(bite_frame()), test_config());
    runner.controller().start(0);

    let err = runner.run().await.unwrap_err();

    assert!(matches!(err, MacroError::AlreadyRunning));
    assert!(kinds(&log).is_empty());
    assert_eq!(runner.sequencer().source().captures, 0);
    assert!(drain(&mut event_rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ticks_never_overlap() {
    // Each catch takes far longer than the tick interval
    let config = MacroConfig {
        run_limit: 3,
        collect_delay_ms: 300,
        throw_delay_ms: 400,
        start_delay_ms: 500,
        tick_interval_ms: 10,
        ..test_config()
    };
    let (mut runner, log, _event_rx) = runner(ScriptedSource::repeating(bite_frame()), config);

    let summary = runner.run().await.unwrap();

    assert_eq!(summary.ticks, 3);
    assert_eq!(runner.sequencer().source().captures, 3);
    let log = log.lock().unwrap();
    let collects: Vec<Instant> = log
        .iter()
        .filter(|(kind, _)| *kind == ActionKind::Collect)
        .map(|(_, at)| *at)
        .collect();
    assert_eq!(collects.len(), 3);
    for pair in collects.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(300 + 400 + 500));
    }
}

#[test]
fn test_prepare_without_pattern_never_starts() {
    let injector = RecordingInjector::default();
    let log = injector.log();
    let controller = MacroController::new();
    let (event_tx, _event_rx) = create_event_channel();

    let result = MacroRunner::prepare(
        ScriptedSource::repeating(bite_frame()),
        injector,
        MacroConfig::default(),
        controller.clone(),
        event_tx,
    );

    let Err(err) = result else {
        panic!("run without a pattern was accepted");
    };
    assert!(matches!(err, MacroError::MissingPattern));
    assert!(!controller.is_active());
    assert!(kinds(&log).is_empty());
}

#[test]
fn test_prepare_with_default_pattern_calibrates() {
    let (event_tx, _event_rx) = create_event_channel();
    let config = MacroConfig {
        use_default_pattern: true,
        ..MacroConfig::default()
    };

    let Ok(runner) = MacroRunner::prepare(
        ScriptedSource::repeating(calm_frame()),
        RecordingInjector::default(),
        config,
        MacroController::new(),
        event_tx,
    ) else {
        panic!("default pattern run was rejected");
    };

    assert!(runner.sequencer().pattern().is_bundled());
    assert!(runner.sequencer().calibrator().is_some());
}
