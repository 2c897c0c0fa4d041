#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use phasetrack_core::{
    AggregatorOptions, EventVariant, ManualClock, ProgressAggregator, RawEvent, StepCatalog,
};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let clock = ManualClock::new();
    let mut agg = ProgressAggregator::new(
        StepCatalog::url_validation(),
        AggregatorOptions::url_validation(),
    )
    .with_clock(Arc::new(clock.clone()));
    agg.start();

    // One event per line; malformed lines are skipped like the CLI does.
    for line in text.lines() {
        clock.advance_secs(0.5);
        let Ok(raw) = RawEvent::from_json(line) else {
            continue;
        };
        if let Some(event) = EventVariant::Validation.normalize(raw) {
            let frame = agg.on_event(&event);
            assert!(frame.overall_pct <= 100);
            if let Some(eta) = frame.eta_secs {
                assert!(eta.is_finite() && eta >= 0.0);
            }
        }
    }
    let frame = agg.complete();
    assert_eq!(frame.overall_pct, 100);
});
