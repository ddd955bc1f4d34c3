//! Property tests for phase sequencing and deadline arithmetic.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use sisyphus_core::timer::{advance, next_phase};
use sisyphus_core::{ManualClock, Phase, TimerConfig, TimerEngine, TimerState, TimerStatus};

fn config(interval: u32) -> TimerConfig {
    TimerConfig {
        long_break_interval: interval,
        ..TimerConfig::default()
    }
}

fn engine(completed_work_count: u32) -> (TimerEngine<ManualClock>, ManualClock) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    let cfg = TimerConfig::default();
    let state = TimerState {
        completed_work_count,
        ..TimerState::new(&cfg)
    };
    (TimerEngine::restore(cfg, state, clock.clone()), clock)
}

proptest! {
    #[test]
    fn long_break_exactly_every_interval(interval in 2u32..=10, rounds in 1usize..60) {
        let cfg = config(interval);
        let mut count = 0;
        for _ in 0..rounds {
            let t = advance(Phase::Work, count, &cfg);
            let expect_long = t.completed_work_count % interval == 0;
            prop_assert_eq!(t.next == Phase::LongBreak, expect_long);
            count = t.completed_work_count;
            let back = advance(t.next, count, &cfg);
            prop_assert_eq!(back.next, Phase::Work);
            prop_assert_eq!(back.completed_work_count, count);
        }
    }

    #[test]
    fn next_phase_duration_matches_phase(count in 0u32..1000, interval in 2u32..=10) {
        let cfg = config(interval);
        let (phase, minutes) = next_phase(count, &cfg);
        prop_assert_eq!(minutes, cfg.duration_min(phase));
    }

    #[test]
    fn skip_equals_natural_expiry(elapsed in 0i64..1500, count in 0u32..20) {
        let (mut natural, natural_clock) = engine(count);
        let (mut skipped, skip_clock) = engine(count);

        natural.start();
        natural_clock.advance_secs(1500);
        let a = natural.tick().expect("deadline reached");

        skipped.start();
        skip_clock.advance_secs(elapsed);
        let b = skipped.skip().expect("running timer can skip");

        prop_assert_eq!(a.phase, b.phase);
        prop_assert_eq!(a.duration_min, b.duration_min);
        prop_assert_eq!(a.next_phase, b.next_phase);
        prop_assert_eq!(a.next_duration_min, b.next_duration_min);
        prop_assert_eq!(natural.state().completed_work_count, skipped.state().completed_work_count);
        prop_assert_eq!(natural.remaining_secs(), skipped.remaining_secs());
    }

    #[test]
    fn pauses_do_not_leak_time(runs in proptest::collection::vec((1i64..200, 0i64..10_000), 1..6)) {
        let (mut e, clock) = engine(0);
        let mut ran = 0;
        for (run, idle) in runs {
            e.start();
            clock.advance_secs(run);
            e.pause();
            clock.advance_secs(idle);
            ran += run;
        }
        prop_assert_eq!(e.status(), TimerStatus::Paused);
        prop_assert_eq!(e.remaining_secs(), (1500 - ran) as u64);
    }
}
