//! End-to-end timer flow through the tracker, with a manual clock.

use chrono::{Offset, TimeZone, Utc};
use sisyphus_core::{
    Clock, Event, ManualClock, NewTask, Period, Phase, TaskPatch, TimerConfig, TimerStatus,
    Tracker,
};

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap())
}

fn tracker(clock: &ManualClock) -> Tracker<ManualClock> {
    Tracker::ephemeral(clock.clone()).with_offset(Utc.fix())
}

/// Run the current phase to its deadline and observe it.
fn run_out(t: &mut Tracker<ManualClock>, clock: &ManualClock) -> Vec<Event> {
    t.start();
    clock.advance_secs(t.state().remaining_secs as i64);
    t.tick()
}

#[test]
fn four_work_intervals_earn_a_long_break() {
    let clock = clock();
    let mut t = tracker(&clock);
    let mut after_work = Vec::new();

    for _ in 0..4 {
        assert_eq!(t.state().phase, Phase::Work);
        run_out(&mut t, &clock);
        after_work.push(t.state().phase);
        run_out(&mut t, &clock);
    }

    assert_eq!(
        after_work,
        vec![Phase::ShortBreak, Phase::ShortBreak, Phase::ShortBreak, Phase::LongBreak]
    );
    assert_eq!(t.state().completed_work_count, 4);
    assert_eq!(t.sessions().len(), 8);
}

#[test]
fn skip_matches_natural_expiry() {
    let natural_clock = clock();
    let mut natural = tracker(&natural_clock);
    run_out(&mut natural, &natural_clock);

    let skip_clock = clock();
    let mut skipped = tracker(&skip_clock);
    skipped.start();
    skip_clock.advance_secs(60);
    let events = skipped.skip();

    assert!(matches!(
        events.as_slice(),
        [Event::PhaseCompleted { skipped: true, duration_min: 25, .. }]
    ));
    assert_eq!(natural.state().phase, skipped.state().phase);
    assert_eq!(natural.state().remaining_secs, skipped.state().remaining_secs);
    assert_eq!(
        natural.state().completed_work_count,
        skipped.state().completed_work_count
    );
    assert_eq!(natural.sessions()[0].duration_minutes, skipped.sessions()[0].duration_minutes);
}

#[test]
fn skip_from_idle_does_nothing() {
    let clock = clock();
    let mut t = tracker(&clock);
    assert!(t.skip().is_empty());
    assert!(t.sessions().is_empty());
    assert_eq!(t.state().phase, Phase::Work);
}

#[test]
fn reset_and_switch_never_record() {
    let clock = clock();
    let mut t = tracker(&clock);
    t.start();
    clock.advance_secs(20 * 60);
    t.reset();
    assert_eq!(t.state().status, TimerStatus::Idle);
    assert_eq!(t.state().remaining_secs, 25 * 60);

    t.start();
    clock.advance_secs(10 * 60);
    t.switch_mode(Phase::LongBreak);
    assert_eq!(t.state().remaining_secs, 15 * 60);

    clock.advance_secs(60 * 60);
    t.tick();
    assert!(t.sessions().is_empty());
}

#[test]
fn pause_and_resume_do_not_change_total_running_time() {
    let clock = clock();
    let mut t = tracker(&clock);
    t.start();
    clock.advance_secs(10 * 60);
    t.pause();
    clock.advance_secs(3 * 60 * 60);
    assert_eq!(t.state().remaining_secs, 15 * 60);

    t.start();
    clock.advance_secs(15 * 60 - 1);
    assert!(t.tick().is_empty());
    clock.advance_secs(1);
    assert_eq!(t.tick().len(), 1);

    let session = &t.sessions()[0];
    assert_eq!(session.start_time, Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap());
}

#[test]
fn expiry_during_suspension_is_observed_on_refresh() {
    let clock = clock();
    let mut t = tracker(&clock);
    t.start();
    clock.advance_secs(2 * 60 * 60);

    match t.refresh() {
        Event::StateSnapshot { phase, status, remaining_secs, .. } => {
            assert_eq!(phase, Phase::ShortBreak);
            assert_eq!(status, TimerStatus::Idle);
            assert_eq!(remaining_secs, 5 * 60);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(t.sessions().len(), 1);
}

#[test]
fn auto_start_chains_into_next_phase() {
    let clock = clock();
    let mut t = tracker(&clock);
    t.set_config(TimerConfig {
        auto_start_breaks: true,
        ..TimerConfig::default()
    })
    .unwrap();

    run_out(&mut t, &clock);
    assert_eq!(t.state().phase, Phase::ShortBreak);
    assert_eq!(t.state().status, TimerStatus::Running);

    clock.advance_secs(5 * 60);
    t.tick();
    assert_eq!(t.state().phase, Phase::Work);
    assert_eq!(t.state().status, TimerStatus::Idle);
}

#[test]
fn config_change_while_running_applies_from_next_phase() {
    let clock = clock();
    let mut t = tracker(&clock);
    t.start();
    clock.advance_secs(60);
    t.set_config(TimerConfig {
        work_duration: 50,
        short_break_duration: 10,
        ..TimerConfig::default()
    })
    .unwrap();

    assert_eq!(t.state().remaining_secs, 24 * 60);
    clock.advance_secs(24 * 60);
    t.tick();
    assert_eq!(t.state().phase, Phase::ShortBreak);
    assert_eq!(t.state().remaining_secs, 10 * 60);
}

#[test]
fn invalid_config_is_rejected_and_previous_kept() {
    let clock = clock();
    let mut t = tracker(&clock);
    let err = t.set_config(TimerConfig {
        long_break_interval: 1,
        ..TimerConfig::default()
    });
    assert!(err.is_err());
    assert_eq!(t.settings().timer, TimerConfig::default());
}

#[test]
fn deleted_task_keeps_its_name_in_history() {
    let clock = clock();
    let mut t = tracker(&clock);
    let task = t
        .add_task(NewTask::new("Thesis").project("Uni").estimate(4))
        .unwrap();
    t.set_active_task(Some(&task.id)).unwrap();

    run_out(&mut t, &clock);
    assert_eq!(t.task(&task.id).unwrap().completed_intervals, 1);

    t.update_task(
        &task.id,
        &TaskPatch {
            title: Some("Renamed".into()),
            ..TaskPatch::default()
        },
    )
    .unwrap();
    t.delete_task(&task.id).unwrap();

    let session = &t.sessions()[0];
    assert_eq!(session.task_name.as_deref(), Some("Thesis"));
    assert_eq!(session.project_name, "Uni");
    assert!(t.state().active_task_id.is_none());
}

#[test]
fn active_task_is_credited_for_each_work_interval() {
    let clock = clock();
    let mut t = tracker(&clock);
    let task = t.add_task(NewTask::new("Essay").estimate(2)).unwrap();
    t.set_active_task(Some(&task.id)).unwrap();

    run_out(&mut t, &clock);
    assert_eq!(t.state().phase, Phase::ShortBreak);
    run_out(&mut t, &clock);
    assert_eq!(t.task(&task.id).unwrap().completed_intervals, 1);
    run_out(&mut t, &clock);

    assert_eq!(t.task(&task.id).unwrap().completed_intervals, 2);
    assert_eq!(t.state().completed_work_count, 2);
    assert_eq!(t.sessions().len(), 3);
    assert!(t
        .sessions()
        .iter()
        .all(|s| s.task_id.as_deref() == Some(task.id.as_str())));

    let summary = t.task_summary();
    assert_eq!(summary.completed_intervals, 2);
    assert_eq!(summary.estimated_finish, clock.now());
}

#[test]
fn reports_reflect_recorded_work() {
    let clock = clock();
    let mut t = tracker(&clock);
    run_out(&mut t, &clock);
    run_out(&mut t, &clock);
    run_out(&mut t, &clock);

    let day = t.report(Period::Day);
    assert_eq!(day.focus_sessions, 2);
    assert_eq!(day.total_focus_minutes, 50);
    assert_eq!(day.days_accessed, 1);
    assert_eq!(day.current_streak, 1);

    let page = t.history(1, 10);
    assert_eq!(page.total, 3);
    assert!(page.sessions[0].start_time >= page.sessions[1].start_time);

    let csv = t.export_csv();
    assert_eq!(csv.lines().count(), 4);
}
