use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use plunge::notify::{Notification, NotificationScheduler, Permission};
use plunge::rates::RateInterval;
use plunge::timer::{Clock, ManualClock, ManualTimers};
use std::sync::Arc;
use tokio::sync::mpsc;

const TZ: Tz = chrono_tz::Europe::London;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    // 2024-01-10 is in GMT, so UTC and local times match
    Utc.with_ymd_and_hms(2024, 1, 10, h, m, 0).unwrap()
}

fn slot(from: DateTime<Utc>, price: f64) -> RateInterval {
    RateInterval::new(price, price, from, from + TimeDelta::minutes(30)).unwrap()
}

struct Harness {
    clock: Arc<ManualClock>,
    timers: Arc<ManualTimers>,
    scheduler: NotificationScheduler,
    outbox: mpsc::UnboundedReceiver<Notification>,
}

fn harness(now: DateTime<Utc>) -> Harness {
    let (clock, timers) = ManualTimers::starting_at(now);
    let (tx, outbox) = mpsc::unbounded_channel();
    let scheduler = NotificationScheduler::new(clock.clone(), timers.clone(), TZ, tx);
    Harness {
        clock,
        timers,
        scheduler,
        outbox,
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

#[test]
fn fires_once_at_slot_start() {
    let mut h = harness(at(13, 55));
    let rates: Arc<[RateInterval]> = Arc::from(vec![slot(at(14, 0), -2.0)]);
    h.scheduler.schedule(rates, true, Permission::Granted);

    h.timers.advance_to(at(13, 59));
    assert!(drain(&mut h.outbox).is_empty());

    h.timers.advance_to(at(14, 0));
    let fired = drain(&mut h.outbox);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].title, "Negative Price Alert");
    assert_eq!(fired[0].body, "-2.00p/kWh from 14:00 to 14:30");
    assert_eq!(fired[0].tag, "negative-2024-01-10T14:00:00Z");
    assert_eq!(h.clock.now(), at(14, 0));

    h.timers.advance_to(at(18, 0));
    assert!(drain(&mut h.outbox).is_empty());
    assert!(h.scheduler.is_notified(at(14, 0)));
    assert_eq!(h.scheduler.armed_count(), 0);
}

#[test]
fn repeated_schedule_does_not_double_arm() {
    let mut h = harness(at(12, 0));
    let rates: Arc<[RateInterval]> = Arc::from(vec![slot(at(14, 0), -2.0), slot(at(15, 0), -1.0)]);
    h.scheduler.schedule(rates.clone(), true, Permission::Granted);
    h.scheduler.schedule(rates.clone(), true, Permission::Granted);
    assert_eq!(h.timers.pending(), 2);

    // Equal contents in a fresh allocation are the same input
    let copy: Arc<[RateInterval]> = Arc::from(rates.to_vec());
    h.scheduler.schedule(copy, true, Permission::Granted);
    assert_eq!(h.timers.pending(), 2);

    h.timers.advance_to(at(16, 0));
    assert_eq!(drain(&mut h.outbox).len(), 2);
}

#[test]
fn new_rates_rebuild_without_renotifying() {
    let mut h = harness(at(12, 0));
    h.scheduler
        .schedule(Arc::from(vec![slot(at(12, 30), -1.0)]), true, Permission::Granted);
    h.timers.advance_to(at(12, 45));
    assert_eq!(drain(&mut h.outbox).len(), 1);

    // Refetch with one extra slot; the already notified one is past anyway
    h.scheduler.schedule(
        Arc::from(vec![slot(at(12, 30), -1.0), slot(at(13, 0), -3.0)]),
        true,
        Permission::Granted,
    );
    assert_eq!(h.scheduler.armed_slots(), vec![at(13, 0)]);
    h.timers.advance_to(at(14, 0));
    let fired = drain(&mut h.outbox);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].body, "-3.00p/kWh from 13:00 to 13:30");
}

#[test]
fn disabling_cancels_all_timers() {
    let mut h = harness(at(12, 0));
    let rates: Arc<[RateInterval]> = Arc::from(vec![slot(at(14, 0), -2.0), slot(at(15, 0), -1.0)]);
    h.scheduler.schedule(rates.clone(), true, Permission::Granted);
    assert_eq!(h.timers.pending(), 2);

    h.scheduler.schedule(rates, false, Permission::Granted);
    assert_eq!(h.timers.pending(), 0);
    h.timers.advance_to(at(23, 0));
    assert!(drain(&mut h.outbox).is_empty());
}

#[test]
fn without_permission_nothing_is_armed() {
    let h = harness(at(12, 0));
    let rates: Arc<[RateInterval]> = Arc::from(vec![slot(at(14, 0), -2.0)]);
    h.scheduler.schedule(rates.clone(), true, Permission::Denied);
    assert_eq!(h.timers.pending(), 0);
    h.scheduler.schedule(rates.clone(), true, Permission::Unsupported);
    assert_eq!(h.timers.pending(), 0);

    // Permission granted later is a changed input
    h.scheduler.schedule(rates, true, Permission::Granted);
    assert_eq!(h.timers.pending(), 1);
}

#[test]
fn only_today_future_negative_slots_qualify() {
    let h = harness(at(12, 0));
    let tomorrow = at(0, 0) + TimeDelta::days(1);
    let rates: Arc<[RateInterval]> = Arc::from(vec![
        slot(at(11, 30), -1.0),
        slot(at(12, 0), -1.0),
        slot(at(12, 30), 0.0),
        slot(at(13, 0), 5.0),
        slot(at(13, 30), -0.01),
        slot(tomorrow, -4.0),
    ]);
    h.scheduler.schedule(rates, true, Permission::Granted);
    assert_eq!(h.scheduler.armed_slots(), vec![at(13, 30)]);
}

#[test]
fn teardown_and_drop_cancel_timers() {
    let h = harness(at(12, 0));
    let rates: Arc<[RateInterval]> = Arc::from(vec![slot(at(14, 0), -2.0)]);
    h.scheduler.schedule(rates.clone(), true, Permission::Granted);
    h.scheduler.teardown();
    assert_eq!(h.timers.pending(), 0);

    // Teardown forgets the last inputs, so the same inputs re-arm
    h.scheduler.schedule(rates, true, Permission::Granted);
    assert_eq!(h.timers.pending(), 1);

    let timers = h.timers.clone();
    drop(h);
    assert_eq!(timers.pending(), 0);
}
