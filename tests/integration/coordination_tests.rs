//! Barrier + power manager across concurrently running activities.

use std::sync::Barrier as StartLine;
use std::thread;

use embassy_time::Duration;
use plantsense::adapters::time::ManualClock;
use plantsense::barrier::{PublishBarrier, PublishFlags, SensorCategory};
use plantsense::power::{
    BarrierStatus, PowerManager, PowerMode, PowerPolicy, SETTLE_DELAY, WaitStrategy,
};

fn forced() -> PowerManager {
    PowerManager::new(PowerPolicy {
        mode: PowerMode::ForcedLowPower,
        enabled: true,
        ..PowerPolicy::default()
    })
}

#[test]
fn concurrent_reports_all_land() {
    let barrier = PublishBarrier::default();
    thread::scope(|s| {
        for c in SensorCategory::ALL {
            let b = &barrier;
            s.spawn(move || {
                for _ in 0..100 {
                    b.report_published(c);
                }
            });
        }
    });
    assert!(barrier.all_required_published());
    barrier.reset();
    assert!(!barrier.all_required_published());
    assert_eq!(barrier.flags(), PublishFlags::EMPTY);
}

#[test]
fn every_activity_sleeps_but_only_one_closes_the_cycle() {
    let barrier = PublishBarrier::default();
    let power = forced();
    let start = StartLine::new(SensorCategory::ALL.len());

    let statuses: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = SensorCategory::ALL
            .into_iter()
            .map(|c| {
                let (barrier, power, start) = (&barrier, &power, &start);
                s.spawn(move || {
                    let clock = ManualClock::new();
                    let epoch = barrier.report_published(c);
                    start.wait();
                    power.wait(Duration::from_secs(60), Some(epoch), barrier, &clock)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for report in &statuses {
        assert_eq!(report.strategy, WaitStrategy::LowPower);
        assert!(matches!(
            report.barrier,
            Some(BarrierStatus::Complete | BarrierStatus::ClosedByPeer)
        ));
    }
    assert!(statuses.iter().any(|r| r.barrier == Some(BarrierStatus::Complete)));
    // One cycle, closed exactly once.
    assert_eq!(barrier.epoch(), 1);
    assert!(barrier.flags().is_empty());
    assert_eq!(power.report_stats().sleep_count, 3);
}

#[test]
fn missing_activity_delays_sleep_by_poll_budget() {
    let barrier = PublishBarrier::default();
    let power = forced();
    let clock = ManualClock::new();
    let epoch = barrier.report_published(SensorCategory::Dht);
    barrier.report_published(SensorCategory::Uv);

    let report = power.wait(Duration::from_secs(600), Some(epoch), &barrier, &clock);

    assert_eq!(
        report.barrier,
        Some(BarrierStatus::TimedOut(PublishFlags::EMPTY.with(SensorCategory::Soil)))
    );
    // 30 × 500 ms of polling, then settle, then d − settle.
    assert_eq!(
        clock.total_slept(),
        Duration::from_secs(15) + SETTLE_DELAY + Duration::from_secs(599)
    );
    assert_eq!(report.slept, Duration::from_secs(599));
}

#[test]
fn late_report_after_close_counts_for_next_cycle() {
    let barrier = PublishBarrier::default();
    let power = forced();
    let clock = ManualClock::new();
    for c in SensorCategory::ALL {
        barrier.report_published(c);
    }

    power.wait(Duration::from_secs(60), Some(0), &barrier, &clock);
    let late = barrier.report_published(SensorCategory::Uv);

    assert_eq!(late, 1);
    assert!(barrier.flags().contains(SensorCategory::Uv));
    assert!(!barrier.all_required_published());
}

#[test]
fn reduced_required_set_completes_without_disabled_sensor() {
    let required = PublishFlags::EMPTY
        .with(SensorCategory::Dht)
        .with(SensorCategory::Soil);
    let barrier = PublishBarrier::new(required);
    let power = forced();
    let clock = ManualClock::new();
    barrier.report_published(SensorCategory::Dht);
    let epoch = barrier.report_published(SensorCategory::Soil);

    let report = power.wait(Duration::from_secs(60), Some(epoch), &barrier, &clock);

    assert_eq!(report.barrier, Some(BarrierStatus::Complete));
    assert_eq!(clock.sleeps(), vec![SETTLE_DELAY, Duration::from_secs(59)]);
}

#[test]
fn toggling_policy_switches_strategy_between_cycles() {
    let barrier = PublishBarrier::default();
    let power = PowerManager::default();
    let clock = ManualClock::new();
    let d = Duration::from_secs(900);

    assert_eq!(power.wait(d, None, &barrier, &clock).strategy, WaitStrategy::Timed);
    power.set_enabled(true);
    assert_eq!(power.decide(d), WaitStrategy::LowPower);
    power.set_mode(PowerMode::Normal);
    assert_eq!(power.decide(d), WaitStrategy::Timed);
}
