//! End-to-end properties of scenario simulation.

mod common;

use balance_sim::Error;
use balance_sim::scenario::ScenarioBuilder;
use balance_sim::sim::{FlexibilityWindow, simulate, summarize};
use chrono::TimeDelta;

const TOL: f64 = 1e-6;

#[test]
fn imports_and_exports_are_exclusive_and_non_negative() {
    let config = common::mixed_builder(3)
        .has_battery(true)
        .battery_capacity(4000.0)
        .has_flexibility(true)
        .flex_ratio(0.2)
        .build()
        .unwrap();
    let results = simulate(&config).unwrap();

    for (imp, exp) in results
        .imported_power
        .values()
        .iter()
        .zip(results.exported_power.values())
    {
        assert!(*imp >= 0.0 && *exp >= 0.0);
        assert!(*imp == 0.0 || *exp == 0.0, "import {imp} and export {exp}");
    }
}

#[test]
fn balance_closes_at_every_timestep() {
    let config = common::mixed_builder(2)
        .has_battery(true)
        .battery_capacity(2500.0)
        .build()
        .unwrap();
    let results = simulate(&config).unwrap();

    // production + import == consumption + export
    let lhs = results
        .total_production
        .try_add(&results.imported_power)
        .unwrap();
    let rhs = results
        .total_consumption
        .try_add(&results.exported_power)
        .unwrap();
    for (a, b) in lhs.values().iter().zip(rhs.values()) {
        assert!((a - b).abs() < TOL);
    }
}

#[test]
fn battery_energy_is_conserved() {
    let config = common::mixed_builder(4)
        .has_battery(true)
        .battery_capacity(6000.0)
        .build()
        .unwrap();
    let results = simulate(&config).unwrap();
    let trace = results.battery.as_ref().unwrap();
    assert_eq!(results.battery_capacity_wh(), Some(6000.0));

    let removed = results
        .production_before_storage
        .try_sub(&results.total_production)
        .unwrap()
        .sum();
    assert!((removed - trace.power.sum()).abs() < TOL);
    assert!(
        trace
            .state_of_charge
            .values()
            .iter()
            .all(|&soc| (0.0..=6000.0).contains(&soc))
    );
}

#[test]
fn storage_reduces_imports() {
    let without = common::mixed_builder(3).build().unwrap();
    let with = without
        .to_builder()
        .has_battery(true)
        .battery_capacity(5000.0)
        .build()
        .unwrap();
    let m_without = summarize(&simulate(&without).unwrap()).unwrap();
    let m_with = summarize(&simulate(&with).unwrap()).unwrap();
    assert!(m_with.imported_power <= m_without.imported_power + TOL);
    assert!(m_with.exported_power <= m_without.exported_power + TOL);
    assert_eq!(m_without.storage_use, 1.0);
    assert!(m_with.storage_use > 0.0 && m_with.storage_use <= 1.0);
}

#[test]
fn flexibility_conserves_daily_energy() {
    let config = common::mixed_builder(5)
        .has_flexibility(true)
        .flex_ratio(0.5)
        .build()
        .unwrap();
    let results = simulate(&config).unwrap();

    let before = &results.consumption_before_flexibility;
    let after = &results.total_consumption;
    for day in 0..5 {
        let begin = common::start() + TimeDelta::days(day);
        let end = begin + TimeDelta::days(1);
        let b = before.slice_window(Some(begin), Some(end)).sum();
        let a = after.slice_window(Some(begin), Some(end)).sum();
        assert!((a - b).abs() < 1e-6 * b.max(1.0), "day {day}: {a} vs {b}");
    }
    assert_eq!(results.flexibility_usage.len(), 5);
    assert!(
        results
            .flexibility_usage
            .values()
            .iter()
            .all(|&u| (0.0..=1.0).contains(&u))
    );
}

#[test]
fn daily_and_24h_bucket_windows_agree() {
    let daily = common::mixed_builder(3)
        .has_flexibility(true)
        .flex_ratio(0.3)
        .build()
        .unwrap();
    let bucketed = daily
        .to_builder()
        .flexibility_window(FlexibilityWindow::Fixed(TimeDelta::hours(24)))
        .build()
        .unwrap();
    let a = simulate(&daily).unwrap();
    let b = simulate(&bucketed).unwrap();
    assert_eq!(a.total_consumption, b.total_consumption);
    assert_eq!(a.flexibility_usage, b.flexibility_usage);
}

#[test]
fn flexibility_lowers_peak_deficit() {
    let rigid = common::mixed_builder(3).build().unwrap();
    let flexible = rigid
        .to_builder()
        .has_flexibility(true)
        .flex_ratio(0.4)
        .build()
        .unwrap();
    let m_rigid = summarize(&simulate(&rigid).unwrap()).unwrap();
    let m_flex = summarize(&simulate(&flexible).unwrap()).unwrap();
    assert!(m_flex.import_max <= m_rigid.import_max + TOL);
    assert_eq!(m_rigid.flexibility_use, 0.0);
    assert!(m_flex.flexibility_use > 0.0);
}

#[test]
fn coverage_and_pointwise_coverage_differ() {
    // consumption flat, production not proportional to it
    let config = ScenarioBuilder::new()
        .consumer(common::hourly(&[2.0, 2.0, 2.0, 2.0]))
        .consumer_contrib(vec![1.0])
        .has_bioenergy(true)
        .bioenergy_scaling(false)
        .bioenergy_curve(common::hourly(&[1.0, 3.0, 1.0, 3.0]))
        .build()
        .unwrap();
    let metrics = summarize(&simulate(&config).unwrap()).unwrap();
    assert!((metrics.coverage - 1.0).abs() < 1e-12);
    assert!((metrics.coverage_avg - 4.0 / 3.0).abs() < 1e-12);
}

#[test]
fn windowed_and_smoothed_results() {
    let config = common::mixed_builder(2)
        .has_battery(true)
        .battery_capacity(3000.0)
        .build()
        .unwrap();
    let results = simulate(&config).unwrap();

    let begin = common::start() + TimeDelta::hours(6);
    let end = common::start() + TimeDelta::hours(18);
    let window = results.slice_window(Some(begin), Some(end));
    assert_eq!(window.total_consumption.len(), 12);
    assert_eq!(window.battery.as_ref().unwrap().power.len(), 12);
    assert_eq!(window.total_consumption.start(), Some(begin));
    // slicing leaves the full results untouched
    assert_eq!(results.total_consumption.len(), 48);

    let smooth = results.rolling_average(4).unwrap();
    assert_eq!(smooth.imported_power.len(), 45);
    assert_eq!(smooth.battery.as_ref().unwrap().state_of_charge.len(), 45);
    assert!(matches!(results.rolling_average(0), Err(Error::Domain(_))));
}

#[test]
fn cloned_configs_simulate_concurrently() {
    let config = common::mixed_builder(2)
        .has_battery(true)
        .battery_capacity(2000.0)
        .has_flexibility(true)
        .flex_ratio(0.1)
        .build()
        .unwrap();
    let expected = simulate(&config).unwrap();

    let outputs: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cfg = config.clone();
                scope.spawn(move || simulate(&cfg))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker thread"))
            .collect()
    });
    for out in outputs {
        assert_eq!(out.unwrap(), expected);
    }
}
