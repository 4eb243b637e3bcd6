//! Simulation orchestrator composing aggregation, flexibility and storage.

use tracing::{debug, warn};

use crate::error::Result;
use crate::scenario::ScenarioConfig;

use super::flexibility::{self, FlexibilityWindow};
use super::results::SimResults;

/// Runs one scenario and returns every derived curve.
///
/// The run is a pure function of `config`: it holds no state between calls,
/// so clones of one config can be simulated concurrently.
///
/// Steps, in order:
/// 1. Sum the weighted consumer curves.
/// 2. Sum the enabled generation sources, each scaled when configured.
/// 3. Shift demand within flexibility windows using the first consumer's
///    flex ratio.
/// 4. Let the battery absorb the production surplus and cover deficits.
/// 5. Split the remaining balance into imports and exports.
///
/// # Errors
///
/// Propagates [`crate::Error::Alignment`] or [`crate::Error::Domain`] from
/// the series operations. A config built by
/// [`ScenarioBuilder`](crate::scenario::ScenarioBuilder) never triggers them.
pub fn simulate(config: &ScenarioConfig) -> Result<SimResults> {
    let consumption = config.consumption_curve()?;
    debug!(
        consumers = config.consumers().len(),
        average_w = consumption.average(),
        "aggregated consumption"
    );

    let production = config.production_curve()?;
    debug!(
        sources = config.sources().count(),
        average_w = production.average(),
        "aggregated production"
    );

    let (total_consumption, flexibility_usage) = match config.flexibility() {
        Some(window) => {
            let ratio = first_flex_ratio(config);
            let outcome = flexibility::shift(&production, &consumption, ratio, window)?;
            debug!(ratio, ?window, "applied demand flexibility");
            (outcome.consumption, outcome.usage)
        }
        None => {
            let idle = flexibility::shift(
                &production,
                &consumption,
                0.0,
                FlexibilityWindow::CalendarDay,
            )?;
            (consumption.clone(), idle.usage)
        }
    };

    let surplus = production.try_sub(&total_consumption)?;
    let battery = config.battery().map(|b| b.dispatch(&surplus));
    let total_production = match &battery {
        Some(trace) => {
            debug!(
                capacity_wh = trace.capacity_wh,
                charged_wh = trace.power.bigger_than(0.0).sum(),
                "dispatched battery"
            );
            production.try_sub(&trace.power)?
        }
        None => production.clone(),
    };

    let exported_power = total_production
        .try_sub(&total_consumption)?
        .bigger_than(0.0);
    let imported_power = total_consumption
        .try_sub(&total_production)?
        .bigger_than(0.0);

    Ok(SimResults {
        total_consumption,
        consumption_before_flexibility: consumption,
        production_before_storage: production,
        total_production,
        imported_power,
        exported_power,
        flexibility_usage,
        battery,
    })
}

fn first_flex_ratio(config: &ScenarioConfig) -> f64 {
    let ratios: Vec<f64> = config.consumers().iter().map(|c| c.flex_ratio).collect();
    let first = ratios.first().copied().unwrap_or(0.0);
    if ratios.iter().any(|&r| r != first) {
        warn!(
            ?ratios,
            used = first,
            "consumers carry different flex ratios; only the first is applied"
        );
    }
    first
}
