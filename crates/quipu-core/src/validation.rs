use crate::config::{EventRule, RunConfig};
use crate::error::{Error, Result};

/// Validate a run configuration before any work begins.
///
/// This checks:
/// - window ordering
/// - demand model positivity and finiteness
/// - event calendar fields
/// - budget threshold ordering and batch-sizing bounds
pub fn validate_config(config: &RunConfig) -> Result<()> {
    let window = &config.window;
    if window.end_date < window.start_date {
        return Err(Error::InvalidConfig(format!(
            "end date {} precedes start date {}",
            window.end_date, window.start_date
        )));
    }

    let demand = &config.demand;
    if !demand.base_daily_rate.is_finite() || demand.base_daily_rate <= 0.0 {
        return Err(Error::InvalidConfig(format!(
            "base_daily_rate must be positive and finite, got {}",
            demand.base_daily_rate
        )));
    }
    if demand.annual_growth < 0.0 || !demand.annual_growth.is_finite() {
        return Err(Error::InvalidConfig(format!(
            "annual_growth must be non-negative and finite, got {}",
            demand.annual_growth
        )));
    }
    if !(0.0..1.0).contains(&demand.seasonality_amplitude) {
        return Err(Error::InvalidConfig(format!(
            "seasonality_amplitude must be in [0, 1), got {}",
            demand.seasonality_amplitude
        )));
    }
    if demand.seasonality_peak_day == 0 || demand.seasonality_peak_day > 366 {
        return Err(Error::InvalidConfig(format!(
            "seasonality_peak_day must be in 1..=366, got {}",
            demand.seasonality_peak_day
        )));
    }
    for (weekday, weight) in demand.weekly_weights.iter().enumerate() {
        if !weight.is_finite() || *weight <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "weekly weight for weekday {weekday} must be positive, got {weight}"
            )));
        }
    }
    let shock = &demand.shock;
    if !(shock.min > 0.0 && shock.min <= shock.max && shock.max.is_finite()) {
        return Err(Error::InvalidConfig(format!(
            "shock bounds must satisfy 0 < min <= max, got [{}, {}]",
            shock.min, shock.max
        )));
    }

    for event in &demand.events {
        validate_event(event)?;
    }

    let limits = &config.limits;
    if limits.ram_budget_bytes == 0 {
        return Err(Error::InvalidConfig("ram_budget_bytes must be positive".to_string()));
    }
    if limits.max_output_bytes == 0 {
        return Err(Error::InvalidConfig("max_output_bytes must be positive".to_string()));
    }
    if limits.batch_floor == 0 {
        return Err(Error::InvalidConfig("batch_floor must be at least 1".to_string()));
    }
    if limits.batch_floor > limits.batch_ceiling {
        return Err(Error::InvalidConfig(format!(
            "batch_floor {} exceeds batch_ceiling {}",
            limits.batch_floor, limits.batch_ceiling
        )));
    }
    if limits.hysteresis_samples == 0 {
        return Err(Error::InvalidConfig(
            "hysteresis_samples must be at least 1".to_string(),
        ));
    }
    if limits.growth_factor < 1.0 {
        return Err(Error::InvalidConfig(format!(
            "growth_factor must be >= 1.0, got {}",
            limits.growth_factor
        )));
    }

    let thresholds = &limits.thresholds;
    let ordered = 0.0 < thresholds.observation
        && thresholds.observation < thresholds.throttle
        && thresholds.throttle < thresholds.abort
        && thresholds.abort <= thresholds.system_stop
        && thresholds.system_stop <= 1.0;
    if !ordered {
        return Err(Error::InvalidConfig(format!(
            "thresholds must satisfy 0 < observation < throttle < abort <= system_stop <= 1, \
             got {:.2}/{:.2}/{:.2}/{:.2}",
            thresholds.observation, thresholds.throttle, thresholds.abort, thresholds.system_stop
        )));
    }

    Ok(())
}

fn validate_event(event: &EventRule) -> Result<()> {
    let (month, day, multipliers): (u32, u32, Vec<f64>) = match event {
        EventRule::FixedDate {
            month,
            day,
            multiplier,
        } => (*month, *day, vec![*multiplier]),
        EventRule::NthWeekday {
            month,
            weekday,
            nth,
            multiplier,
        } => {
            if *weekday > 6 {
                return Err(Error::InvalidConfig(format!(
                    "event weekday must be 0..=6 (Monday first), got {weekday}"
                )));
            }
            if *nth == 0 || *nth > 5 {
                return Err(Error::InvalidConfig(format!(
                    "event nth must be 1..=5, got {nth}"
                )));
            }
            (*month, 1, vec![*multiplier])
        }
        EventRule::Ramp {
            month,
            day,
            days_before,
            start_multiplier,
            peak_multiplier,
        } => {
            if *days_before == 0 {
                return Err(Error::InvalidConfig(
                    "ramp days_before must be at least 1".to_string(),
                ));
            }
            (*month, *day, vec![*start_multiplier, *peak_multiplier])
        }
    };

    if month == 0 || month > 12 {
        return Err(Error::InvalidConfig(format!(
            "event month must be 1..=12, got {month}"
        )));
    }
    if day == 0 || day > 31 {
        return Err(Error::InvalidConfig(format!(
            "event day must be 1..=31, got {day}"
        )));
    }
    for multiplier in multipliers {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "event multiplier must be positive and finite, got {multiplier}"
            )));
        }
    }

    Ok(())
}
