use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson};
use tracing::info;

use quipu_core::{DemandModel, Error, EventRule, Result, SimulationWindow};

use crate::seed::SeedDerivation;

const DAYS_PER_YEAR: f64 = 365.25;
const TWO_PI: f64 = std::f64::consts::TAU;

/// Stream scope for schedule-level draws; the schedule belongs to the
/// domain, not to any one of its tables.
const SCHEDULE_TABLE: &str = "events";

/// One simulated day: expected volume, sampled volume, and the global
/// row-index range it owns.
#[derive(Debug, Clone)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub lambda: f64,
    pub rows: u64,
    pub start_index: u64,
    pub end_index: u64,
}

/// Immutable day-by-day production schedule. The cumulative ranges
/// partition `[0, total_rows)` in strictly increasing date order.
#[derive(Debug, Clone)]
pub struct DaySchedule {
    entries: Vec<DayEntry>,
    total_rows: u64,
}

impl DaySchedule {
    pub fn entries(&self) -> &[DayEntry] {
        &self.entries
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a global row index to the day that owns it.
    pub fn day_for_index(&self, index: u64) -> Option<&DayEntry> {
        if index >= self.total_rows {
            return None;
        }
        let pos = self.entries.partition_point(|entry| entry.end_index <= index);
        self.entries.get(pos)
    }

    /// Defensive partition check. A violation indicates a logic defect and
    /// is reported with the offending range.
    pub fn validate(&self) -> Result<()> {
        let mut cursor = 0_u64;
        let mut previous_date: Option<NaiveDate> = None;

        for entry in &self.entries {
            if let Some(previous) = previous_date {
                if entry.date <= previous {
                    return Err(Error::Internal(format!(
                        "schedule dates not strictly increasing at {}",
                        entry.date
                    )));
                }
            }
            if entry.start_index != cursor || entry.end_index < entry.start_index {
                return Err(Error::Internal(format!(
                    "schedule range {}..{} for {} does not continue partition at {}",
                    entry.start_index, entry.end_index, entry.date, cursor
                )));
            }
            if entry.end_index - entry.start_index != entry.rows {
                return Err(Error::Internal(format!(
                    "schedule range {}..{} for {} disagrees with row count {}",
                    entry.start_index, entry.end_index, entry.date, entry.rows
                )));
            }
            cursor = entry.end_index;
            previous_date = Some(entry.date);
        }

        if cursor != self.total_rows {
            return Err(Error::Internal(format!(
                "schedule partition ends at {} but total_rows is {}",
                cursor, self.total_rows
            )));
        }

        Ok(())
    }
}

/// Computes the day-by-day production schedule from the demand model.
pub struct DemandCalendar<'a> {
    demand: &'a DemandModel,
    seeds: SeedDerivation,
    domain: &'a str,
}

impl<'a> DemandCalendar<'a> {
    pub fn new(demand: &'a DemandModel, seeds: SeedDerivation, domain: &'a str) -> Self {
        Self {
            demand,
            seeds,
            domain,
        }
    }

    /// Build the schedule for a window. Computed once per run.
    ///
    /// `lambda(d) = base * trend(d) * seasonality(d) * weekly(weekday(d))
    ///              * event(d) * shock(d)`
    pub fn build(&self, window: &SimulationWindow) -> Result<DaySchedule> {
        let events = expand_events(window, &self.demand.events);
        let mut entries = Vec::with_capacity(window.days().max(0) as usize);
        let mut cursor = 0_u64;

        let mut date = window.start_date;
        while date <= window.end_date {
            let ordinal = (date - window.start_date).num_days() as u64;
            let lambda = self.lambda_for(date, window.start_date, &events, ordinal)?;

            let mut rng = self
                .seeds
                .stream(self.domain, SCHEDULE_TABLE, "daily-count", ordinal);
            let rows = sample_count(lambda, &mut rng);

            entries.push(DayEntry {
                date,
                lambda,
                rows,
                start_index: cursor,
                end_index: cursor + rows,
            });
            cursor += rows;

            date = date
                .succ_opt()
                .ok_or_else(|| Error::Internal(format!("calendar overflow after {date}")))?;
        }

        info!(
            domain = self.domain,
            days = entries.len(),
            total_rows = cursor,
            "demand schedule built"
        );

        Ok(DaySchedule {
            entries,
            total_rows: cursor,
        })
    }

    fn lambda_for(
        &self,
        date: NaiveDate,
        start: NaiveDate,
        events: &BTreeMap<NaiveDate, f64>,
        ordinal: u64,
    ) -> Result<f64> {
        let demand = self.demand;
        let elapsed_days = (date - start).num_days() as f64;

        let trend = 1.0 + demand.annual_growth * elapsed_days / DAYS_PER_YEAR;
        let phase = (date.ordinal() as f64 - demand.seasonality_peak_day as f64) / DAYS_PER_YEAR;
        let seasonality = 1.0 + demand.seasonality_amplitude * (TWO_PI * phase).cos();
        let weekly = demand.weekly_weights[date.weekday().num_days_from_monday() as usize];
        let event = events.get(&date).copied().unwrap_or(1.0);

        let mut rng = self.seeds.stream(self.domain, SCHEDULE_TABLE, "shock", ordinal);
        let shock = if demand.shock.min < demand.shock.max {
            rng.random_range(demand.shock.min..=demand.shock.max)
        } else {
            demand.shock.min
        };

        let lambda = demand.base_daily_rate * trend * seasonality * weekly * event * shock;
        if !lambda.is_finite() {
            return Err(Error::Internal(format!(
                "non-finite expected volume for {date}"
            )));
        }
        Ok(lambda.max(0.0))
    }
}

/// Poisson draw with mean `lambda`; degenerate means force a count of zero.
fn sample_count(lambda: f64, rng: &mut ChaCha8Rng) -> u64 {
    if !lambda.is_finite() || lambda <= 0.0 {
        return 0;
    }
    match Poisson::new(lambda) {
        Ok(poisson) => {
            let draw: f64 = poisson.sample(rng);
            draw.max(0.0) as u64
        }
        Err(_) => 0,
    }
}

/// Expand the event calendar over every year the window touches.
/// Overlapping events keep the MAXIMUM multiplier, never the product.
fn expand_events(
    window: &SimulationWindow,
    rules: &[EventRule],
) -> BTreeMap<NaiveDate, f64> {
    let mut multipliers = BTreeMap::new();

    for year in window.start_date.year()..=window.end_date.year() {
        for rule in rules {
            match rule {
                EventRule::FixedDate {
                    month,
                    day,
                    multiplier,
                } => {
                    if let Some(date) = NaiveDate::from_ymd_opt(year, *month, *day) {
                        apply_max(&mut multipliers, date, *multiplier);
                    }
                }
                EventRule::NthWeekday {
                    month,
                    weekday,
                    nth,
                    multiplier,
                } => {
                    if let Some(date) = nth_weekday(year, *month, *weekday, *nth) {
                        apply_max(&mut multipliers, date, *multiplier);
                    }
                }
                EventRule::Ramp {
                    month,
                    day,
                    days_before,
                    start_multiplier,
                    peak_multiplier,
                } => {
                    let Some(anchor) = NaiveDate::from_ymd_opt(year, *month, *day) else {
                        continue;
                    };
                    let slope =
                        (peak_multiplier - start_multiplier) / f64::from(*days_before);
                    for step in 0..=*days_before {
                        let date = anchor - Duration::days(i64::from(days_before - step));
                        let factor = start_multiplier + slope * f64::from(step);
                        apply_max(&mut multipliers, date, factor);
                    }
                }
            }
        }
    }

    multipliers
}

fn apply_max(multipliers: &mut BTreeMap<NaiveDate, f64>, date: NaiveDate, factor: f64) {
    let entry = multipliers.entry(date).or_insert(factor);
    if factor > *entry {
        *entry = factor;
    }
}

/// Date of the nth occurrence of a weekday (0 = Monday) in a month.
fn nth_weekday(year: i32, month: u32, weekday: u8, nth: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let first_weekday = first.weekday().num_days_from_monday() as u8;
    let offset = (weekday + 7 - first_weekday) % 7;
    let day = 1 + u32::from(offset) + 7 * (nth - 1);
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    (date.month() == month).then_some(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quipu_core::ShockJitter;
    use rand::SeedableRng;

    fn flat_demand(base: f64) -> DemandModel {
        DemandModel {
            base_daily_rate: base,
            annual_growth: 0.0,
            seasonality_amplitude: 0.0,
            seasonality_peak_day: 45,
            weekly_weights: [1.0; 7],
            events: Vec::new(),
            shock: ShockJitter { min: 1.0, max: 1.0 },
        }
    }

    fn window(start: (i32, u32, u32), end: (i32, u32, u32)) -> SimulationWindow {
        SimulationWindow::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
    }

    #[test]
    fn seven_day_flat_schedule_is_reproducible() {
        let demand = flat_demand(100.0);
        let window = window((2024, 1, 1), (2024, 1, 7));
        let calendar = DemandCalendar::new(&demand, SeedDerivation::new(42), "sales");

        let first = calendar.build(&window).unwrap();
        let second = calendar.build(&window).unwrap();

        assert_eq!(first.len(), 7);
        assert_eq!(first.total_rows(), second.total_rows());
        for (a, b) in first.entries().iter().zip(second.entries()) {
            assert_eq!(a.rows, b.rows);
            assert_eq!(a.start_index, b.start_index);
        }
        assert!(first.validate().is_ok());
    }

    #[test]
    fn leap_year_window_enumerates_every_day() {
        let demand = flat_demand(10.0);
        let window = window((2024, 1, 1), (2024, 12, 31));
        let calendar = DemandCalendar::new(&demand, SeedDerivation::new(42), "sales");

        let schedule = calendar.build(&window).unwrap();
        assert_eq!(schedule.len(), 366);
        assert!(schedule
            .entries()
            .iter()
            .any(|entry| entry.date == NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
    }

    #[test]
    fn degenerate_lambda_samples_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(sample_count(0.0, &mut rng), 0);
        assert_eq!(sample_count(-3.0, &mut rng), 0);
        assert_eq!(sample_count(f64::NAN, &mut rng), 0);
    }

    #[test]
    fn poisson_mean_converges_for_large_lambda() {
        let lambda = 400.0;
        let seeds = SeedDerivation::new(42);
        let draws = 300_u64;
        let mut total = 0_u64;
        for index in 0..draws {
            let mut rng = seeds.stream("sales", "events", "daily-count", index);
            total += sample_count(lambda, &mut rng);
        }
        let mean = total as f64 / draws as f64;
        assert!(
            (mean - lambda).abs() < lambda * 0.02,
            "mean {mean} strayed from lambda {lambda}"
        );
    }

    #[test]
    fn day_for_index_respects_partition() {
        let demand = flat_demand(50.0);
        let window = window((2024, 3, 1), (2024, 3, 10));
        let calendar = DemandCalendar::new(&demand, SeedDerivation::new(9), "sales");
        let schedule = calendar.build(&window).unwrap();

        schedule.validate().unwrap();
        for entry in schedule.entries() {
            if entry.rows == 0 {
                continue;
            }
            assert_eq!(
                schedule.day_for_index(entry.start_index).unwrap().date,
                entry.date
            );
            assert_eq!(
                schedule.day_for_index(entry.end_index - 1).unwrap().date,
                entry.date
            );
        }
        assert!(schedule.day_for_index(schedule.total_rows()).is_none());
    }

    #[test]
    fn overlapping_events_take_maximum() {
        let window = window((2024, 7, 1), (2024, 7, 31));
        let rules = vec![
            EventRule::FixedDate {
                month: 7,
                day: 28,
                multiplier: 1.8,
            },
            EventRule::Ramp {
                month: 7,
                day: 28,
                days_before: 13,
                start_multiplier: 1.2,
                peak_multiplier: 2.5,
            },
        ];
        let events = expand_events(&window, &rules);
        let anchor = NaiveDate::from_ymd_opt(2024, 7, 28).unwrap();
        assert_eq!(events.get(&anchor).copied(), Some(2.5));
    }

    #[test]
    fn nth_weekday_finds_second_sunday_of_may() {
        let date = nth_weekday(2024, 5, 6, 2).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 12).unwrap());
    }

    #[test]
    fn ramp_is_linear_up_to_anchor() {
        let window = window((2024, 12, 1), (2024, 12, 31));
        let rules = vec![EventRule::Ramp {
            month: 12,
            day: 24,
            days_before: 3,
            start_multiplier: 1.0,
            peak_multiplier: 4.0,
        }];
        let events = expand_events(&window, &rules);
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 12, d).unwrap();
        assert_eq!(events.get(&day(21)).copied(), Some(1.0));
        assert_eq!(events.get(&day(22)).copied(), Some(2.0));
        assert_eq!(events.get(&day(23)).copied(), Some(3.0));
        assert_eq!(events.get(&day(24)).copied(), Some(4.0));
    }
}
