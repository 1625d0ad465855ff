use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::Path;

use chrono::Duration;
use sha2::{Digest, Sha256};

use quipu_core::{
    ChaosLevel, ColumnKind, ColumnSpec, DatePair, ForeignKeyTarget, IdSpace, ResourceLimits, Row,
    RunConfig, ShockJitter, SimulationWindow, TableSpec, TableVolume, Value,
};
use quipu_engine::{
    Batch, CsvSink, DaySchedule, DomainHandler, EngineError, HeuristicEstimator, MemoryProbe,
    MemoryReading, MemorySink, ResourceBudget, RunOrchestrator, Sink, SinkAck, Strategy, Tier,
};

struct ScriptedProbe {
    budget: u64,
    fractions: Vec<f64>,
    cursor: usize,
}

impl ScriptedProbe {
    fn new(budget: u64, fractions: Vec<f64>) -> Self {
        Self {
            budget,
            fractions,
            cursor: 0,
        }
    }
}

impl MemoryProbe for ScriptedProbe {
    fn read(&mut self) -> MemoryReading {
        let fraction = self
            .fractions
            .get(self.cursor)
            .copied()
            .unwrap_or_else(|| *self.fractions.last().unwrap_or(&0.0));
        self.cursor += 1;
        MemoryReading {
            process_used_bytes: (fraction * self.budget as f64) as u64,
            system_used_fraction: 0.2,
        }
    }
}

struct TestDomain {
    tables: Vec<TableSpec>,
    regions: u64,
}

impl TestDomain {
    fn new(regions: u64) -> Self {
        let dimension = {
            let mut spec = TableSpec::new(
                "regions",
                vec![
                    ColumnSpec::new("region_id", ColumnKind::Int),
                    ColumnSpec::new("name", ColumnKind::Text),
                ],
                TableVolume::Fixed(regions),
                24,
            );
            spec.key_column = Some(0);
            spec.text_noise = vec![1];
            spec
        };

        let fact = {
            let mut spec = TableSpec::new(
                "orders",
                vec![
                    ColumnSpec::new("order_id", ColumnKind::Int),
                    ColumnSpec::new("order_date", ColumnKind::Date),
                    ColumnSpec::new("ship_date", ColumnKind::Date),
                    ColumnSpec::new("region_id", ColumnKind::Int),
                    ColumnSpec::new("note", ColumnKind::Text),
                ],
                TableVolume::PerEvent,
                56,
            );
            spec.key_column = Some(0);
            spec.nullable = vec![4];
            spec.text_noise = vec![4];
            spec.foreign_keys = vec![ForeignKeyTarget {
                column: 3,
                referenced_table: "regions".to_string(),
                id_space: IdSpace::Fixed(regions),
            }];
            spec.date_pairs = vec![DatePair {
                earlier: 1,
                later: 2,
            }];
            spec
        };

        Self {
            tables: vec![dimension, fact],
            regions,
        }
    }
}

impl DomainHandler for TestDomain {
    fn name(&self) -> &str {
        "testbed"
    }

    fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    fn materialize(
        &self,
        table: &str,
        range: Range<u64>,
        schedule: &DaySchedule,
    ) -> Result<Vec<Row>, EngineError> {
        let rows = match table {
            "regions" => range
                .map(|index| {
                    vec![
                        Value::Int(index as i64),
                        Value::Text(format!("region-{index}")),
                    ]
                })
                .collect(),
            "orders" => range
                .map(|index| {
                    let day = schedule.day_for_index(index).expect("index in schedule");
                    vec![
                        Value::Int(index as i64),
                        Value::Date(day.date),
                        Value::Date(day.date + Duration::days(2)),
                        Value::Int(((index * 7 + 3) % self.regions) as i64),
                        Value::Text(format!("note-{index}")),
                    ]
                })
                .collect(),
            other => return Err(EngineError::UnknownTable(other.to_string())),
        };
        Ok(rows)
    }
}

fn config(window_days: u32, base_rate: f64, level: Option<ChaosLevel>) -> RunConfig {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = start + Duration::days(i64::from(window_days) - 1);
    let mut config = RunConfig::new(SimulationWindow::new(start, end));
    config.demand.base_daily_rate = base_rate;
    config.demand.annual_growth = 0.0;
    config.demand.seasonality_amplitude = 0.0;
    config.demand.weekly_weights = [1.0; 7];
    config.demand.shock = ShockJitter { min: 1.0, max: 1.0 };
    config.chaos.global_seed = 42;
    config.chaos.level = level;
    config.limits = ResourceLimits {
        batch_floor: 8,
        batch_ceiling: 64,
        ..ResourceLimits::default()
    };
    config
}

fn run_with(
    config: RunConfig,
    fractions: Vec<f64>,
    sink: &mut dyn Sink,
) -> quipu_engine::RunOutcome {
    let probe = ScriptedProbe::new(config.limits.ram_budget_bytes, fractions);
    let budget = ResourceBudget::new(&config.limits, Box::new(probe));
    let mut orchestrator = RunOrchestrator::new(config, budget, Box::new(HeuristicEstimator));
    let domain = TestDomain::new(5);
    orchestrator.run(&domain, sink).expect("run succeeds")
}

fn hash_file(path: &Path) -> String {
    let mut file = File::open(path).expect("open csv");
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = file.read(&mut buffer).expect("read csv");
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    hex::encode(hasher.finalize())
}

#[test]
fn monolithic_and_batched_runs_are_byte_identical() {
    // Monolithic: threshold far above the total.
    let mut mono_config = config(7, 40.0, Some(ChaosLevel::High));
    mono_config.limits.monolithic_threshold = u64::MAX;
    let mut mono_sink = MemorySink::new();
    let mono = run_with(mono_config, vec![0.1], &mut mono_sink);
    assert_eq!(mono.strategy, Strategy::Monolithic);

    // Batched with a memory history that keeps resizing the batch.
    let mut batched_config = config(7, 40.0, Some(ChaosLevel::High));
    batched_config.limits.monolithic_threshold = 0;
    let mut batched_sink = MemorySink::new();
    let batched = run_with(
        batched_config,
        vec![0.1, 0.85, 0.1, 0.85, 0.1, 0.1, 0.1],
        &mut batched_sink,
    );
    assert_eq!(batched.strategy, Strategy::Batched);
    assert!(!batched.aborted);

    assert_eq!(mono.events_total, batched.events_total);
    assert_eq!(mono.rows_emitted, batched.rows_emitted);
    for table in ["regions", "orders"] {
        assert_eq!(
            mono_sink.rows(table),
            batched_sink.rows(table),
            "table {table} differs between strategies"
        );
    }
}

#[test]
fn csv_output_matches_across_strategies() {
    let out_a = std::env::temp_dir().join(format!("quipu_golden_{}", uuid::Uuid::new_v4()));
    let out_b = std::env::temp_dir().join(format!("quipu_golden_{}", uuid::Uuid::new_v4()));

    let mut mono_config = config(7, 40.0, Some(ChaosLevel::Medium));
    mono_config.limits.monolithic_threshold = u64::MAX;
    let mut mono_sink = CsvSink::new(out_a.clone());
    run_with(mono_config, vec![0.1], &mut mono_sink);

    let mut batched_config = config(7, 40.0, Some(ChaosLevel::Medium));
    batched_config.limits.monolithic_threshold = 0;
    let mut batched_sink = CsvSink::new(out_b.clone());
    run_with(batched_config, vec![0.85, 0.1, 0.85, 0.1], &mut batched_sink);

    for table in ["regions", "orders"] {
        let hash_a = hash_file(&out_a.join(format!("{table}.csv")));
        let hash_b = hash_file(&out_b.join(format!("{table}.csv")));
        assert_eq!(hash_a, hash_b, "csv for {table} differs between strategies");
    }
}

#[test]
fn seeded_run_is_reproducible() {
    let mut first_sink = MemorySink::new();
    let first = run_with(config(7, 100.0, None), vec![0.1], &mut first_sink);

    let mut second_sink = MemorySink::new();
    let second = run_with(config(7, 100.0, None), vec![0.1], &mut second_sink);

    assert_eq!(first.events_total, second.events_total);
    assert_eq!(first_sink.rows("orders"), second_sink.rows("orders"));
}

#[test]
fn chaos_disabled_leaves_references_and_fields_intact() {
    let mut sink = MemorySink::new();
    run_with(config(7, 60.0, None), vec![0.1], &mut sink);

    for row in sink.rows("orders") {
        assert!(row.iter().all(|value| !value.is_null()));
        let Value::Int(region_id) = &row[3] else {
            panic!("region_id must stay an integer");
        };
        assert!((0..5).contains(region_id), "fk must reference a region");
    }
}

#[test]
fn immediate_abort_produces_checkpoint_zero() {
    let mut config = config(7, 40.0, None);
    config.limits.monolithic_threshold = 0;
    let mut sink = MemorySink::new();
    let outcome = run_with(config, vec![0.95], &mut sink);

    assert!(outcome.aborted);
    assert_eq!(outcome.final_tier, Tier::Abort);
    assert_eq!(outcome.checkpoint, Some(0));
    assert!(sink.rows("orders").is_empty());
    // Dimensions were confirmed before the abort and stay valid.
    assert_eq!(sink.rows("regions").len(), 5);
}

#[test]
fn mid_run_abort_preserves_confirmed_batches() {
    let mut config = config(7, 40.0, None);
    config.limits.monolithic_threshold = 0;
    let mut sink = MemorySink::new();
    let outcome = run_with(config, vec![0.1, 0.95], &mut sink);

    assert!(outcome.aborted);
    let checkpoint = outcome.checkpoint.expect("abort reports a checkpoint");
    assert!(checkpoint > 0);
    assert!(checkpoint < outcome.events_total);
    assert_eq!(sink.rows("orders").len() as u64, checkpoint);
    // The confirmed prefix is contiguous from zero.
    for (offset, row) in sink.rows("orders").iter().enumerate() {
        assert_eq!(row[0], Value::Int(offset as i64));
    }
}

#[test]
fn capacity_ceiling_refuses_before_any_work() {
    let mut config = config(7, 40.0, None);
    config.limits.max_output_bytes = 1;
    let probe = ScriptedProbe::new(config.limits.ram_budget_bytes, vec![0.1]);
    let budget = ResourceBudget::new(&config.limits, Box::new(probe));
    let mut orchestrator = RunOrchestrator::new(config, budget, Box::new(HeuristicEstimator));
    let domain = TestDomain::new(5);
    let mut sink = MemorySink::new();

    let err = orchestrator.run(&domain, &mut sink).expect_err("must refuse");
    assert!(matches!(
        err,
        EngineError::Core(quipu_core::Error::Capacity(_))
    ));
    assert!(sink.rows("regions").is_empty());
    assert!(sink.rows("orders").is_empty());
}

#[test]
fn invalid_window_fails_before_any_work() {
    let mut config = config(7, 40.0, None);
    config.window.end_date = config.window.start_date - Duration::days(1);
    let probe = ScriptedProbe::new(config.limits.ram_budget_bytes, vec![0.1]);
    let budget = ResourceBudget::new(&config.limits, Box::new(probe));
    let mut orchestrator = RunOrchestrator::new(config, budget, Box::new(HeuristicEstimator));
    let domain = TestDomain::new(5);
    let mut sink = MemorySink::new();

    let err = orchestrator.run(&domain, &mut sink).expect_err("must refuse");
    assert!(matches!(
        err,
        EngineError::Core(quipu_core::Error::InvalidConfig(_))
    ));
}

#[test]
fn sink_failure_is_fatal_and_not_retried() {
    struct FailingSink {
        attempts: u32,
    }

    impl Sink for FailingSink {
        fn accept(&mut self, _batch: &Batch<'_>) -> Result<SinkAck, EngineError> {
            self.attempts += 1;
            Err(EngineError::Sink("disk unplugged".to_string()))
        }

        fn finish(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
    }

    let config = config(7, 40.0, None);
    let probe = ScriptedProbe::new(config.limits.ram_budget_bytes, vec![0.1]);
    let budget = ResourceBudget::new(&config.limits, Box::new(probe));
    let mut orchestrator = RunOrchestrator::new(config, budget, Box::new(HeuristicEstimator));
    let domain = TestDomain::new(5);
    let mut sink = FailingSink { attempts: 0 };

    let err = orchestrator.run(&domain, &mut sink).expect_err("must fail");
    assert!(matches!(err, EngineError::Sink(_)));
    assert_eq!(sink.attempts, 1, "sink failures must not be retried");
}
