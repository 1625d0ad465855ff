use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use quipu_core::{ChaosLevel, ResourceLimits, RunConfig, ShockJitter, SimulationWindow, Value};
use quipu_domains::{SalesParams, builtin_registry};
use quipu_engine::{
    CsvSink, HeuristicEstimator, MemoryProbe, MemoryReading, MemorySink, ResourceBudget,
    RunOrchestrator, Sink, Tier,
};

struct ScriptedProbe {
    budget: u64,
    fractions: Vec<f64>,
    cursor: usize,
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

fn sales_config(level: Option<ChaosLevel>, monolithic_threshold: u64) -> RunConfig {
    let mut config = RunConfig::new(SimulationWindow::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
    ));
    config.demand.base_daily_rate = 100.0;
    config.demand.annual_growth = 0.0;
    config.demand.seasonality_amplitude = 0.0;
    config.demand.weekly_weights = [1.0; 7];
    config.demand.shock = ShockJitter { min: 1.0, max: 1.0 };
    config.chaos.global_seed = 42;
    config.chaos.level = level;
    config.limits = ResourceLimits {
        batch_floor: 16,
        batch_ceiling: 128,
        monolithic_threshold,
        ..ResourceLimits::default()
    };
    config
}

fn run(config: RunConfig, fractions: Vec<f64>, sink: &mut dyn Sink) -> quipu_engine::RunOutcome {
    let params = SalesParams {
        customers: 300,
        products: 40,
        ..SalesParams::default()
    };
    let registry = builtin_registry(params, config.chaos.global_seed);
    let domain = registry.get("sales").expect("sales domain registered");

    let probe = ScriptedProbe {
        budget: config.limits.ram_budget_bytes,
        fractions,
        cursor: 0,
    };
    let budget = ResourceBudget::new(&config.limits, Box::new(probe));
    let mut orchestrator = RunOrchestrator::new(config, budget, Box::new(HeuristicEstimator));
    orchestrator.run(domain, sink).expect("run succeeds")
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
fn week_of_sales_is_reproducible_across_runs() {
    let mut first_sink = MemorySink::new();
    let first = run(sales_config(None, u64::MAX), vec![0.1], &mut first_sink);

    let mut second_sink = MemorySink::new();
    let second = run(sales_config(None, u64::MAX), vec![0.1], &mut second_sink);

    assert_eq!(first.events_total, second.events_total);
    assert_eq!(first.final_tier, Tier::Normal);
    for table in ["customers", "products", "orders", "payments"] {
        assert_eq!(first_sink.rows(table), second_sink.rows(table));
    }
}

#[test]
fn sales_csv_is_identical_between_strategies() {
    let out_mono = std::env::temp_dir().join(format!("quipu_sales_{}", uuid::Uuid::new_v4()));
    let out_batched = std::env::temp_dir().join(format!("quipu_sales_{}", uuid::Uuid::new_v4()));

    let mut mono_sink = CsvSink::new(out_mono.clone());
    let mono = run(
        sales_config(Some(ChaosLevel::High), u64::MAX),
        vec![0.1],
        &mut mono_sink,
    );
    assert!(!mono.aborted);

    let mut batched_sink = CsvSink::new(out_batched.clone());
    let batched = run(
        sales_config(Some(ChaosLevel::High), 0),
        vec![0.1, 0.85, 0.1, 0.85, 0.1],
        &mut batched_sink,
    );
    assert!(!batched.aborted);

    for table in ["customers", "products", "orders", "payments"] {
        assert_eq!(
            hash_file(&out_mono.join(format!("{table}.csv"))),
            hash_file(&out_batched.join(format!("{table}.csv"))),
            "{table} output diverged between strategies"
        );
    }
}

#[test]
fn chaos_off_keeps_referential_integrity() {
    let mut sink = MemorySink::new();
    run(sales_config(None, u64::MAX), vec![0.1], &mut sink);

    let customers = sink.rows("customers").len() as i64;
    let products = sink.rows("products").len() as i64;
    let orders = sink.rows("orders").len() as i64;

    for row in sink.rows("orders") {
        assert!(row.iter().all(|value| !value.is_null()));
        let (Value::Int(customer_id), Value::Int(product_id)) = (&row[2], &row[3]) else {
            panic!("fk columns must stay integers");
        };
        assert!(*customer_id < customers, "order references a real customer");
        assert!(*product_id < products, "order references a real product");
    }
    for row in sink.rows("payments") {
        assert!(row.iter().all(|value| !value.is_null()));
        let Value::Int(order_id) = &row[1] else {
            panic!("order_id must stay an integer");
        };
        assert!(*order_id < orders, "payment references a real order");
    }
}

#[test]
fn orders_reach_the_sink_in_chronological_order() {
    let mut sink = MemorySink::new();
    run(sales_config(None, 0), vec![0.1, 0.85, 0.1], &mut sink);

    let mut previous: Option<NaiveDate> = None;
    for row in sink.rows("orders") {
        let Value::Date(date) = &row[1] else {
            panic!("order_date must be a date");
        };
        if let Some(previous) = previous {
            assert!(*date >= previous, "order dates must be non-decreasing");
        }
        previous = Some(*date);
    }
}
