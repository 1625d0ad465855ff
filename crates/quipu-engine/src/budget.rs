use std::fmt;

use serde::Serialize;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{info, warn};

use quipu_core::ResourceLimits;

/// Severity tier of the resource budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Normal,
    Observation,
    Throttle,
    Abort,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tier::Normal => "NORMAL",
            Tier::Observation => "OBSERVATION",
            Tier::Throttle => "THROTTLE",
            Tier::Abort => "ABORT",
        };
        f.write_str(label)
    }
}

/// One memory measurement.
#[derive(Debug, Clone, Copy)]
pub struct MemoryReading {
    /// Bytes this process has grown by since the probe's baseline.
    pub process_used_bytes: u64,
    /// Fraction of total system memory currently in use.
    pub system_used_fraction: f64,
}

/// Source of memory measurements. Tests drive the state machine with
/// scripted readings; production uses [`SystemMemoryProbe`].
pub trait MemoryProbe {
    fn read(&mut self) -> MemoryReading;
}

/// Probe backed by the operating system. Process usage is measured as RSS
/// growth over the baseline captured at construction, so the budget tracks
/// what this run allocates rather than the interpreter-free cost of the
/// binary itself.
pub struct SystemMemoryProbe {
    system: System,
    pid: Pid,
    baseline_rss: u64,
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = sysinfo::get_current_pid().unwrap_or_else(|_| Pid::from_u32(0));
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let baseline_rss = system.process(pid).map(|proc| proc.memory()).unwrap_or(0);
        Self {
            system,
            pid,
            baseline_rss,
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn read(&mut self) -> MemoryReading {
        self.system.refresh_memory();
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let rss = self
            .system
            .process(self.pid)
            .map(|proc| proc.memory())
            .unwrap_or(0);
        let total = self.system.total_memory().max(1);
        let used = total.saturating_sub(self.system.available_memory());

        MemoryReading {
            process_used_bytes: rss.saturating_sub(self.baseline_rss),
            system_used_fraction: used as f64 / total as f64,
        }
    }
}

/// Published view of the budget state after a sample.
#[derive(Debug, Clone, Copy)]
pub struct BudgetSnapshot {
    pub tier: Tier,
    pub batch_size: u64,
    pub usage_fraction: f64,
}

/// Tiered monitor of process memory owning the batch-size recommendation.
///
/// `sample()` is the only mutator; the orchestrator re-consults it at each
/// batch boundary. Tier escalation is immediate; de-escalation requires a
/// configured streak of consecutive safe samples, so a usage fraction
/// hovering at a boundary cannot flap the state. Abort is terminal.
pub struct ResourceBudget {
    probe: Box<dyn MemoryProbe>,
    budget_bytes: u64,
    observation: f64,
    throttle: f64,
    abort: f64,
    system_stop: f64,
    floor: u64,
    ceiling: u64,
    hysteresis: u32,
    growth_factor: f64,
    tier: Tier,
    batch_size: u64,
    safe_streak: u32,
    last_fraction: f64,
}

impl ResourceBudget {
    pub fn new(limits: &ResourceLimits, probe: Box<dyn MemoryProbe>) -> Self {
        Self {
            probe,
            budget_bytes: limits.ram_budget_bytes.max(1),
            observation: limits.thresholds.observation,
            throttle: limits.thresholds.throttle,
            abort: limits.thresholds.abort,
            system_stop: limits.thresholds.system_stop,
            floor: limits.batch_floor,
            ceiling: limits.batch_ceiling,
            hysteresis: limits.hysteresis_samples,
            growth_factor: limits.growth_factor,
            tier: Tier::Normal,
            batch_size: limits.batch_ceiling,
            safe_streak: 0,
            last_fraction: 0.0,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Current recommendation; always at least the floor.
    pub fn recommended_batch_size(&self) -> u64 {
        self.batch_size.max(self.floor)
    }

    pub fn last_usage_fraction(&self) -> f64 {
        self.last_fraction
    }

    fn snapshot(&self) -> BudgetSnapshot {
        BudgetSnapshot {
            tier: self.tier,
            batch_size: self.recommended_batch_size(),
            usage_fraction: self.last_fraction,
        }
    }

    /// Take one measurement and advance the state machine.
    pub fn sample(&mut self) -> BudgetSnapshot {
        if self.tier == Tier::Abort {
            return self.snapshot();
        }

        let reading = self.probe.read();
        let fraction = reading.process_used_bytes as f64 / self.budget_bytes as f64;
        self.last_fraction = fraction;

        if reading.system_used_fraction >= self.system_stop {
            warn!(
                system_used = format!("{:.1}%", reading.system_used_fraction * 100.0),
                "system memory airbag tripped, aborting run"
            );
            self.tier = Tier::Abort;
            return self.snapshot();
        }

        if fraction >= self.abort {
            warn!(
                usage = format!("{:.1}%", fraction * 100.0),
                "memory budget exhausted, aborting run"
            );
            self.tier = Tier::Abort;
            return self.snapshot();
        }

        if fraction >= self.throttle {
            self.safe_streak = 0;
            if self.batch_size <= self.floor {
                warn!(
                    floor = self.floor,
                    usage = format!("{:.1}%", fraction * 100.0),
                    "sustained pressure at batch floor, aborting run"
                );
                self.tier = Tier::Abort;
                return self.snapshot();
            }
            let previous = self.batch_size;
            self.batch_size = (self.batch_size / 2).max(self.floor);
            self.tier = Tier::Throttle;
            warn!(
                from = previous,
                to = self.batch_size,
                usage = format!("{:.1}%", fraction * 100.0),
                "throttling batch size"
            );
            return self.snapshot();
        }

        if fraction >= self.observation {
            if self.tier == Tier::Normal {
                self.tier = Tier::Observation;
                info!(
                    usage = format!("{:.1}%", fraction * 100.0),
                    "entering observation tier"
                );
                self.safe_streak = 0;
            } else if self.tier == Tier::Throttle {
                // Below the throttle threshold counts toward stepping down.
                self.confirm_safe();
            } else {
                self.safe_streak = 0;
            }
            return self.snapshot();
        }

        self.confirm_safe();
        self.snapshot()
    }

    fn confirm_safe(&mut self) {
        self.safe_streak += 1;
        if self.safe_streak < self.hysteresis {
            return;
        }
        self.safe_streak = 0;

        match self.tier {
            Tier::Throttle => {
                self.tier = Tier::Observation;
                info!("de-escalating to observation tier");
            }
            Tier::Observation => {
                self.tier = Tier::Normal;
                info!("de-escalating to normal tier");
            }
            Tier::Normal => {
                if self.batch_size < self.ceiling {
                    let previous = self.batch_size;
                    let grown = (self.batch_size as f64 * self.growth_factor) as u64;
                    self.batch_size = grown.clamp(self.floor, self.ceiling);
                    info!(from = previous, to = self.batch_size, "recovering batch size");
                }
            }
            Tier::Abort => {}
        }
    }
}
