//! Running campaigns against a simulator.
//!
//! A run stocks the library, sends the handshake, then alternates OPEN,
//! a day of generated requests and occasional CLOSE, checking every batch
//! against the model as soon as its answers are in. The first violation,
//! timeout or crash ends the run.

use std::{collections::HashMap, sync::Arc};

use circulation_harness::{Checker, CommandGenerator, CycleScheduler};
use circulation_model::LibrarySystem;
use circulation_proto::{Command, Inventory};
use serde::Serialize;
use tokio::{
    sync::Semaphore,
    task::{Id, JoinSet},
};
use tracing::{debug, info, warn};

use crate::{
    config::{DriverConfig, SutCommand},
    error::DriverError,
    process::SutProcess,
    transcript::Transcript,
};

/// Final verdict on a simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every answer was legal.
    Success,
    /// The run stopped on a violation or a harness error.
    Failure,
}

/// Summary of one run, printed as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Verdict.
    pub status: RunStatus,
    /// Why the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Seed the run used.
    pub seed: u64,
    /// Completed open/close cycles.
    pub cycles: usize,
    /// Commands sent, excluding the handshake.
    pub commands: usize,
    /// Latest simulator stderr lines, kept on failure.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stderr: Vec<String>,
}

impl RunOutcome {
    /// Whether the simulator passed.
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

#[derive(Debug, Default)]
struct Progress {
    cycles: usize,
    commands: usize,
    stderr: Vec<String>,
}

/// Drives one simulator program.
#[derive(Debug, Clone)]
pub struct Runner {
    sut: SutCommand,
    config: DriverConfig,
}

impl Runner {
    /// Runner for `sut` under `config`.
    pub fn new(sut: SutCommand, config: DriverConfig) -> Self {
        Self { sut, config }
    }

    /// Run configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Run to completion and summarise. Never fails; failures are verdicts.
    pub async fn run(&self) -> RunOutcome {
        let mut progress = Progress::default();
        let result = self.drive(&mut progress).await;
        let (status, reason) = match result {
            Ok(()) => {
                info!(
                    seed = self.config.seed,
                    cycles = progress.cycles,
                    commands = progress.commands,
                    "simulator passed"
                );
                (RunStatus::Success, None)
            },
            Err(e) => {
                warn!(seed = self.config.seed, commands = progress.commands, error = %e, "run failed");
                (RunStatus::Failure, Some(e.to_string()))
            },
        };
        RunOutcome {
            status,
            reason,
            seed: self.config.seed,
            cycles: progress.cycles,
            commands: progress.commands,
            stderr: progress.stderr,
        }
    }

    async fn drive(&self, progress: &mut Progress) -> Result<(), DriverError> {
        self.config.validate()?;

        let mut generator = CommandGenerator::seeded(self.config.generator.clone(), self.config.seed);
        let inventory = generator.inventory(&self.config.inventory);
        let mut library = LibrarySystem::new(self.config.rules.clone());
        library.initialize(inventory.entry_lines())?;
        debug!(titles = inventory.entries().len(), copies = inventory.copies(), "inventory ready");

        let transcript = Transcript::create(&self.config.transcripts)?;
        let mut sut = SutProcess::spawn(&self.sut, self.config.process, transcript)?;
        let scheduler = CycleScheduler::new(self.config.cycle.clone(), generator, self.config.start_date);

        let result = self.campaign(&mut sut, &inventory, &mut library, scheduler, progress).await;
        if result.is_err() {
            progress.stderr = sut.stderr_tail();
        }
        let code = sut.shutdown().await;
        debug!(?code, "simulator stopped");
        result
    }

    async fn campaign(
        &self,
        sut: &mut SutProcess,
        inventory: &Inventory,
        library: &mut LibrarySystem,
        mut scheduler: CycleScheduler,
        progress: &mut Progress,
    ) -> Result<(), DriverError> {
        sut.send_lines(&inventory.handshake()[..]).await?;
        let checker = Checker::new();

        while progress.cycles < self.config.max_cycles
            && progress.commands < self.config.max_total_commands
        {
            if let Some(open) = scheduler.open() {
                exchange(sut, &checker, library, vec![open], progress).await?;
            }
            let batch = scheduler.day(library);
            exchange(sut, &checker, library, batch, progress).await?;
            if !scheduler.is_open() {
                progress.cycles += 1;
                debug!(cycle = progress.cycles, date = %scheduler.date(), "cycle complete");
            }
        }
        Ok(())
    }
}

async fn exchange(
    sut: &mut SutProcess,
    checker: &Checker,
    library: &mut LibrarySystem,
    batch: Vec<Command>,
    progress: &mut Progress,
) -> Result<(), DriverError> {
    let mut output = Vec::new();
    for command in &batch {
        output.extend(sut.exchange(command).await?);
        progress.commands += 1;
    }
    checker.check_batch(library, &batch, &output)?;
    Ok(())
}

/// Run `rounds` independent campaigns, at most `parallel` at a time.
///
/// Round `i` uses seed `config.seed + i` and, when transcripts are enabled,
/// its own pair of logs. Outcomes come back in round order.
pub async fn run_rounds(
    sut: SutCommand,
    config: DriverConfig,
    rounds: usize,
    parallel: usize,
) -> Vec<RunOutcome> {
    let permits = Arc::new(Semaphore::new(parallel.max(1)));
    let mut tasks = JoinSet::new();
    let mut seeds = HashMap::with_capacity(rounds);

    for round in 0..rounds {
        let mut config = config.clone();
        config.seed = config.seed.wrapping_add(round as u64);
        if rounds > 1 {
            config.transcripts = config.transcripts.for_round(round);
        }
        let seed = config.seed;
        let runner = Runner::new(sut.clone(), config);
        let permits = Arc::clone(&permits);
        let handle = tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            runner.run().await
        });
        seeds.insert(handle.id(), (round, seed));
    }

    gather(tasks, &seeds).await
}

/// Collect round outcomes in round order. A round whose task died counts
/// as a failure of that round.
async fn gather(mut tasks: JoinSet<RunOutcome>, seeds: &HashMap<Id, (usize, u64)>) -> Vec<RunOutcome> {
    let mut outcomes = Vec::with_capacity(seeds.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok(done) => done,
            Err(e) => {
                warn!(error = %e, "round task failed");
                let seed = seeds.get(&e.id()).map_or(0, |(_, seed)| *seed);
                let outcome = RunOutcome {
                    status: RunStatus::Failure,
                    reason: Some(format!("round task failed: {e}")),
                    seed,
                    cycles: 0,
                    commands: 0,
                    stderr: Vec::new(),
                };
                (e.id(), outcome)
            },
        };
        let round = seeds.get(&id).map_or(usize::MAX, |(round, _)| *round);
        outcomes.push((round, outcome));
    }
    outcomes.sort_by_key(|(round, _)| *round);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passed(seed: u64) -> RunOutcome {
        RunOutcome { status: RunStatus::Success, reason: None, seed, cycles: 1, commands: 2, stderr: Vec::new() }
    }

    fn crash() -> RunOutcome {
        panic!("checker bug")
    }

    #[tokio::test]
    async fn crashed_round_is_reported_as_failure() {
        let mut tasks = JoinSet::new();
        let mut seeds = HashMap::new();
        seeds.insert(tasks.spawn(async { passed(40) }).id(), (0, 40));
        seeds.insert(tasks.spawn(async { crash() }).id(), (1, 41));
        seeds.insert(tasks.spawn(async { passed(42) }).id(), (2, 42));

        let outcomes = gather(tasks, &seeds).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes.iter().map(|o| o.seed).collect::<Vec<_>>(), [40, 41, 42]);
        assert!(outcomes[0].is_success() && outcomes[2].is_success());
        assert_eq!(outcomes[1].status, RunStatus::Failure);
        assert!(outcomes[1].reason.as_deref().is_some_and(|r| r.starts_with("round task failed")));
    }
}
