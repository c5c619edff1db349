//! Model-based campaigns: generated batches answered by the reference
//! simulator must always pass the checker, and tampering with any user
//! operation answer must always be caught.

use chrono::NaiveDate;
use circulation_harness::{
    Checker, CommandGenerator, CycleConfig, CycleScheduler, GeneratorConfig, InventoryConfig,
    InvariantRegistry, ReferenceLibrary,
};
use circulation_model::{LibraryRules, LibrarySystem};
use circulation_proto::{Command, UserOpLine};
use proptest::prelude::*;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

/// Every batch sent during a campaign, with the reference answers.
struct Campaign {
    batches: Vec<(Vec<Command>, Vec<String>)>,
}

/// Drive `cycles` open periods, checking every batch as it goes.
fn run(seed: u64, cycles: usize, config: GeneratorConfig) -> Campaign {
    let mut generator = CommandGenerator::seeded(config, seed);
    let inventory = generator.inventory(&InventoryConfig::default());
    let mut sut = ReferenceLibrary::from_inventory(LibraryRules::default(), &inventory).unwrap();
    let mut model = LibrarySystem::default();
    model.initialize(inventory.entry_lines()).unwrap();

    let mut scheduler = CycleScheduler::new(CycleConfig::default(), generator, start());
    let checker = Checker::new();
    let invariants = InvariantRegistry::standard();
    let mut batches = Vec::new();
    let mut closed = 0;

    let mut exchange = |model: &mut LibrarySystem, batch: Vec<Command>| {
        let output: Vec<String> =
            batch.iter().flat_map(|command| sut.respond(command).unwrap()).collect();
        if let Err(violation) = checker.check_batch(model, &batch, &output) {
            panic!("seed {seed}: reference answer rejected\n{violation}");
        }
        invariants.assert_all(model, &format!("seed {seed}"));
        batches.push((batch, output));
    };

    while closed < cycles {
        if let Some(open) = scheduler.open() {
            exchange(&mut model, vec![open]);
        }
        let batch = scheduler.day(&model);
        exchange(&mut model, batch);
        if !scheduler.is_open() {
            closed += 1;
        }
    }
    Campaign { batches }
}

#[test]
fn long_campaign_stays_consistent() {
    let campaign = run(2024, 60, GeneratorConfig::default());
    let commands: usize = campaign.batches.iter().map(|(batch, _)| batch.len()).sum();
    assert!(commands > 60);
}

#[test]
fn campaigns_are_reproducible() {
    let a = run(99, 10, GeneratorConfig::default());
    let b = run(99, 10, GeneratorConfig::default());
    assert_eq!(a.batches, b.batches);
}

#[test]
fn credit_free_campaign_never_queries_credit() {
    let mut config = GeneratorConfig::default();
    config.weights.credit_query = 0;
    config.weights.failed_by_credit = 0;
    let campaign = run(5, 20, config);
    for (batch, _) in &campaign.batches {
        for command in batch {
            assert!(!command.to_string().ends_with("credit score"));
        }
    }
}

#[test]
fn flipped_status_is_caught() {
    let campaign = run(17, 30, GeneratorConfig::default());
    let mut model = LibrarySystem::default();
    let mut generator = CommandGenerator::seeded(GeneratorConfig::default(), 17);
    model.initialize(generator.inventory(&InventoryConfig::default()).entry_lines()).unwrap();
    let checker = Checker::new();

    let mut tampered_once = false;
    for (batch, output) in &campaign.batches {
        let target = output.iter().position(|line| UserOpLine::parse(line).is_ok());
        match target {
            Some(index) if !tampered_once => {
                let mut tampered = output.clone();
                tampered[index] = if tampered[index].contains("[accept]") {
                    tampered[index].replace("[accept]", "[reject]")
                } else {
                    tampered[index].replace("[reject]", "[accept]")
                };
                let mut scratch = model.clone();
                assert!(checker.check_batch(&mut scratch, batch, &tampered).is_err());
                tampered_once = true;
            },
            _ => {},
        }
        checker.check_batch(&mut model, batch, output).unwrap();
    }
    assert!(tampered_once);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Whatever the seed, the reference simulator's answers are legal.
    #[test]
    fn prop_reference_always_conforms(seed in any::<u64>()) {
        run(seed, 8, GeneratorConfig::default());
    }
}
