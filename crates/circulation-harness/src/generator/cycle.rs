//! Open/close cycle orchestration.

use chrono::{Duration, NaiveDate};
use circulation_model::LibrarySystem;
use circulation_proto::Command;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::{CommandGenerator, CycleConfig};

/// Decides when the library opens and closes and how many requests each
/// batch carries.
///
/// A cycle starts closed. [`Self::open`] yields the OPEN command,
/// [`Self::day`] yields one batch of requests and, at random, a trailing
/// CLOSE. After a close the calendar jumps one day plus a random skip.
#[derive(Debug)]
pub struct CycleScheduler<R = ChaCha8Rng> {
    config: CycleConfig,
    generator: CommandGenerator<R>,
    date: NaiveDate,
    open: bool,
    close_probability: f64,
}

impl<R: Rng> CycleScheduler<R> {
    /// Scheduler starting closed on `start`.
    pub fn new(config: CycleConfig, generator: CommandGenerator<R>, start: NaiveDate) -> Self {
        let close_probability = config.initial_close_probability;
        Self { config, generator, date: start, open: false, close_probability }
    }

    /// Current simulated date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Whether the library is currently open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// OPEN for the current date, or `None` if already open.
    pub fn open(&mut self) -> Option<Command> {
        if self.open {
            return None;
        }
        self.open = true;
        self.close_probability = self.config.initial_close_probability;
        Some(Command::open(self.date))
    }

    /// Next batch of requests for the current date.
    ///
    /// Ends with CLOSE when the library closes after this batch.
    pub fn day(&mut self, library: &LibrarySystem) -> Vec<Command> {
        let count = self.generator.rng_mut().gen_range(self.config.min_requests..=self.config.max_requests);
        let mut batch = self.generator.generate(library, self.date, count);

        if self.generator.rng_mut().gen_bool(self.close_probability.clamp(0.0, 1.0)) {
            batch.push(Command::close(self.date));
            let skip = self.generator.rng_mut().gen_range(self.config.min_skip_days..=self.config.max_skip_days);
            let next = self.date + Duration::days(1 + i64::from(skip));
            debug!(date = %self.date, %next, "closing");
            self.date = next;
            self.open = false;
        } else {
            self.close_probability =
                (self.close_probability + self.config.close_probability_increment).min(self.config.max_close_probability);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorConfig;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn scheduler(config: CycleConfig) -> CycleScheduler<rand_chacha::ChaCha8Rng> {
        let generator = CommandGenerator::seeded(GeneratorConfig::default(), 42);
        CycleScheduler::new(config, generator, start())
    }

    #[test]
    fn opens_once_per_cycle() {
        let mut scheduler = scheduler(CycleConfig::default());
        assert_eq!(scheduler.open(), Some(Command::open(start())));
        assert_eq!(scheduler.open(), None);
        assert!(scheduler.is_open());
    }

    #[test]
    fn certain_close_advances_the_calendar() {
        let config = CycleConfig {
            initial_close_probability: 1.0,
            min_skip_days: 2,
            max_skip_days: 2,
            ..Default::default()
        };
        let mut scheduler = scheduler(config);
        let mut library = LibrarySystem::default();
        library.initialize(["B-0001 1"]).unwrap();
        library.apply_open(start());

        scheduler.open();
        let batch = scheduler.day(&library);
        assert_eq!(batch.last(), Some(&Command::close(start())));
        assert!(!scheduler.is_open());
        assert_eq!(scheduler.date(), start() + Duration::days(3));
        assert_eq!(scheduler.open(), Some(Command::open(start() + Duration::days(3))));
    }

    #[test]
    fn never_closing_keeps_the_date() {
        let config = CycleConfig {
            initial_close_probability: 0.0,
            max_close_probability: 0.0,
            ..Default::default()
        };
        let mut scheduler = scheduler(config);
        let library = LibrarySystem::default();

        scheduler.open();
        for _ in 0..10 {
            let batch = scheduler.day(&library);
            assert!(batch.iter().all(|c| !c.request.is_tidy()));
        }
        assert!(scheduler.is_open());
        assert_eq!(scheduler.date(), start());
    }
}
