//! Randomized command generation.
//!
//! The generator reads the library model to propose requests that exercise
//! both the accepting and the refusing paths of the simulator. It never
//! mutates circulation state: the checker advances the model only after a
//! response has been judged. The one exception is the advisory
//! restore-generated flag on [`Student`], which keeps a batch from
//! restoring the same reading twice.
//!
//! Batches are built in three steps:
//!
//! 1. Opportunistic returns and pickups in random order, so loans and
//!    reservations do not pile up forever.
//! 2. Weighted draws from the [`CommandKind`] pool, retried a few times per
//!    slot because some kinds find no candidate in the current state.
//! 3. Shuffle and truncate to the requested size.

mod config;
mod cycle;

use std::collections::BTreeSet;

use chrono::NaiveDate;
use circulation_model::{BookType, LibrarySystem, Student};
use circulation_proto::{Command, Inventory, Request};
pub use config::{CommandKind, CommandWeights, CycleConfig, GeneratorConfig, InventoryConfig};
pub use cycle::CycleScheduler;
use rand::{
    Rng, SeedableRng,
    distributions::{Distribution, WeightedIndex},
    seq::SliceRandom,
};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

/// Students considered per read attempt beyond those already known.
const READ_CANDIDATE_SAMPLE: usize = 10;

/// Produces batches of protocol commands for one library day.
#[derive(Debug, Clone)]
pub struct CommandGenerator<R = ChaCha8Rng> {
    config: GeneratorConfig,
    rng: R,
}

impl CommandGenerator<ChaCha8Rng> {
    /// Generator driven by a ChaCha8 stream seeded with `seed`.
    pub fn seeded(config: GeneratorConfig, seed: u64) -> Self {
        Self::new(config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> CommandGenerator<R> {
    /// Generator over an arbitrary random source.
    pub fn new(config: GeneratorConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// Active configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Underlying random source, shared with the cycle scheduler.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Random inventory of distinct `<T>-<NNNN>` titles.
    pub fn inventory(&mut self, config: &InventoryConfig) -> Inventory {
        let titles = config.titles.min(InventoryConfig::MAX_TITLES);
        let mut seen = BTreeSet::new();
        let mut entries = Vec::with_capacity(titles);
        while entries.len() < titles {
            let letter = BookType::ALL[self.rng.gen_range(0..BookType::ALL.len())].letter();
            let isbn = format!("{letter}-{:04}", self.rng.gen_range(0..10_000));
            if seen.insert(isbn.clone()) {
                let copies = self.rng.gen_range(config.min_copies..=config.max_copies.max(config.min_copies));
                entries.push((isbn, copies));
            }
        }
        Inventory::new(entries)
    }

    /// Up to `count` commands dated `date`, chosen against `library`.
    ///
    /// The batch may come up short when the library state offers too few
    /// candidates; that is logged and otherwise harmless.
    pub fn generate(&mut self, library: &LibrarySystem, date: NaiveDate, count: usize) -> Vec<Command> {
        if count == 0 {
            return Vec::new();
        }
        let mut batch = self.opportunistic(library, date, count);

        let table = self.config.weights.table();
        if let Ok(pool) = WeightedIndex::new(table.iter().map(|(_, weight)| *weight)) {
            let attempts = (count - batch.len()) * self.config.attempts_per_slot;
            for _ in 0..attempts {
                if batch.len() >= count {
                    break;
                }
                let kind = table[pool.sample(&mut self.rng)].0;
                if let Some(command) = self.generate_kind(kind, library, date) {
                    batch.push(command);
                }
            }
        }

        if batch.len() < count {
            debug!(%date, wanted = count, got = batch.len(), "generator underproduced");
        }
        batch.shuffle(&mut self.rng);
        batch.truncate(count);
        batch
    }

    /// One command of the given kind, if the library offers a candidate.
    pub fn generate_kind(
        &mut self,
        kind: CommandKind,
        library: &LibrarySystem,
        date: NaiveDate,
    ) -> Option<Command> {
        let request = match kind {
            CommandKind::Borrow => self.borrow(library),
            CommandKind::Order => self.order(library),
            CommandKind::Pick => self.pick(library),
            CommandKind::Read => self.read(library),
            CommandKind::Restore => self.restore(library),
            CommandKind::TraceQuery => self.trace_query(library),
            CommandKind::CreditQuery => self.credit_query(library),
            CommandKind::FailedByCredit => self.failed_by_credit(library),
            CommandKind::FailedOrder => self.failed_order(library),
        }?;
        trace!(?kind, ?request, "generated");
        Some(Command::new(date, request))
    }

    fn opportunistic(&mut self, library: &LibrarySystem, date: NaiveDate, count: usize) -> Vec<Command> {
        let mut found = Vec::new();

        if self.rng.gen_bool(self.config.return_propensity) {
            let loans: Vec<(&str, &str)> = library
                .students()
                .flat_map(|s| s.loans().map(move |loan| (s.id(), loan.copy.as_str())))
                .collect();
            if let Some((student, copy)) = loans.choose(&mut self.rng) {
                let request = Request::Return { student: (*student).to_owned(), copy: (*copy).to_owned() };
                found.push(Command::new(date, request));
            }
        }
        if self.config.weights.pick > 0 && self.rng.gen_bool(self.config.pick_propensity) {
            if let Some(request) = self.pick(library) {
                found.push(Command::new(date, request));
            }
        }

        found.shuffle(&mut self.rng);
        found.truncate(self.config.max_opportunistic.min(count / 3));
        found
    }

    fn borrow(&mut self, library: &LibrarySystem) -> Option<Request> {
        let student = self.student(library, 1.0 - self.config.new_student_ratio);
        let view = library.student_view(&student);
        let candidates: Vec<&str> = library
            .shelved_isbns()
            .filter(|isbn| match BookType::of_isbn(isbn) {
                Some(BookType::B) => view.held_b().is_none(),
                Some(BookType::C) => !view.held_c().contains_key(*isbn),
                _ => false,
            })
            .collect();
        let isbn = self.choose_isbn(&candidates, false)?.to_owned();
        Some(Request::Borrow { student, isbn })
    }

    fn order(&mut self, library: &LibrarySystem) -> Option<Request> {
        let student = self.student(library, 1.0 - self.config.new_student_ratio);
        let candidates: Vec<&str> =
            library.isbns().filter(|isbn| library.can_order(&student, isbn).is_ok()).collect();
        let isbn = self.choose_isbn(&candidates, false)?.to_owned();
        Some(Request::Order { student, isbn })
    }

    fn pick(&mut self, library: &LibrarySystem) -> Option<Request> {
        let ready: Vec<(&str, &str)> = library
            .students()
            .filter_map(|s| {
                let (copy, _) = s.order().reserved()?;
                let isbn = library.copy(copy)?.isbn();
                library.can_pick(s.id(), isbn).is_ok().then_some((s.id(), isbn))
            })
            .collect();
        let (student, isbn) = ready.choose(&mut self.rng)?;
        Some(Request::Pick { student: (*student).to_owned(), isbn: (*isbn).to_owned() })
    }

    fn read(&mut self, library: &LibrarySystem) -> Option<Request> {
        let mut candidates: Vec<String> = library.students().map(|s| s.id().to_owned()).collect();
        for _ in 0..READ_CANDIDATE_SAMPLE {
            let id = self.pool_student();
            if !candidates.contains(&id) {
                candidates.push(id);
            }
        }
        candidates.shuffle(&mut self.rng);

        for student in candidates {
            let view = library.student_view(&student);
            if view.reading_today().is_some() {
                continue;
            }
            let readable: Vec<&str> = library
                .shelved_isbns()
                .filter(|isbn| {
                    BookType::of_isbn(isbn).is_some_and(|t| library.rules().may_read(t, view.credit()))
                })
                .collect();
            if let Some(isbn) = self.choose_isbn(&readable, true) {
                let isbn = isbn.to_owned();
                return Some(Request::Read { student, isbn });
            }
        }
        None
    }

    fn restore(&mut self, library: &LibrarySystem) -> Option<Request> {
        if !self.rng.gen_bool(self.config.restore_propensity) {
            return None;
        }
        let readers: Vec<&Student> = library
            .students()
            .filter(|s| s.reading_today().is_some() && !s.restore_generated())
            .collect();
        let reader = readers.choose(&mut self.rng)?;
        let copy = reader.reading_today()?.to_owned();
        reader.mark_restore_generated();
        Some(Request::Restore { student: reader.id().to_owned(), copy })
    }

    fn trace_query(&mut self, library: &LibrarySystem) -> Option<Request> {
        let copies: Vec<&str> = library.copies().map(|c| c.id()).collect();
        let copy = (*copies.choose(&mut self.rng)?).to_owned();
        let student = self.student(library, 0.5);
        Some(Request::QueryTrace { student, copy })
    }

    fn credit_query(&mut self, library: &LibrarySystem) -> Option<Request> {
        let student = self.student(library, 1.0);
        Some(Request::QueryCredit { student })
    }

    fn failed_by_credit(&mut self, library: &LibrarySystem) -> Option<Request> {
        let rules = library.rules();
        let low: Vec<&Student> =
            library.students().filter(|s| s.credit() < rules.order_min_credit).collect();
        let student = *low.choose(&mut self.rng)?;
        let credit = student.credit();
        let id = student.id().to_owned();

        if credit < rules.borrow_min_credit {
            let lendable: Vec<&str> = library
                .shelved_isbns()
                .filter(|isbn| BookType::of_isbn(isbn).is_some_and(|t| t != BookType::A))
                .collect();
            if let Some(isbn) = lendable.choose(&mut self.rng) {
                return Some(Request::Borrow { student: id, isbn: (*isbn).to_owned() });
            }
        }
        if credit < rules.read_a_min_credit {
            let reference: Vec<&str> = library
                .shelved_isbns()
                .filter(|isbn| BookType::of_isbn(isbn) == Some(BookType::A))
                .collect();
            if let Some(isbn) = reference.choose(&mut self.rng) {
                return Some(Request::Read { student: id, isbn: (*isbn).to_owned() });
            }
        }
        let orderable: Vec<&str> =
            library.isbns().filter(|isbn| BookType::of_isbn(isbn).is_some_and(|t| t != BookType::A)).collect();
        let isbn = (*orderable.choose(&mut self.rng)?).to_owned();
        Some(Request::Order { student: id, isbn })
    }

    fn failed_order(&mut self, library: &LibrarySystem) -> Option<Request> {
        let student = self.student(library, 0.95);
        let view = library.student_view(&student);

        if view.order().is_active() && self.rng.gen_bool(0.5) {
            let lendable: Vec<&str> =
                library.isbns().filter(|isbn| BookType::of_isbn(isbn).is_some_and(|t| t != BookType::A)).collect();
            if let Some(isbn) = lendable.choose(&mut self.rng) {
                let isbn = (*isbn).to_owned();
                return Some(Request::Order { student, isbn });
            }
        }
        if view.held_b().is_some() && self.rng.gen_bool(0.5) {
            let type_b: Vec<&str> =
                library.isbns().filter(|isbn| BookType::of_isbn(isbn) == Some(BookType::B)).collect();
            if let Some(isbn) = type_b.choose(&mut self.rng) {
                let isbn = (*isbn).to_owned();
                return Some(Request::Order { student, isbn });
            }
        }
        let held_c: Vec<&str> = view.held_c().keys().map(String::as_str).collect();
        let isbn = (*held_c.choose(&mut self.rng)?).to_owned();
        Some(Request::Order { student, isbn })
    }

    /// A known student with probability `prefer_existing`, otherwise a
    /// random id from the pool.
    fn student(&mut self, library: &LibrarySystem, prefer_existing: f64) -> String {
        let existing: Vec<&str> = library.students().map(Student::id).collect();
        if !existing.is_empty() && self.rng.gen_bool(prefer_existing.clamp(0.0, 1.0)) {
            if let Some(id) = existing.choose(&mut self.rng) {
                return (*id).to_owned();
            }
        }
        self.pool_student()
    }

    fn pool_student(&mut self) -> String {
        let n = self.rng.gen_range(1..=self.config.student_pool.max(1));
        format!("{}{n:04}", self.config.student_prefix)
    }

    /// Pick an ISBN, preferring book types by their configured priority.
    ///
    /// Type A is only considered when `reading`; lending never offers it.
    fn choose_isbn<'a>(&mut self, candidates: &[&'a str], reading: bool) -> Option<&'a str> {
        if candidates.is_empty() {
            return None;
        }
        let priority = |t: BookType| match t {
            BookType::A if reading => self.config.priority_a,
            BookType::A => 0.0,
            BookType::B => self.config.priority_b,
            BookType::C => self.config.priority_c,
        };
        let buckets: Vec<(Vec<&'a str>, f64)> = BookType::ALL
            .iter()
            .map(|t| {
                let bucket: Vec<&'a str> =
                    candidates.iter().copied().filter(|isbn| BookType::of_isbn(isbn) == Some(*t)).collect();
                (bucket, priority(*t))
            })
            .filter(|(bucket, weight)| !bucket.is_empty() && *weight > 0.0)
            .collect();

        match WeightedIndex::new(buckets.iter().map(|(_, weight)| *weight)) {
            Ok(dist) => buckets[dist.sample(&mut self.rng)].0.choose(&mut self.rng).copied(),
            Err(_) => candidates.choose(&mut self.rng).copied(),
        }
    }
}
