//! Generation parameters.
//!
//! Every knob has a default matching the reference test campaign. The driver
//! maps its command-line flags onto these structs and calls
//! [`GeneratorConfig::validate`] before the first batch.

use crate::error::ConfigError;

/// Relative weights of the command kinds in the random pool.
///
/// A zero weight removes the kind from the pool. Setting the credit-related
/// weights (`credit_query`, `failed_by_credit`) to zero yields the simpler
/// circulation campaign without credit scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandWeights {
    /// Successful-looking borrows.
    pub borrow: u32,
    /// Successful-looking orders.
    pub order: u32,
    /// Pickups of reserved copies.
    pub pick: u32,
    /// Reading-room requests.
    pub read: u32,
    /// Restores of reading-room copies.
    pub restore: u32,
    /// Trace queries.
    pub trace_query: u32,
    /// Credit queries.
    pub credit_query: u32,
    /// Requests from students whose credit is too low.
    pub failed_by_credit: u32,
    /// Orders that conflict with an existing hold or order.
    pub failed_order: u32,
}

impl Default for CommandWeights {
    fn default() -> Self {
        Self {
            borrow: 3,
            order: 2,
            pick: 2,
            read: 2,
            restore: 1,
            trace_query: 2,
            credit_query: 1,
            failed_by_credit: 1,
            failed_order: 1,
        }
    }
}

impl CommandWeights {
    /// Every weight zero; start from here to generate a single kind.
    pub fn none() -> Self {
        Self {
            borrow: 0,
            order: 0,
            pick: 0,
            read: 0,
            restore: 0,
            trace_query: 0,
            credit_query: 0,
            failed_by_credit: 0,
            failed_order: 0,
        }
    }

    /// Kinds with a non-zero weight, in a fixed order.
    pub fn table(&self) -> Vec<(CommandKind, u32)> {
        [
            (CommandKind::Borrow, self.borrow),
            (CommandKind::Order, self.order),
            (CommandKind::Pick, self.pick),
            (CommandKind::Read, self.read),
            (CommandKind::Restore, self.restore),
            (CommandKind::TraceQuery, self.trace_query),
            (CommandKind::CreditQuery, self.credit_query),
            (CommandKind::FailedByCredit, self.failed_by_credit),
            (CommandKind::FailedOrder, self.failed_order),
        ]
        .into_iter()
        .filter(|(_, weight)| *weight > 0)
        .collect()
    }
}

/// One entry of the weighted pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Borrow a shelved title the student may hold.
    Borrow,
    /// Order a title.
    Order,
    /// Pick up a reserved copy.
    Pick,
    /// Read a shelved title.
    Read,
    /// Restore today's reading.
    Restore,
    /// Query a copy's trace.
    TraceQuery,
    /// Query a student's credit.
    CreditQuery,
    /// Request that low credit should refuse.
    FailedByCredit,
    /// Order that an existing hold or order should refuse.
    FailedOrder,
}

/// Parameters of the per-day command generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Weighted pool.
    pub weights: CommandWeights,
    /// Chance of one opportunistic return per batch.
    pub return_propensity: f64,
    /// Chance of one opportunistic pickup per batch.
    pub pick_propensity: f64,
    /// Chance that a restore attempt finds a reader at all.
    pub restore_propensity: f64,
    /// Chance of addressing a student never seen before.
    pub new_student_ratio: f64,
    /// Preference for type-A titles when choosing among candidates.
    pub priority_a: f64,
    /// Preference for type-B titles.
    pub priority_b: f64,
    /// Preference for type-C titles.
    pub priority_c: f64,
    /// Leading digits of generated student ids.
    pub student_prefix: String,
    /// Number of distinct student ids, `prefix0001..=prefixNNNN`.
    pub student_pool: u32,
    /// Upper bound on opportunistic commands per batch.
    pub max_opportunistic: usize,
    /// Pool draws per remaining slot before giving up.
    pub attempts_per_slot: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            weights: CommandWeights::default(),
            return_propensity: 0.7,
            pick_propensity: 0.7,
            restore_propensity: 0.6,
            new_student_ratio: 0.2,
            priority_a: 0.2,
            priority_b: 0.4,
            priority_c: 0.4,
            student_prefix: "2337".to_owned(),
            student_pool: 74,
            max_opportunistic: 3,
            attempts_per_slot: 5,
        }
    }
}

impl GeneratorConfig {
    /// Reject probabilities outside `[0, 1]` and an empty student pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("return_propensity", self.return_propensity),
            ("pick_propensity", self.pick_propensity),
            ("restore_propensity", self.restore_propensity),
            ("new_student_ratio", self.new_student_ratio),
        ] {
            probability(name, value)?;
        }
        for (name, value) in
            [("priority_a", self.priority_a), ("priority_b", self.priority_b), ("priority_c", self.priority_c)]
        {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeWeight { name, value });
            }
        }
        if self.student_pool == 0 || self.student_pool > 9999 {
            return Err(ConfigError::StudentPool { size: self.student_pool });
        }
        Ok(())
    }
}

/// Parameters of the open/close cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleConfig {
    /// Fewest requests in one batch.
    pub min_requests: usize,
    /// Most requests in one batch.
    pub max_requests: usize,
    /// Fewest extra days skipped after a close.
    pub min_skip_days: u32,
    /// Most extra days skipped after a close.
    pub max_skip_days: u32,
    /// Chance of closing after the first batch of an open period.
    pub initial_close_probability: f64,
    /// Added to the close chance every time the library stays open.
    pub close_probability_increment: f64,
    /// Ceiling of the close chance.
    pub max_close_probability: f64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_requests: 1,
            max_requests: 5,
            min_skip_days: 0,
            max_skip_days: 1,
            initial_close_probability: 0.1,
            close_probability_increment: 0.15,
            max_close_probability: 0.9,
        }
    }
}

impl CycleConfig {
    /// Reject empty ranges and probabilities outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        range("requests", self.min_requests as u64, self.max_requests as u64)?;
        range("skip_days", u64::from(self.min_skip_days), u64::from(self.max_skip_days))?;
        probability("initial_close_probability", self.initial_close_probability)?;
        probability("close_probability_increment", self.close_probability_increment)?;
        probability("max_close_probability", self.max_close_probability)
    }
}

/// Shape of the generated inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Distinct titles.
    pub titles: usize,
    /// Fewest copies per title.
    pub min_copies: u32,
    /// Most copies per title.
    pub max_copies: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self { titles: 5, min_copies: 1, max_copies: 10 }
    }
}

impl InventoryConfig {
    /// Number of distinct ISBNs the `<T>-<NNNN>` scheme can produce.
    pub const MAX_TITLES: usize = 3 * 10_000;

    /// Reject empty ranges and more titles than ISBNs exist.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.titles == 0 || self.titles > Self::MAX_TITLES {
            return Err(ConfigError::TitleCount { titles: self.titles });
        }
        if self.min_copies == 0 {
            return Err(ConfigError::EmptyRange { name: "copies", min: 0, max: 0 });
        }
        range("copies", u64::from(self.min_copies), u64::from(self.max_copies))
    }
}

fn probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Probability { name, value })
    }
}

fn range(name: &'static str, min: u64, max: u64) -> Result<(), ConfigError> {
    if min <= max { Ok(()) } else { Err(ConfigError::EmptyRange { name, min, max }) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(GeneratorConfig::default().validate().is_ok());
        assert!(CycleConfig::default().validate().is_ok());
        assert!(InventoryConfig::default().validate().is_ok());
        assert_eq!(CommandWeights::default().table().len(), 9);
    }

    #[test]
    fn zero_weights_leave_the_pool() {
        let weights = CommandWeights { credit_query: 0, failed_by_credit: 0, ..Default::default() };
        let kinds: Vec<_> = weights.table().into_iter().map(|(kind, _)| kind).collect();
        assert!(!kinds.contains(&CommandKind::CreditQuery));
        assert!(!kinds.contains(&CommandKind::FailedByCredit));
        assert_eq!(kinds.len(), 7);

        assert!(CommandWeights::none().table().is_empty());
        let single = CommandWeights { trace_query: 4, ..CommandWeights::none() };
        assert_eq!(single.table(), [(CommandKind::TraceQuery, 4)]);
    }

    #[test]
    fn rejects_bad_values() {
        let config = GeneratorConfig { pick_propensity: 1.5, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Probability { name: "pick_propensity", .. })));

        let config = CycleConfig { min_requests: 6, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyRange { name: "requests", .. })));

        let config = InventoryConfig { titles: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
