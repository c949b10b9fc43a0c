//! Synthetic employee records.

use std::sync::Arc;

use chrono::{Months, NaiveDateTime, SubsecRound, TimeDelta, Utc};
use fake::Fake;
use fake::faker::job::en::Position;
use fake::faker::name::en::{FirstName, LastName};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::identity::IdentitySequence;

/// Target column order; insert values are bound in exactly this order.
pub const COLUMN_NAMES: [&str; 9] = [
    "empno", "fname", "lname", "job", "mgr", "hiredate", "sal", "comm", "dept",
];

/// Salary bounds in cents, upper bound exclusive.
const SALARY_CENTS: std::ops::Range<i64> = 7_500_000..30_000_000;
/// Commission bounds in cents, upper bound exclusive.
const COMMISSION_CENTS: std::ops::Range<i64> = 500_000..10_000_000;
const MONEY_SCALE: u32 = 2;
/// Two-digit identifiers used for `mgr` and `dept`.
const TWO_DIGITS: std::ops::Range<i32> = 0..100;
const MIN_AGE_YEARS: u32 = 18;
const MAX_AGE_YEARS: u32 = 65;

/// One fabricated row, produced and persisted immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticRecord {
    pub employee_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub manager_id: i32,
    pub hire_date: NaiveDateTime,
    pub salary: Decimal,
    pub commission: Decimal,
    pub department_id: i32,
}

/// Anything that can hand the loader its next record.
pub trait RecordSource {
    fn next_record(&mut self) -> Result<SyntheticRecord>;
}

/// Produces synthetic records from `fake` providers and a shared identity
/// sequence.
///
/// Records are not reproducible unless the generator was built with
/// [`RecordGenerator::seeded`].
#[derive(Debug)]
pub struct RecordGenerator {
    identity: Arc<IdentitySequence>,
    rng: ChaCha8Rng,
    anchor: NaiveDateTime,
}

impl RecordGenerator {
    pub fn new(identity: Arc<IdentitySequence>) -> Self {
        let rng = ChaCha8Rng::from_rng(&mut rand::rng());
        Self::with_rng(identity, rng)
    }

    pub fn seeded(identity: Arc<IdentitySequence>, seed: u64) -> Self {
        Self::with_rng(identity, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(identity: Arc<IdentitySequence>, rng: ChaCha8Rng) -> Self {
        Self {
            identity,
            rng,
            anchor: Utc::now().naive_utc().trunc_subsecs(3),
        }
    }

    /// Pin the instant birthdays are measured back from.
    pub fn with_anchor(mut self, anchor: NaiveDateTime) -> Self {
        self.anchor = anchor.trunc_subsecs(3);
        self
    }

    /// Generate one record. The identity is drawn last so a failed
    /// generation never consumes an `empno`.
    pub fn generate(&mut self) -> Result<SyntheticRecord> {
        let first_name = non_empty("first name", FirstName().fake_with_rng(&mut self.rng))?;
        let last_name = non_empty("last name", LastName().fake_with_rng(&mut self.rng))?;
        let job_title = non_empty("job position", Position().fake_with_rng(&mut self.rng))?;
        let manager_id = self.rng.random_range(TWO_DIGITS);
        let hire_date = self.birthday()?;
        let salary = self.money(SALARY_CENTS)?;
        let commission = self.money(COMMISSION_CENTS)?;
        let department_id = self.rng.random_range(TWO_DIGITS);

        let employee_id = self
            .identity
            .next()
            .ok_or_else(|| unavailable("empno sequence exhausted at i32::MAX"))?;

        Ok(SyntheticRecord {
            employee_id,
            first_name,
            last_name,
            job_title,
            manager_id,
            hire_date,
            salary,
            commission,
            department_id,
        })
    }

    fn birthday(&mut self) -> Result<NaiveDateTime> {
        let oldest = self
            .anchor
            .checked_sub_months(Months::new(MAX_AGE_YEARS * 12))
            .ok_or_else(|| unavailable("birthday lower bound out of range"))?;
        let youngest = self
            .anchor
            .checked_sub_months(Months::new(MIN_AGE_YEARS * 12))
            .ok_or_else(|| unavailable("birthday upper bound out of range"))?;

        let span_ms = (youngest - oldest).num_milliseconds();
        if span_ms <= 0 {
            return Err(unavailable("empty birthday range"));
        }
        let offset = TimeDelta::milliseconds(self.rng.random_range(0..span_ms));
        oldest
            .checked_add_signed(offset)
            .ok_or_else(|| unavailable("birthday out of range"))
    }

    fn money(&mut self, cents: std::ops::Range<i64>) -> Result<Decimal> {
        let value = self.rng.random_range(cents);
        Decimal::try_new(value, MONEY_SCALE)
            .map_err(|err| Error::GenerationUnavailable(format!("decimal amount: {err}")))
    }
}

impl RecordSource for RecordGenerator {
    fn next_record(&mut self) -> Result<SyntheticRecord> {
        self.generate()
    }
}

fn non_empty(what: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(unavailable(&format!("{what} provider returned no value")));
    }
    Ok(value)
}

fn unavailable(message: &str) -> Error {
    Error::GenerationUnavailable(message.to_string())
}
