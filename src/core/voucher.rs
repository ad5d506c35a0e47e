//! Voucher issuing.
//!
//! A voucher is a five character code (three uppercase letters followed by two
//! digits, each drawn independently and uniformly) plus an expiry date a fixed
//! number of calendar months after issuance. Codes are not security tokens and
//! are not checked for collisions.

use crate::errors::{Error, Result};
use chrono::{Months, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Number of letters at the start of a voucher code.
pub const CODE_LETTERS: usize = 3;
/// Number of digits at the end of a voucher code.
pub const CODE_DIGITS: usize = 2;

/// A generated voucher, not yet attached to a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voucher {
    /// Redeemable code, e.g. `KQZ07`
    pub code: String,
    /// Last valid day
    pub expiry_date: NaiveDate,
}

/// Draws a voucher code from `rng`.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut code: String = (0..CODE_LETTERS)
        .map(|_| char::from(b'A' + rng.gen_range(0..26u8)))
        .collect();
    code.extend((0..CODE_DIGITS).map(|_| char::from(b'0' + rng.gen_range(0..10u8))));
    code
}

/// Date `months` calendar months after `issued_on`.
///
/// Days that do not exist in the target month clamp to its last day, so
/// 30 November plus three months is 28 (or 29) February.
///
/// # Errors
/// Returns [`Error::InvalidInput`] if the date would be out of range.
pub fn expiry_date(issued_on: NaiveDate, months: u32) -> Result<NaiveDate> {
    issued_on
        .checked_add_months(Months::new(months))
        .ok_or_else(|| Error::InvalidInput {
            message: format!("voucher expiry out of range for {issued_on}"),
        })
}

/// Stateful source of vouchers.
///
/// Holds the random generator so tests can seed it; production seeds it from
/// the operating system.
#[derive(Debug)]
pub struct VoucherIssuer {
    rng: Mutex<StdRng>,
    validity_months: u32,
}

impl VoucherIssuer {
    /// Issuer seeded from system entropy.
    #[must_use]
    pub fn new(validity_months: u32) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            validity_months,
        }
    }

    /// Issuer with a fixed seed; the same seed yields the same codes.
    #[must_use]
    pub fn seeded(seed: u64, validity_months: u32) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            validity_months,
        }
    }

    /// Months a voucher stays valid.
    #[must_use]
    pub const fn validity_months(&self) -> u32 {
        self.validity_months
    }

    /// Issues one voucher dated `issued_on`.
    ///
    /// # Errors
    /// Returns an error only if the expiry date is out of range.
    pub fn issue(&self, issued_on: NaiveDate) -> Result<Voucher> {
        let code = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            generate_code(&mut *rng)
        };
        Ok(Voucher {
            code,
            expiry_date: expiry_date(issued_on, self.validity_months)?,
        })
    }
}
