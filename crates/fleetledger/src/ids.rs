//! Human-readable identifier generation.
//!
//! Driver ids look like `D42-33-QRS` and package ids like `PQX-SB-512`.
//! Generation is random with no uniqueness guarantee; the record store
//! rejects collisions with [`Error::DuplicateIdentifier`](crate::Error).

use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;

const DRIVER_TAG: &str = "33";
const PACKAGE_TAG: &str = "SB";

/// Random source for driver and package identifiers.
#[derive(Debug)]
pub struct IdGenerator {
    rng: StdRng,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Create a generator seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a deterministic generator.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a driver id: `D` + 0..=99 + `-33-` + three uppercase letters.
    pub fn driver_id(&mut self) -> String {
        let digits: u8 = self.rng.gen_range(0..100);
        let letters = self.letters(3);
        format!("D{digits}-{DRIVER_TAG}-{letters}")
    }

    /// Generate a package id: `P` + two uppercase letters + `-SB-` + 0..=999.
    pub fn package_id(&mut self) -> String {
        let letters = self.letters(2);
        let digits: u16 = self.rng.gen_range(0..1000);
        format!("P{letters}-{PACKAGE_TAG}-{digits}")
    }

    fn letters(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| char::from(self.rng.gen_range(b'A'..=b'Z')))
            .collect()
    }
}

fn driver_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^D\d{1,2}-33-[A-Z]{3}$").expect("valid driver id regex"))
}

fn package_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^P[A-Z]{2}-SB-\d{1,3}$").expect("valid package id regex"))
}

/// Check whether `id` has the driver id shape.
#[must_use]
pub fn is_driver_id(id: &str) -> bool {
    driver_id_pattern().is_match(id)
}

/// Check whether `id` has the package id shape.
#[must_use]
pub fn is_package_id(id: &str) -> bool {
    package_id_pattern().is_match(id)
}
