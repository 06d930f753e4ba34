use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Mutex;

/// Synthetic price generator for when the live source is down.
///
/// Prices are uniform over `[min, max]` in whole cents, so they always carry
/// exactly two decimal places.
pub struct FallbackGenerator {
    min_cents: i64,
    max_cents: i64,
    rng: Mutex<StdRng>,
}

impl FallbackGenerator {
    pub fn new(min: Decimal, max: Decimal, seed: Option<u64>) -> Self {
        let min_cents = to_cents(min);
        let max_cents = to_cents(max).max(min_cents);
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            min_cents,
            max_cents,
            rng: Mutex::new(rng),
        }
    }

    pub fn generate(&self) -> Decimal {
        let cents = self
            .rng
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .gen_range(self.min_cents..=self.max_cents);
        Decimal::new(cents, 2)
    }
}

fn to_cents(value: Decimal) -> i64 {
    (value.round_dp(2) * Decimal::ONE_HUNDRED)
        .to_i64()
        .unwrap_or(0)
}
