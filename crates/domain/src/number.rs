//! Human-readable order number generation.

use std::fmt::Write as _;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Globally unique, human-readable order number.
///
/// Format: `ORD` + UTC second timestamp (`%Y%m%d%H%M%S`) + 12 hex chars
/// of process-level randomness (48 bits). Uniqueness comes from the random
/// suffix, not from a synchronized counter or a pre-read check; the
/// `UNIQUE` column constraint backstops the negligible collision chance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a fresh order number.
    pub fn generate() -> Self {
        let suffix: [u8; 6] = rand::rng().random();
        let mut number = format!("ORD{}", Utc::now().format("%Y%m%d%H%M%S"));
        for byte in suffix {
            let _ = write!(number, "{byte:02x}");
        }
        Self(number)
    }

    /// Wraps an order number read back from storage.
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Returns the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn has_expected_shape() {
        let number = OrderNumber::generate();
        // "ORD" + 14 timestamp digits + 12 hex chars
        assert_eq!(number.as_str().len(), 29);
        assert!(number.as_str().starts_with("ORD"));
        assert!(
            number.as_str()[3..17].bytes().all(|b| b.is_ascii_digit()),
            "timestamp portion should be digits: {number}"
        );
        assert!(
            number.as_str()[17..]
                .bytes()
                .all(|b| b.is_ascii_hexdigit()),
            "suffix should be hex: {number}"
        );
    }

    #[test]
    fn tight_loop_produces_no_collisions() {
        // Most of these land in the same second, so uniqueness rests
        // entirely on the random suffix.
        let numbers: HashSet<_> = (0..10_000).map(|_| OrderNumber::generate()).collect();
        assert_eq!(numbers.len(), 10_000);
    }
}
