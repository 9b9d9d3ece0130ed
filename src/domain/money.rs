use std::fmt;

/// Money is represented as integer cents of the base currency to avoid
/// floating-point drift in stored balances.
/// For RUB/USD, 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Largest magnitude (in units) accepted from the outside world.
/// Keeps `units * 100` exactly representable in an `f64` mantissa.
const MAX_UNITS: f64 = 90_071_992_547_409.0;

/// Convert a decimal amount into cents, rounding half away from zero.
/// The sign is preserved; rejecting negatives is up to the ledger.
/// Example: 55.3 -> 5530, 0.005 -> 1, -12.5 -> -1250
pub fn cents_from_units(units: f64) -> Result<Cents, AmountError> {
    if !units.is_finite() {
        return Err(AmountError::NotFinite);
    }
    if units.abs() > MAX_UNITS {
        return Err(AmountError::OutOfRange);
    }
    let cents = (units * 100.0).round() as Cents;
    // -0.001 must not turn into a harmless zero
    if units < 0.0 && cents == 0 {
        return Ok(-1);
    }
    Ok(cents)
}

/// Convert cents back into a decimal amount.
pub fn cents_to_units(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    NotFinite,
    OutOfRange,
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::NotFinite => write!(f, "amount is not a finite number"),
            AmountError::OutOfRange => write!(f, "amount is out of range"),
        }
    }
}

impl std::error::Error for AmountError {}
