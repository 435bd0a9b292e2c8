//! Kubernetes resource quantity parsing
//!
//! Converts quantity strings such as `250m`, `2`, `128Mi` or `1e3` into
//! plain numbers: CPU in cores, memory in bytes.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,
    #[error("invalid number in quantity {0:?}")]
    InvalidNumber(String),
    #[error("unknown suffix {suffix:?} in quantity {quantity:?}")]
    UnknownSuffix { quantity: String, suffix: String },
}

/// `value * 10^exp`, dividing for negative exponents
fn decimal(value: f64, exp: i32) -> f64 {
    if exp >= 0 {
        value * 10f64.powi(exp)
    } else {
        value / 10f64.powi(-exp)
    }
}

fn apply_suffix(value: f64, suffix: &str) -> Option<f64> {
    let exp = match suffix {
        "" => 0,
        "n" => -9,
        "u" => -6,
        "m" => -3,
        "k" => 3,
        "M" => 6,
        "G" => 9,
        "T" => 12,
        "P" => 15,
        "E" => 18,
        _ => {
            let power = match suffix {
                "Ki" => 1,
                "Mi" => 2,
                "Gi" => 3,
                "Ti" => 4,
                "Pi" => 5,
                "Ei" => 6,
                _ => return None,
            };
            return Some(value * 1024f64.powi(power));
        }
    };
    Some(decimal(value, exp))
}

/// Parse a quantity string into its numeric value
pub fn parse(raw: &str) -> Result<f64, QuantityError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(QuantityError::Empty);
    }

    let split = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '+' || c == '-') && i == 0)))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| QuantityError::InvalidNumber(raw.to_string()))?;

    if let Some(scaled) = apply_suffix(value, suffix) {
        return Ok(scaled);
    }

    // decimal exponent form, e.g. "1e3" or "5E-2"
    if let Some(exp) = suffix.strip_prefix(['e', 'E']) {
        if let Ok(exp) = exp.parse::<i32>() {
            return Ok(decimal(value, exp));
        }
    }

    Err(QuantityError::UnknownSuffix {
        quantity: raw.to_string(),
        suffix: suffix.to_string(),
    })
}

/// Parse a typed [`Quantity`]
pub fn to_f64(quantity: &Quantity) -> Result<f64, QuantityError> {
    parse(&quantity.0)
}
