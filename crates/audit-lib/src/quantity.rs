//! Kubernetes resource quantity parsing
//!
//! Handles the suffixes accepted by the API server: binary (`Ki`..`Ei`),
//! decimal (`n`, `u`, `m`, `k`, `M`..`E`) and exponent notation (`1e3`).

use crate::models::ResourceField;
use thiserror::Error;

/// Quantity parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,

    #[error("invalid number in quantity '{0}'")]
    InvalidNumber(String),

    #[error("unknown suffix '{suffix}' in quantity '{quantity}'")]
    UnknownSuffix { quantity: String, suffix: String },

    #[error("negative quantity '{0}'")]
    Negative(String),
}

/// Parse a quantity into its base unit (cores for CPU, bytes for memory)
pub fn parse_quantity(raw: &str) -> Result<f64, QuantityError> {
    let quantity = raw.trim();
    if quantity.is_empty() {
        return Err(QuantityError::Empty);
    }

    let (number, suffix) = quantity.split_at(suffix_start(quantity));

    let multiplier = match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024.0,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        _ => {
            return Err(QuantityError::UnknownSuffix {
                quantity: quantity.to_string(),
                suffix: suffix.to_string(),
            })
        }
    };

    let value: f64 = number
        .parse()
        .map_err(|_| QuantityError::InvalidNumber(quantity.to_string()))?;
    if !value.is_finite() {
        return Err(QuantityError::InvalidNumber(quantity.to_string()));
    }
    if value < 0.0 {
        return Err(QuantityError::Negative(quantity.to_string()));
    }

    let scaled = value * multiplier;
    if !scaled.is_finite() {
        return Err(QuantityError::InvalidNumber(quantity.to_string()));
    }
    Ok(scaled)
}

// `e`/`E` followed by a digit or sign is an exponent; otherwise `E` is exa.
fn suffix_start(quantity: &str) -> usize {
    let bytes = quantity.as_bytes();
    for (i, c) in quantity.char_indices() {
        if !c.is_ascii_alphabetic() {
            continue;
        }
        let exponent = (c == 'e' || c == 'E')
            && i > 0
            && bytes
                .get(i + 1)
                .is_some_and(|next| next.is_ascii_digit() || *next == b'+' || *next == b'-');
        if !exponent {
            return i;
        }
    }
    quantity.len()
}

/// Parse a CPU quantity into millicores, rounded to whole nanocores
pub fn parse_cpu_millicores(raw: &str) -> Result<f64, QuantityError> {
    let millicores = (parse_quantity(raw)? * 1e9).round() / 1e6;
    if !millicores.is_finite() {
        return Err(QuantityError::InvalidNumber(raw.trim().to_string()));
    }
    Ok(millicores)
}

/// Parse a memory quantity into bytes
pub fn parse_memory_bytes(raw: &str) -> Result<f64, QuantityError> {
    parse_quantity(raw)
}

/// Turn an optional raw quantity into a [`ResourceField`]
pub fn to_field(raw: Option<&str>, parse: fn(&str) -> Result<f64, QuantityError>) -> ResourceField {
    match raw {
        None => ResourceField::Unspecified,
        Some(raw) => match parse(raw) {
            Ok(value) => ResourceField::Declared(value),
            Err(_) => ResourceField::Malformed(raw.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_units() {
        assert_eq!(parse_cpu_millicores("100m").unwrap(), 100.0);
        assert_eq!(parse_cpu_millicores("1").unwrap(), 1000.0);
        assert_eq!(parse_cpu_millicores("0.5").unwrap(), 500.0);
        assert!((parse_cpu_millicores("250000000n").unwrap() - 250.0).abs() < 1e-6);
        assert!((parse_cpu_millicores("1500u").unwrap() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_memory_units() {
        assert_eq!(parse_memory_bytes("1Gi").unwrap(), 1_073_741_824.0);
        assert_eq!(parse_memory_bytes("128Mi").unwrap(), 134_217_728.0);
        assert_eq!(parse_memory_bytes("256Ki").unwrap(), 262_144.0);
        assert_eq!(parse_memory_bytes("1G").unwrap(), 1e9);
        assert_eq!(parse_memory_bytes("500k").unwrap(), 500_000.0);
        assert_eq!(parse_memory_bytes("1048576").unwrap(), 1_048_576.0);
    }

    #[test]
    fn test_parse_exponent_and_exa() {
        assert_eq!(parse_quantity("1e3").unwrap(), 1000.0);
        assert_eq!(parse_quantity("2E").unwrap(), 2e18);
        assert_eq!(parse_quantity("1Ei").unwrap(), 1024f64.powi(6));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_quantity(""), Err(QuantityError::Empty));
        assert!(matches!(
            parse_quantity("12Xi"),
            Err(QuantityError::UnknownSuffix { .. })
        ));
        assert!(matches!(
            parse_quantity("abc"),
            Err(QuantityError::UnknownSuffix { .. })
        ));
        assert!(matches!(
            parse_quantity("1.2.3"),
            Err(QuantityError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_quantity("-1"),
            Err(QuantityError::Negative(_))
        ));
    }

    #[test]
    fn test_to_field_distinguishes_absent_and_malformed() {
        assert_eq!(
            to_field(None, parse_cpu_millicores),
            ResourceField::Unspecified
        );
        assert_eq!(
            to_field(Some("200m"), parse_cpu_millicores),
            ResourceField::Declared(200.0)
        );
        assert_eq!(
            to_field(Some("lots"), parse_cpu_millicores),
            ResourceField::Malformed("lots".into())
        );
    }

    #[test]
    fn test_unrepresentable_quantity_is_malformed() {
        assert!(matches!(
            parse_memory_bytes("1e300Ei"),
            Err(QuantityError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_cpu_millicores("1e300"),
            Err(QuantityError::InvalidNumber(_))
        ));
        assert_eq!(
            to_field(Some("1e300Ei"), parse_memory_bytes),
            ResourceField::Malformed("1e300Ei".into())
        );
    }
}
