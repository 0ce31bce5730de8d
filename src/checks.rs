use std::{collections::BTreeMap, fmt::Debug};

use approx::abs_diff_eq;
use itertools::Itertools;
use thiserror::Error;

/// Tolerance used when none is given, matching the suite's default closeness.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Mismatch {
    #[error("'{what}' is {actual}, expected {expected}")]
    Flag {
        what: String,
        expected: bool,
        actual: bool,
    },

    #[error("'{what}' is {actual}, expected {expected}")]
    NotEqual {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("'{what}' is {actual}, expected {expected} +/- {tolerance}")]
    NotClose {
        what: String,
        expected: f64,
        actual: f64,
        tolerance: f64,
    },

    #[error("'{what}' has keys [{actual}], expected [{expected}]")]
    Keys {
        what: String,
        expected: String,
        actual: String,
    },
}

pub fn expect_flag(what: &str, expected: bool, actual: bool) -> Result<(), Mismatch> {
    if expected == actual {
        Ok(())
    } else {
        Err(Mismatch::Flag {
            what: what.to_string(),
            expected,
            actual,
        })
    }
}

pub fn expect_eq<T: PartialEq + Debug>(what: &str, expected: T, actual: T) -> Result<(), Mismatch> {
    if expected == actual {
        Ok(())
    } else {
        Err(Mismatch::NotEqual {
            what: what.to_string(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        })
    }
}

pub fn expect_close(what: &str, expected: f64, actual: f64, tolerance: f64) -> Result<(), Mismatch> {
    if abs_diff_eq!(expected, actual, epsilon = tolerance) {
        Ok(())
    } else {
        Err(Mismatch::NotClose {
            what: what.to_string(),
            expected,
            actual,
            tolerance,
        })
    }
}

/// Both maps must have the same keys, and every value must be close.
pub fn expect_close_map(
    what: &str,
    expected: &BTreeMap<String, f64>,
    actual: &BTreeMap<String, f64>,
    tolerance: f64,
) -> Result<(), Mismatch> {
    if !expected.keys().eq(actual.keys()) {
        return Err(Mismatch::Keys {
            what: what.to_string(),
            expected: expected.keys().join(", "),
            actual: actual.keys().join(", "),
        });
    }

    for (key, value) in expected {
        expect_close(&format!("{what}[{key}]"), *value, actual[key], tolerance)?;
    }

    Ok(())
}

/// Compares two name lists regardless of order.
pub fn expect_same_names(what: &str, expected: &[String], actual: &[String]) -> Result<(), Mismatch> {
    let expected: Vec<&String> = expected.iter().sorted().collect();
    let actual: Vec<&String> = actual.iter().sorted().collect();

    if expected == actual {
        Ok(())
    } else {
        Err(Mismatch::Keys {
            what: what.to_string(),
            expected: expected.iter().join(", "),
            actual: actual.iter().join(", "),
        })
    }
}
