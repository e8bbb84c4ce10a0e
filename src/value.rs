use std::fmt;

/// A runtime value produced while evaluating IR.
///
/// Every function argument and result is a [`Value::Number`]. Booleans only
/// exist between a comparison and the branch or widening that consumes it.
///
/// # Examples
///
/// ```
/// use toy_lang::Value;
///
/// assert_eq!(Value::Bool(true).as_number(), Some(1.0));
/// assert!(Value::Number(-0.5).is_truthy());
/// assert!(!Value::Number(0.0).is_truthy());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// 64-bit float, the only type visible to programs
    Number(f64),

    /// Result of a comparison
    Bool(bool),
}

impl Value {
    /// Check if the value is truthy (for branches)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Bool(b) => *b,
        }
    }

    /// Get as number, widening booleans to 0.0 / 1.0
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Number(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{:.6}", n),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[test]
fn test_number_display_matches_printf() {
    assert_eq!(Value::Number(9.0).to_string(), "9.000000");
    assert_eq!(Value::Number(-0.25).to_string(), "-0.250000");
}
