// 🧮 Calculation Entity - Typed arithmetic records
//
// One entity struct + a closed kind enum instead of a subclass hierarchy:
// the stored discriminator string maps 1:1 onto CalculationKind, and a
// single exhaustive match performs all dispatch (factory and computation).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// CALCULATION KIND
// ============================================================================

/// The four supported arithmetic operations.
///
/// This set is closed: the factory and the persistence layer both resolve
/// discriminator strings against exactly these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationKind {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl CalculationKind {
    /// Canonical discriminator string, as persisted in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationKind::Addition => "addition",
            CalculationKind::Subtraction => "subtraction",
            CalculationKind::Multiplication => "multiplication",
            CalculationKind::Division => "division",
        }
    }

    /// Resolve a kind name case-insensitively.
    ///
    /// Unknown names fail with `UnsupportedCalculationType` carrying the
    /// original, un-normalized string.
    pub fn parse(name: &str) -> Result<Self, CalculationError> {
        match name.to_lowercase().as_str() {
            "addition" => Ok(CalculationKind::Addition),
            "subtraction" => Ok(CalculationKind::Subtraction),
            "multiplication" => Ok(CalculationKind::Multiplication),
            "division" => Ok(CalculationKind::Division),
            _ => Err(CalculationError::UnsupportedCalculationType(
                name.to_string(),
            )),
        }
    }
}

impl std::fmt::Display for CalculationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CALCULATION ERROR
// ============================================================================

/// Validation failures surfaced by the factory and by `compute_result`.
///
/// All four are caller-recoverable; none are swallowed or mapped to a
/// default result.
#[derive(Debug, Clone, PartialEq)]
pub enum CalculationError {
    /// `inputs` is not an ordered numeric sequence (non-array JSON, or an
    /// array containing a non-numeric element).
    InvalidInputKind,
    /// Fewer than two numeric elements supplied.
    InsufficientInputs { found: usize },
    /// A zero divisor at the given input position (second element onward).
    DivisionByZero { position: usize },
    /// The factory was given an unrecognized kind name.
    UnsupportedCalculationType(String),
}

impl std::fmt::Display for CalculationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalculationError::InvalidInputKind => {
                write!(f, "inputs must be an ordered list of numbers")
            }
            CalculationError::InsufficientInputs { found } => {
                write!(f, "at least two inputs are required, found {}", found)
            }
            CalculationError::DivisionByZero { position } => {
                write!(f, "division by zero at input position {}", position)
            }
            CalculationError::UnsupportedCalculationType(name) => {
                write!(f, "unsupported calculation type: {}", name)
            }
        }
    }
}

impl std::error::Error for CalculationError {}

// ============================================================================
// CALCULATION ENTITY
// ============================================================================

/// A persisted arithmetic calculation owned by a user.
///
/// `inputs` is kept as the JSON value the caller supplied and is never
/// validated at construction: only `compute_result` checks it. The computed
/// result is never written back into `inputs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calculation {
    /// Stable identity (UUID), generated at construction.
    pub id: String,

    /// Owning user id. Referential integrity (and cascade delete) is
    /// enforced by the database schema, not here.
    pub user_id: String,

    /// Discriminator driving both persistence polymorphism and dispatch.
    pub kind: CalculationKind,

    /// Ordered inputs as supplied, stored as a JSON column. Order matters
    /// for subtraction and division.
    pub inputs: Value,

    /// On-demand result; persisted only if the caller computed it.
    pub result: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Calculation {
    /// Direct construction with an explicit kind.
    pub fn new(kind: CalculationKind, user_id: &str, inputs: Value) -> Self {
        let now = Utc::now();
        Calculation {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            inputs,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn addition(user_id: &str, inputs: Value) -> Self {
        Calculation::new(CalculationKind::Addition, user_id, inputs)
    }

    pub fn subtraction(user_id: &str, inputs: Value) -> Self {
        Calculation::new(CalculationKind::Subtraction, user_id, inputs)
    }

    pub fn multiplication(user_id: &str, inputs: Value) -> Self {
        Calculation::new(CalculationKind::Multiplication, user_id, inputs)
    }

    pub fn division(user_id: &str, inputs: Value) -> Self {
        Calculation::new(CalculationKind::Division, user_id, inputs)
    }

    /// Factory: resolve a kind name case-insensitively and construct the
    /// matching variant.
    ///
    /// Construction never fails on bad `inputs`; only `compute_result`
    /// validates them. Unknown names fail with
    /// `UnsupportedCalculationType`.
    pub fn create(kind: &str, user_id: &str, inputs: Value) -> Result<Self, CalculationError> {
        let kind = CalculationKind::parse(kind)?;
        Ok(Calculation::new(kind, user_id, inputs))
    }

    /// Extract `inputs` as a numeric sequence, enforcing the shared
    /// preconditions: must be a JSON array of numbers, length >= 2.
    fn numeric_inputs(&self) -> Result<Vec<f64>, CalculationError> {
        let items = match &self.inputs {
            Value::Array(items) => items,
            _ => return Err(CalculationError::InvalidInputKind),
        };

        let mut numbers = Vec::with_capacity(items.len());
        for item in items {
            match item.as_f64() {
                Some(n) => numbers.push(n),
                None => return Err(CalculationError::InvalidInputKind),
            }
        }

        if numbers.len() < 2 {
            return Err(CalculationError::InsufficientInputs {
                found: numbers.len(),
            });
        }

        Ok(numbers)
    }

    /// Compute the result as a left-to-right fold over `inputs`.
    ///
    /// Pure and idempotent: no mutation, repeated calls return the same
    /// value. Division checks every divisor per step, so a zero anywhere
    /// in the tail aborts at that step.
    pub fn compute_result(&self) -> Result<f64, CalculationError> {
        let numbers = self.numeric_inputs()?;
        let (first, rest) = (numbers[0], &numbers[1..]);

        match self.kind {
            CalculationKind::Addition => Ok(first + rest.iter().sum::<f64>()),
            CalculationKind::Subtraction => Ok(rest.iter().fold(first, |acc, n| acc - n)),
            CalculationKind::Multiplication => Ok(rest.iter().fold(first, |acc, n| acc * n)),
            CalculationKind::Division => {
                let mut acc = first;
                for (offset, divisor) in rest.iter().enumerate() {
                    if *divisor == 0.0 {
                        return Err(CalculationError::DivisionByZero {
                            position: offset + 1,
                        });
                    }
                    acc /= divisor;
                }
                Ok(acc)
            }
        }
    }

    /// Compute and cache the result on the entity (for callers that want
    /// it persisted alongside the record).
    pub fn with_result(mut self) -> Result<Self, CalculationError> {
        self.result = Some(self.compute_result()?);
        Ok(self)
    }
}

// ============================================================================
// TESTS
// ============================================================================
