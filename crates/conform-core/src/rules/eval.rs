use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::rules::severity::Severity;
use crate::validators::Validator;

/// Result of running one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub name: String,
    pub catalog: String,
    pub severity: Severity,
    pub passed: bool,
    pub message: String,
}

/// Runs validators one at a time, in order.
///
/// A validator that returns `Err` or panics becomes a failed outcome
/// carrying the error text; the rest of the batch still runs.
pub struct ExecutionEngine {
    validators: Vec<Box<dyn Validator>>,
}

impl ExecutionEngine {
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self { validators }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn execute(&self) -> Vec<Outcome> {
        self.validators.iter().map(|v| run_one(v.as_ref())).collect()
    }
}

pub fn run_one(validator: &dyn Validator) -> Outcome {
    debug!(validator = validator.name(), catalog = validator.catalog(), "running");

    let (passed, message) = match catch_unwind(AssertUnwindSafe(|| validator.validate())) {
        Ok(Ok(verdict)) => (verdict.passed, verdict.message),
        Ok(Err(e)) => {
            error!(validator = validator.name(), "validator failed: {e:#}");
            (false, format!("{e:#}"))
        }
        Err(payload) => {
            let text = panic_text(payload.as_ref());
            error!(validator = validator.name(), "validator panicked: {text}");
            (false, text)
        }
    };

    Outcome {
        name: validator.name().to_string(),
        catalog: validator.catalog().to_string(),
        severity: validator.severity(),
        passed,
        message,
    }
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "validator panicked".to_string()
    }
}
