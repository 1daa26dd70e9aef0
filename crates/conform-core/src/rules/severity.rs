use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Three-level severity scale attached to every rule.
///
/// Ordering is semantic: `Low < Moderate < High`. Parsing is total: any
/// input that does not name a level normalizes to `Moderate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    Low,
    #[default]
    Moderate,
    High,
}

impl Severity {
    /// Parse a free-form label ("low", " HIGH ", ...). Unknown input yields `Moderate`.
    pub fn parse_lenient(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "low" => Severity::Low,
            "moderate" => Severity::Moderate,
            "high" => Severity::High,
            _ => Severity::Moderate,
        }
    }

    /// Normalize a raw manifest value. Accepts labels and the numeric
    /// levels 1..=3; everything else (including out-of-range numbers)
    /// yields `Moderate`.
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::parse_lenient(s),
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(1) => Severity::Low,
                Some(2) => Severity::Moderate,
                Some(3) => Severity::High,
                _ => Severity::Moderate,
            },
            _ => Severity::Moderate,
        }
    }

    /// Canonical capitalized label.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
        }
    }

    /// Blocking failures carry the `:x:` marker and escalate the exit code.
    pub fn is_blocking(self) -> bool {
        self >= Severity::High
    }
}

impl From<&str> for Severity {
    fn from(value: &str) -> Self {
        Self::parse_lenient(value)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_value(&raw))
    }
}
