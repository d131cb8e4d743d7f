use std::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const PRO_RETENTION_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl PlanTier {
    /// Exact, case-sensitive match. Anything unrecognized lands on `Free`.
    pub fn parse(plan_type: Option<&str>) -> Self {
        match plan_type {
            Some("Pro") => PlanTier::Pro,
            Some("Enterprise") => PlanTier::Enterprise,
            _ => PlanTier::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "Free",
            PlanTier::Pro => "Pro",
            PlanTier::Enterprise => "Enterprise",
        }
    }

    pub fn pitr(&self) -> PitrStatus {
        match self {
            PlanTier::Pro => PitrStatus {
                enabled: true,
                max_retention_days: RetentionDays::Days(PRO_RETENTION_DAYS),
            },
            PlanTier::Enterprise => PitrStatus {
                enabled: true,
                max_retention_days: RetentionDays::Varies,
            },
            PlanTier::Free => PitrStatus::disabled(),
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn resolve_pitr(plan_type: Option<&str>) -> PitrStatus {
    PlanTier::parse(plan_type).pitr()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitrStatus {
    pub enabled: bool,
    pub max_retention_days: RetentionDays,
}

impl PitrStatus {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_retention_days: RetentionDays::Days(0),
        }
    }
}

/// Serialized as a bare number, or the string `"Varies"` for custom contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDays {
    Days(u32),
    Varies,
}

impl fmt::Display for RetentionDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionDays::Days(d) => write!(f, "{d}"),
            RetentionDays::Varies => f.write_str("Varies"),
        }
    }
}

impl Serialize for RetentionDays {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RetentionDays::Days(d) => serializer.serialize_u32(*d),
            RetentionDays::Varies => serializer.serialize_str("Varies"),
        }
    }
}

impl<'de> Deserialize<'de> for RetentionDays {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Days(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Days(d) => Ok(RetentionDays::Days(d)),
            Raw::Text(s) if s == "Varies" => Ok(RetentionDays::Varies),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number of days or \"Varies\", got \"{}\"",
                s
            ))),
        }
    }
}
