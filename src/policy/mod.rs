mod plan;

pub use plan::{PlanTier, PitrStatus, RetentionDays, resolve_pitr};
