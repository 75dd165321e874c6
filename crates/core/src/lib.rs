pub mod config;
pub mod domain;
pub mod errors;

pub use domain::charge::{Charge, ChargeId, NewCharge, TermUsageStats, TimePeriod, UserChargeStats};
pub use domain::jargon::{JargonTerm, JargonTermId, NewJargonTerm};
pub use domain::user::{User, UserId, UserProfile};
pub use domain::workspace::{Workspace, WorkspaceId, WorkspaceInstall};
pub use errors::{ApplicationError, DomainError, InterfaceError};
