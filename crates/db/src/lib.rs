pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{GlobalCatalogue, SeedResult, VerificationResult, GLOBAL_JARGON_CATALOGUE};
pub use repositories::{Repositories, RepositoryError};
