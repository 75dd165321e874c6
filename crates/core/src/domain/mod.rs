pub mod charge;
pub mod jargon;
pub mod money;
pub mod user;
pub mod workspace;
