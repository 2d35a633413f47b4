pub mod health;
pub mod pricing;
pub mod snapshots;
