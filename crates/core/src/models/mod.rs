pub mod allocation;
pub mod analytics;
pub mod ledger;
pub mod metal;
pub mod presets;
pub mod price;
pub mod schedule;
pub mod settings;
