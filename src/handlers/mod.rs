pub mod activities;
pub mod issuances;
pub mod items;
pub mod reports;
pub mod stock_ins;
