pub mod account;
pub mod activity;
pub mod assigned_asset;
pub mod assignment_batch;
pub mod history;
pub mod inventory;
pub mod license;
pub mod user;
