//! Offline-first sales dashboard: cached ERP datasets rendered in the terminal.

pub mod app;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod dashboard;
pub mod erp;
pub mod event;
pub mod notify;
pub mod ui;
