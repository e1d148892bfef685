//! devmap - a manifest of local development projects, reconciled against
//! the directory tree they live in

pub mod collab;
pub mod commands;
pub mod config;
pub mod lifecycle;
pub mod models;
pub mod reconcile;
pub mod registry;
pub mod scanner;
pub mod store;
