//! Bidirectional PostgreSQL schema synchronization.
//!
//! `dbtoyaml` extracts a live database into a declarative YAML description;
//! `yamltodb` diffs such a description against a live database and emits
//! (or executes) the DDL that reconciles them; `dbaugment` injects audit
//! columns and triggers into a desired model.

pub mod augment;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod diff;
pub mod render;
pub mod schema_generator;
pub mod schema_loader;
