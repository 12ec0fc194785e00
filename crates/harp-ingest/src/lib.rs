//! Ingestion-module contract, registry, and dispatch: the front end
//! that turns a file on disk into a [`harp_core::product::Product`].

pub mod dispatch;
pub mod modules;
pub mod registry;

pub use dispatch::{all_ok, check_path, dispatch, CheckReport, VariableReport};
pub use registry::{option_combinations, IngestionModule, IngestionOption, Registry};
