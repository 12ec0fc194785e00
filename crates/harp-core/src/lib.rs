//! In-memory product/variable data model for harmonized atmospheric
//! remote-sensing data.
//!
//! This crate covers layers 1–3 and 5–6 of the toolkit: the scalar and
//! type layer, the typed array layer, the unit layer's interface, and
//! the `Variable`/`Product` data model they compose into. The
//! spherical-geometry engine lives in `harp-geo`, the operation DSL in
//! `harp-dsl`, the pipeline executor in `harp-ops`, and ingestion
//! dispatch in `harp-ingest`.

pub mod array;
pub mod config;
pub mod dimension;
pub mod error;
pub mod product;
pub mod scalar;
pub mod unit;
pub mod variable;

pub use array::TypedArray;
pub use config::Config;
pub use dimension::DimensionKind;
pub use error::{HarpError, Result};
pub use product::Product;
pub use scalar::{ElementType, Scalar};
pub use unit::{UcumSubset, Unit, UnitConversion, UnitConverter};
pub use variable::Variable;
