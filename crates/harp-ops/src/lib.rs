//! Bound-operation pipeline executor for HARP products: row-wise
//! predicate filters, the derivation registry, spatial predicates,
//! per-variable reshaping, collocation, and the top-level `execute`
//! entry point that applies a [`harp_dsl::Pipeline`] transactionally.

pub mod collocate;
pub mod derive;
pub mod filter;
pub mod pipeline;
pub mod reshape;
pub mod spatial;

pub use pipeline::execute;
