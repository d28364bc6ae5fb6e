//! Types: the normalized lattice, the DSL surface tables and the
//! checker.

pub mod checker;
pub mod dsl;
pub mod ty;

pub use ty::{Type, TypeName};
