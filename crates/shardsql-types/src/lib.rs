//! SQL value model for the shardsql planner core.
//!
//! Provides the dynamically-typed [`SqlValue`] scalar, its ordered
//! [`TypeId`] discriminant, and the [`CompareMode`] collation
//! configuration that makes value ordering explicit rather than
//! ambient.

pub mod compare;
pub mod value;

pub use compare::{Collation, CompareMode};
pub use value::{SqlValue, TypeId};
