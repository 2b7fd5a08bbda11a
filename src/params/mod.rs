// src/params/mod.rs

//! Parameter space expansion.
//!
//! - [`time`] parses and formats cycle timestamps and leadtime durations.
//! - [`point`] defines [`VerificationPoint`] and the level types.
//! - [`expander`] turns the declared ranges/lists into the ordered
//!   cross-product of verification points.

pub mod expander;
pub mod point;
pub mod time;

pub use expander::{ParameterSpace, VariableAxis, expand_points};
pub use point::{Level, LevelType, VerificationPoint};
