//! Authored FSH input as handed over by the parser
//!
//! These types are the boundary between the FSH front end and the export
//! pipeline: a [`FshTank`] holds [`FshDocument`]s, each of which holds the
//! [`Instance`]s authored in one file together with their fixed-value rules.

mod instance;
mod tank;
mod values;

pub use instance::{FixedValueRule, Instance, InstanceUsage, SourceInfo, TextLocation};
pub use tank::{FshDocument, FshTank};
pub use values::{FshCode, FshQuantity, FshReference, FshValue};
