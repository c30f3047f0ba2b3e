//! Records produced by the extractors.
//!
//! Every record is a snapshot of one page fetch. Nothing here is updated in
//! place; a new fetch produces new records.

mod clinic;
mod exam;
mod note;
mod patient;
mod prescription;
mod registration;

pub use clinic::*;
pub use exam::*;
pub use note::*;
pub use patient::*;
pub use prescription::*;
pub use registration::*;
