//! Directory listings: clinics, patient rosters and bed lookup.

mod beds;
mod clinics;
mod patients;

pub use beds::*;
pub use clinics::*;
pub use patients::*;
