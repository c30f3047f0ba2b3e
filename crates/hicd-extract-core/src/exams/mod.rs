//! Exam requisitions, results and print queries.

mod print;
mod requisitions;
mod results;
mod values;

pub use print::*;
pub use requisitions::*;
pub use results::*;
pub use values::*;
