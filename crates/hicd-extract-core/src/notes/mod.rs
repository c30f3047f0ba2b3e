//! Clinical note ("evolution") extraction.

mod filters;
mod parser;
mod role;

pub use filters::*;
pub use parser::*;
pub use role::*;
