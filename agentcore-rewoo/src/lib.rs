#![deny(missing_docs)]
//! The ReWoo (Sketch/Work/Organize) reasoning strategy (C8).

mod parser;
mod strategy;
mod types;

pub use parser::{parse_organize, parse_sketches};
pub use strategy::RewooStrategy;
pub use types::{Evidence, OrganizeOutput, RewooError, RewooPhase, Sketch};
