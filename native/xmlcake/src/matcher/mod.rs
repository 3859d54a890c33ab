//! Sequence Matcher Module
//!
//! Finds runs of sibling nodes that satisfy an ordered list of steps, with
//! filler nodes of one kind allowed in between. Independent of the path
//! index; matching only reads the document.

pub mod parallel;
pub mod sequence;
pub mod step;

pub use parallel::{child_streams, find_all_parallel, find_parallel};
pub use sequence::{Expression, FilteredWrap, Match, MatchCollection};
pub use step::{AttributeStep, KindStep, NameStep, Step};
