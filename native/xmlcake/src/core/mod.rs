//! Byte-level building blocks shared by the reader

pub mod attributes;
pub mod entities;
pub mod scanner;
