//! Backend-independent tabular data: labels, ranges and the transform buffer.
pub mod column;
pub mod range;
pub mod table;
