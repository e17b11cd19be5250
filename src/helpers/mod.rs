//! Reader helpers for the xlsx loader.
pub(crate) mod xml;
pub(crate) mod zip;
