//! Legacy content conversion: source parsing, classification, image
//! resolution, link rewriting, normalization and document merge.

pub mod classify;
pub mod images;
pub mod links;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod sql;
pub mod wxr;

#[cfg(test)]
mod tests;
