//! Terminal and JSON renderings of eonix results.

pub mod json;
pub mod text;
