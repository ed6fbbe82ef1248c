//! Den Danske Ordbog entry pipeline: parse saved article pages, normalize and
//! deduplicate the entries, write a stable dataset, and enrich it with audio and
//! translations.

pub mod error;
pub mod model;
pub mod parsers;
pub mod services;

pub use error::{Error, ParseError, Result};
