//! Streaming, forward-only scanning of XML property lists.
//!
//! Large catalogs are never parsed into a tree. A [`Scanner`] turns any
//! [`Read`](std::io::Read)er into a pull-based stream of [`Token`]s, and a
//! [`Matcher`] navigates the dictionary/key/value structure on top of it.

pub mod error;
mod matcher;
mod scanner;

pub use crate::matcher::{Find, Matcher, tags};
pub use crate::scanner::{Scanner, Token};
