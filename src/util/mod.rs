//! Utility functions shared by the parser and the serializer.
//!
//! This module provides reusable utilities for:
//!
//! - **Text processing**: XML escaping and Unicode-aware whitespace trimming
//! - **Time handling**: ISO 8601 timestamps and `YYYY-MM-DD` dates
//!
//! # Examples
//!
//! ```
//! use gfeed::util::{escape_text, parse_iso8601, trim_whitespace};
//!
//! assert_eq!(escape_text("Fish & Chips"), "Fish &amp; Chips");
//! assert_eq!(trim_whitespace("  padded \n"), "padded");
//! assert!(parse_iso8601("2009-01-25T14:07:37.880860Z").is_some());
//! ```

mod text;
mod time;

pub use text::{append_escaped, escape_text, trim_whitespace};
pub use time::{format_date, format_iso8601, parse_date, parse_iso8601};
