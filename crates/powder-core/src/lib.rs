//! # Powder Core
//!
//! I/O-free decoding logic for powder-ingest: the canonical series model,
//! the quote-aware row tokenizer, and one decoder per chronograph export
//! format.
//!
//! Every decoder is a plain function over its input. It owns its scratch
//! state for the duration of the call and returns fresh [`ParsedSeries`]
//! values, so calls are independent and repeatable.
//!
//! | Module | Input | Output |
//! |--------|-------|--------|
//! | [`labradar`] | `;`-separated report | one series, possibly invalid |
//! | [`magnetospeed`] | CSV with `----` separators | series in file order |
//! | [`prochrono`] | CSV, two layouts | series numbered newest first |
//! | [`garmin`] | worksheet grid or quoted CSV | series per sheet / one series |
//! | [`shotmarker`] | decompressed JSON record | one series |
//! | [`manual`] | one velocity per line | one series |
//!
//! [`ParsedSeries`]: models::ParsedSeries

pub mod cells;
pub mod error;
pub mod garmin;
pub mod labradar;
pub mod magnetospeed;
pub mod manual;
pub mod models;
pub mod prochrono;
pub mod shotmarker;
pub mod tokenizer;

pub use error::{DecodeError, Result};
pub use models::{ParsedSeries, VelocityUnit};
