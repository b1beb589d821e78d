//! Command-line frontend for the pricecast forecasting library.
//!
//! This crate reads wide price CSVs, resolves configuration (flags over file
//! values over defaults) and renders training summaries. The `pricecast`
//! binary wires these onto the core training and serving functions.

pub mod config;
pub mod input;
pub mod report;

pub use config::FileConfig;
pub use input::read_wide_csv;
pub use report::render_summary;
