//! Persistence for portscout.
//!
//! - [`CsvStore`]: the append-only output file, which is also the resume
//!   checkpoint.
//! - [`MirrorStore`]: optional libSQL copy of every output row.
//! - [`read_input_urls`]: the input URL list.

mod csv_store;
mod input;
mod migrations;
mod mirror;

pub use csv_store::CsvStore;
pub use input::read_input_urls;
pub use mirror::MirrorStore;
