//! Input/output helpers.
//!
//! - spreadsheet / CSV source readers (`source`)
//! - the SQLite store of the normalized table (`store`)
//! - CSV/JSON exports of a filtered view (`export`)

pub mod export;
pub mod source;
pub mod store;

pub use export::*;
pub use source::*;
pub use store::*;
