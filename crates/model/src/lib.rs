#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]
#![allow(clippy::manual_range_contains)]

//! Data types for reports, verdicts and verification state.

pub mod admin;
pub mod id;
mod macros;
pub mod notification;
pub mod report;
pub mod schema;
pub mod statistics;
pub mod status;
pub mod string;
pub mod verdict;
pub mod verification;

pub use admin::*;
pub use id::*;
pub use notification::*;
pub use report::*;
pub use statistics::*;
pub use status::*;
pub use string::*;
pub use verdict::*;
pub use verification::*;

pub type Db = diesel::sqlite::Sqlite;
