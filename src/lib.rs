#![allow(refining_impl_trait)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
#![deny(unused_import_braces)]
#![deny(unused_qualifications)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

//! This crate implements a status panel for OctoPrint managed 3D printers:
//! it polls the printer and job endpoints and renders the result as fixed
//! width rows for a terminal dashboard.

pub mod collector;
pub mod config;
mod error;
pub mod render;

pub use collector::{StatusCollector, StatusRecord, StatusSource, ERROR_STATE};
pub use config::{configure, AppConfig, Configured, ConnectionConfig, TomlConfig};
pub use error::{Error, Result};
pub use render::{format_duration, render, to_lines, Segment, Style};
