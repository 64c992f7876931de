#![doc = include_str!("../README.md")]
#![no_std]
#![deny(clippy::mod_module_files)]

extern crate alloc;

pub mod config;
pub mod decoder;
pub mod errors;
pub mod grammar;
pub mod reconstruct;
pub mod record;
#[cfg(feature = "testing")]
pub mod testing;
pub mod value;

pub use config::Configuration;
pub use decoder::{LogMinerDecoder, Operation, ReportingContext};
pub use reconstruct::{Columns, Options, StatementKind, reconstruct};
pub use record::{Message, MessageId, ParsedMessage, RawMessage};
pub use value::{FunctionCall, Value};

// Re-export errors
pub use errors::{Error, ReconstructionError};
pub use grammar::{SyntaxError, SyntaxErrors};
