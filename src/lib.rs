#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::new_without_default,
    clippy::uninlined_format_args,
    clippy::cast_precision_loss
)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod prompt;
pub mod providers;
pub mod session;

pub use config::Config;
pub use error::AppError;
