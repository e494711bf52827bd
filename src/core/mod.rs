//! Core types shared by the generation pipeline and the HTTP layer:
//!
//! - [`FieldSet`] - submitted form fields
//! - [`Error`] - every failure a generation request can hit

mod error;
pub mod fields;
pub mod html;

pub use error::{Error, Result, GENERIC_FAILURE_MESSAGE};
pub use fields::FieldSet;
pub use html::{escape_html, nl2br};
