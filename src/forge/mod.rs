//! Plugin generation pipeline.
//!
//! ```text
//! raw fields -> Validator::sanitize -> Validator::validate
//!            -> Generator::generate (FileMap) -> ZipCreator::create
//! ```

pub mod archive;
pub mod generator;
pub mod replacements;
pub mod validator;

pub use archive::{TempArchive, ZipCreator};
pub use generator::{FileContent, FileMap, Generator};
pub use replacements::{Replacement, ReplacementError, ReplacementTable};
pub use validator::{ValidationErrors, Validator};
