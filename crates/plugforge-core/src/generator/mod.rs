//! Generation backends.
//!
//! A [`Generator`] turns a materialized prompt into file content. The
//! default backend shells out to an external CLI; tests swap in scripted
//! implementations through the [`GeneratorRegistry`].

pub mod command;
pub mod prompt;
pub mod registry;
pub mod trait_def;

pub use command::CommandGenerator;
pub use prompt::build_file_prompt;
pub use registry::GeneratorRegistry;
pub use trait_def::{GenerateError, GenerateRequest, Generator};
