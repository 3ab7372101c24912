pub mod config;
pub mod error;
pub mod parse;
pub mod reference;
pub mod validate;
pub mod wasm;

pub use config::FeatureFlags;
pub use error::{ErrorKind, FieldError, FieldErrors};
pub use validate::{validate_pipeline, validate_spec};
