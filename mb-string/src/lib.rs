//! Multibyte string helpers.
//!
//! [`MbString`] forwards length, search, substring and UTF-8 checks to a
//! [`Backend`] looked up by name on every call. Inputs are raw bytes, since
//! the data usually comes straight off a request and is not yet known to be
//! valid UTF-8.

pub mod backend;
pub mod backends;
pub mod error;
pub mod facade;
pub mod validate;

pub use backend::Backend;
pub use error::MbError;
pub use facade::{MbConfig, MbString, Registry};
pub use validate::{is_utf8, Strictness};
