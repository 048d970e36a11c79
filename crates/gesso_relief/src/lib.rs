//! Relief - the tree surface the gesso transforms carve into.
//!
//! Defines the template node kinds produced by the reader, the codegen
//! descriptors attached by the transforms, the error taxonomy and the
//! compiler options.

pub mod ast;
pub mod errors;
pub mod options;

pub use ast::*;
pub use errors::{CompilerError, ErrorCode};
pub use options::*;
