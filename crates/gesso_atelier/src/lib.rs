//! Atelier - the transform pipeline of gesso.
//!
//! Takes the tree produced by `gesso_armature`, runs the node and directive
//! transforms over it and attaches codegen descriptors. The static optimizer
//! then decides which parts can be hoisted out of the render path.
//!
//! # Example
//!
//! ```
//! use gesso_atelier::{compile_template, RuntimeHelper, TransformOptions};
//! use gesso_carton::Bump;
//!
//! let allocator = Bump::new();
//! let (root, errors) = compile_template(
//!     &allocator,
//!     "<div v-if=\"ok\">{{ msg }}</div>",
//!     TransformOptions::default(),
//! );
//! assert!(errors.is_empty());
//! assert!(root.has_helper(RuntimeHelper::OpenBlock));
//! ```

pub mod compile;
pub mod runtime_helpers;
pub mod transform;
pub mod transforms;

#[cfg(test)]
mod test_utils;

pub use gesso_relief::{ast, errors, options};

pub use ast::*;
pub use compile::{compile_template, CompileResult};
pub use errors::{CompilerError, ErrorCode};
pub use options::{load_options, BindingMetadata, BindingType, ConfigError, TransformOptions};
pub use runtime_helpers::RuntimeHelpers;
pub use transform::{
    transform, transform_with_context, Cursor, DirectiveMatcher, DirectiveTransform,
    DirectiveTransformResult, ExitFn, ExpressionProcessor, NeedRuntime, NodeTransform,
    ParentKind, Scopes, TransformContext, TransformError, TransformNode, TransformPreset,
};
