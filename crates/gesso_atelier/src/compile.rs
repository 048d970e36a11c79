//! Parse-and-transform entry point.

use gesso_armature::parse_with_options;
use gesso_carton::Bump;

use crate::ast::RootNode;
use crate::errors::CompilerError;
use crate::options::TransformOptions;
use crate::transform::transform;

/// Transformed root plus every parse and transform error
pub type CompileResult<'a> = (RootNode<'a>, std::vec::Vec<CompilerError>);

/// Parse `source` and run the transform pipeline over it.
///
/// A template that fails to parse is returned untransformed together with
/// the parse errors.
pub fn compile_template<'a>(
    allocator: &'a Bump,
    source: &'a str,
    options: TransformOptions,
) -> CompileResult<'a> {
    let (mut root, parse_errors) = parse_with_options(allocator, source, options.parser_options());
    if !parse_errors.is_empty() {
        tracing::debug!(errors = parse_errors.len(), "parse failed, skipping transform");
        return (root, parse_errors.to_vec());
    }

    let errors = transform(allocator, &mut root, options);
    (root, errors)
}
