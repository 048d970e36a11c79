//! v-show directive transform.
//!
//! Produces no props; visibility is toggled at runtime by the `vShow`
//! directive.

use crate::ast::*;
use crate::errors::ErrorCode;
use crate::transform::{DirectiveTransformResult, NeedRuntime, TransformContext};

pub fn transform_show<'a>(
    dir: &DirectiveNode<'a>,
    _el: &ElementNode<'a>,
    ctx: &mut TransformContext<'a>,
) -> DirectiveTransformResult<'a> {
    if dir.exp.as_ref().is_none_or(|exp| exp.content().trim().is_empty()) {
        ctx.on_error(ErrorCode::VShowNoExpression, Some(&dir.loc));
    }
    DirectiveTransformResult {
        props: std::vec::Vec::new(),
        need_runtime: NeedRuntime::Helper(ctx.helper(RuntimeHelper::VShow)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{element_at, render_exp, transformed, vnode_call};
    use crate::TransformOptions;
    use gesso_carton::PatchFlags;

    #[test]
    fn test_runtime_directive() {
        transformed(r#"<div><p v-show="ok"></p></div>"#, TransformOptions::default(), |root, errors| {
            assert!(errors.is_empty());
            let call = vnode_call(element_at(root, &[0, 0]));
            assert!(call.props.is_none());
            assert_eq!(call.patch_flag, Some(PatchFlags::NEED_PATCH));

            let directives = call.directives.as_ref().expect("withDirectives arguments");
            let entry = &directives.elements[0];
            assert_eq!(entry.directive, Callee::Symbol(RuntimeHelper::VShow));
            assert_eq!(entry.exp.as_ref().map(render_exp).as_deref(), Some("ok"));
            assert!(root.has_helper(RuntimeHelper::VShow));
            assert!(root.has_helper(RuntimeHelper::WithDirectives));
            assert!(!root.has_helper(RuntimeHelper::ResolveDirective));
        });
    }

    #[test]
    fn test_missing_expression() {
        transformed(r#"<div><p v-show></p></div>"#, TransformOptions::default(), |_, errors| {
            let codes: std::vec::Vec<_> = errors.iter().map(|e| e.code).collect();
            assert_eq!(codes, vec![ErrorCode::VShowNoExpression]);
        });
    }
}
