//! Wrapper shared by the structural directives (`v-if`, `v-for`).

use gesso_carton::Box;

use super::{node_transform, DirectiveMatcher, ExitFn, NodeTransform, TransformContext, TransformNode};
use crate::ast::*;

/// Handler invoked with a structural directive already detached from its
/// element. The directive is removed before the handler runs so it can
/// never be processed twice.
pub type StructuralHandler<'a> = fn(
    &mut TransformContext<'a>,
    &mut TransformNode<'_, 'a>,
    Box<'a, DirectiveNode<'a>>,
) -> Option<ExitFn<'a>>;

/// Build a node transform that runs `handler` for every directive matching
/// `matcher` on the visited element.
///
/// `<template v-slot>` wrappers are left alone; their directives belong to
/// the slot builder. Once a handler swaps the element out of the tree the
/// scan stops, the remaining directives travel with the moved element.
pub fn create_structural_directive_transform<'a>(
    matcher: DirectiveMatcher,
    handler: StructuralHandler<'a>,
) -> NodeTransform<'a> {
    node_transform(move |ctx, node| {
        let el = node.element(ctx.cursor)?;
        if el.is_template_with_slot() {
            return None;
        }
        let id = NodeId::of(el);

        let mut exits = std::vec::Vec::new();
        let mut i = 0;
        loop {
            let Some(el) = node.element_mut(ctx.cursor) else {
                break;
            };
            if NodeId::of(&*el) != id {
                break;
            }
            let Some(prop) = el.props.get(i) else {
                break;
            };
            let matched = matches!(prop, PropNode::Directive(dir) if matcher.matches(&dir.name));
            if !matched {
                i += 1;
                continue;
            }

            let PropNode::Directive(dir) = el.props.remove(i) else {
                continue;
            };
            tracing::trace!(directive = %dir.name, "structural directive");
            if let Some(exit) = handler(ctx, node, dir) {
                exits.push(exit);
            }
        }

        if exits.is_empty() {
            None
        } else {
            Some(exits)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{exit_fn, traverse_node, TransformPreset};
    use crate::TransformOptions;
    use gesso_armature::parse;
    use gesso_carton::Bump;
    use std::cell::Cell;

    thread_local! {
        static CALLS: Cell<usize> = const { Cell::new(0) };
    }

    fn counting_handler<'a>(
        _ctx: &mut TransformContext<'a>,
        _node: &mut TransformNode<'_, 'a>,
        _dir: Box<'a, DirectiveNode<'a>>,
    ) -> Option<ExitFn<'a>> {
        CALLS.with(|c| c.set(c.get() + 1));
        Some(exit_fn(|_ctx, _node| {}))
    }

    fn context<'a>(allocator: &'a Bump, transform: NodeTransform<'a>) -> TransformContext<'a> {
        TransformContext::with_preset(
            allocator,
            TransformOptions::default(),
            TransformPreset {
                node_transforms: vec![transform],
                directive_transforms: Default::default(),
                transform_hoist: None,
            },
        )
    }

    #[test]
    fn test_matching_directives_are_removed() {
        CALLS.with(|c| c.set(0));
        let allocator = Bump::new();
        let (mut root, _) = parse(&allocator, r#"<div v-foo="a" id="x" v-foo:bar="b"></div>"#);
        let mut ctx = context(
            &allocator,
            create_structural_directive_transform(DirectiveMatcher::Name("foo"), counting_handler),
        );
        traverse_node(&mut ctx, &mut TransformNode::Root(&mut root));

        assert_eq!(CALLS.with(Cell::get), 2);
        let el = root.children[0].as_element().unwrap();
        assert_eq!(el.props.len(), 1);
        assert!(matches!(&el.props[0], PropNode::Attribute(attr) if attr.name == "id"));
    }

    #[test]
    fn test_template_slot_is_skipped() {
        CALLS.with(|c| c.set(0));
        let allocator = Bump::new();
        let (mut root, _) = parse(
            &allocator,
            r#"<Comp><template #default v-foo="a">x</template></Comp>"#,
        );
        let mut ctx = context(
            &allocator,
            create_structural_directive_transform(DirectiveMatcher::Name("foo"), counting_handler),
        );
        traverse_node(&mut ctx, &mut TransformNode::Root(&mut root));
        assert_eq!(CALLS.with(Cell::get), 0);
    }

    fn replacing_handler<'a>(
        ctx: &mut TransformContext<'a>,
        node: &mut TransformNode<'_, 'a>,
        _dir: Box<'a, DirectiveNode<'a>>,
    ) -> Option<ExitFn<'a>> {
        CALLS.with(|c| c.set(c.get() + 1));
        let comment = TemplateChildNode::Comment(Box::new_in(
            CommentNode::new("replaced", SourceLocation::STUB),
            ctx.allocator,
        ));
        ctx.replace_node(node, comment).ok()?;
        None
    }

    #[test]
    fn test_scan_stops_after_replacement() {
        CALLS.with(|c| c.set(0));
        let allocator = Bump::new();
        let (mut root, _) = parse(&allocator, r#"<div v-foo="a" v-foo:bar="b"></div>"#);
        let mut ctx = context(
            &allocator,
            create_structural_directive_transform(DirectiveMatcher::Name("foo"), replacing_handler),
        );
        traverse_node(&mut ctx, &mut TransformNode::Root(&mut root));

        assert_eq!(CALLS.with(Cell::get), 1);
        assert!(matches!(root.children[0], TemplateChildNode::Comment(_)));
    }
}
