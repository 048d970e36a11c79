//! Depth-first traversal.

use std::rc::Rc;

use gesso_carton::Vec;

use super::{Cursor, ExitFn, ParentKind, TransformContext, TransformNode};
use crate::ast::*;

/// Visit `node`: run every node transform, descend into its children, then
/// run the collected exit callbacks in reverse order.
///
/// A transform that removes the node stops the pipeline for it; callbacks
/// collected so far are dropped without running.
pub fn traverse_node<'a>(ctx: &mut TransformContext<'a>, node: &mut TransformNode<'_, 'a>) {
    let transforms = Rc::clone(&ctx.node_transforms);
    let mut exits: std::vec::Vec<ExitFn<'a>> = std::vec::Vec::new();

    for transform in transforms.iter() {
        if let Some(on_exit) = transform(&mut *ctx, &mut *node) {
            exits.extend(on_exit);
        }
        if node.is_removed(ctx.cursor) {
            tracing::trace!(index = ctx.cursor.child_index, "node removed during traversal");
            return;
        }
    }

    match node {
        TransformNode::Root(root) => traverse_children(ctx, &mut root.children, ParentKind::Root),
        TransformNode::Branch(branch) => {
            traverse_children(ctx, &mut branch.children, ParentKind::IfBranch)
        }
        TransformNode::Child(siblings) => {
            let cursor = ctx.cursor;
            match siblings.get_mut(cursor.child_index) {
                Some(TemplateChildNode::Comment(_)) => {
                    if !ctx.options.ssr {
                        ctx.helper(RuntimeHelper::CreateComment);
                    }
                }
                Some(TemplateChildNode::Interpolation(_)) => {
                    if !ctx.options.ssr {
                        ctx.helper(RuntimeHelper::ToDisplayString);
                    }
                }
                Some(TemplateChildNode::If(if_node)) => {
                    for branch in if_node.branches.iter_mut() {
                        let saved = ctx.cursor;
                        ctx.cursor = Cursor::DETACHED;
                        traverse_node(ctx, &mut TransformNode::Branch(branch));
                        ctx.cursor = saved;
                    }
                }
                Some(TemplateChildNode::For(for_node)) => {
                    traverse_children(ctx, &mut for_node.children, ParentKind::For);
                }
                Some(TemplateChildNode::Element(el)) => {
                    let parent = ParentKind::Element {
                        tag_type: el.tag_type,
                        is_transition: is_transition_tag(&el.tag),
                    };
                    traverse_children(ctx, &mut el.children, parent);
                }
                _ => {}
            }
        }
    }

    for exit in exits.into_iter().rev() {
        exit(&mut *ctx, &mut *node);
    }
}

/// Visit each child of `children` in order.
///
/// The index is re-read from the cursor after each child, so transforms may
/// replace the visited child or remove it and preceding siblings.
pub fn traverse_children<'a>(
    ctx: &mut TransformContext<'a>,
    children: &mut Vec<'a, TemplateChildNode<'a>>,
    parent: ParentKind,
) {
    let saved = ctx.cursor;
    let mut i = 0;
    while i < children.len() {
        ctx.cursor = Cursor {
            parent: Some(parent),
            child_index: i,
            has_current: true,
        };
        traverse_node(ctx, &mut TransformNode::Child(&mut *children));
        i = ctx.cursor.child_index + usize::from(ctx.cursor.has_current);
    }
    ctx.cursor = saved;
}

/// `<transition>` keeps comment siblings of conditional children out.
pub(crate) fn is_transition_tag(tag: &str) -> bool {
    matches!(tag, "transition" | "Transition")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{exit_fn, node_transform, TransformPreset};
    use crate::TransformOptions;
    use gesso_armature::parse;
    use gesso_carton::Bump;
    use std::cell::RefCell;

    fn context_with<'a>(
        allocator: &'a Bump,
        transform: crate::transform::NodeTransform<'a>,
    ) -> TransformContext<'a> {
        let preset = TransformPreset {
            node_transforms: vec![transform],
            directive_transforms: Default::default(),
            transform_hoist: None,
        };
        TransformContext::with_preset(allocator, TransformOptions::default(), preset)
    }

    #[test]
    fn test_exit_order_is_reversed() {
        let allocator = Bump::new();
        let (mut root, _) = parse(&allocator, "<div><span></span></div>");
        let log = Rc::new(RefCell::new(std::vec::Vec::new()));
        let sink = Rc::clone(&log);

        let mut ctx = context_with(
            &allocator,
            node_transform(move |ctx, node| {
                let tag = node.element(ctx.cursor)?.tag.to_string();
                sink.borrow_mut().push(format!("enter {tag}"));
                let sink = Rc::clone(&sink);
                Some(vec![exit_fn(move |_ctx, _node| {
                    sink.borrow_mut().push(format!("exit {tag}"));
                })])
            }),
        );
        traverse_node(&mut ctx, &mut TransformNode::Root(&mut root));

        assert_eq!(
            *log.borrow(),
            vec!["enter div", "enter span", "exit span", "exit div"]
        );
    }

    #[test]
    fn test_removal_keeps_siblings() {
        let allocator = Bump::new();
        let (mut root, _) = parse(&allocator, "<a></a><b></b><c></c>");
        let seen = Rc::new(RefCell::new(std::vec::Vec::new()));
        let sink = Rc::clone(&seen);

        let mut ctx = context_with(
            &allocator,
            node_transform(move |ctx, node| {
                let tag = node.element(ctx.cursor)?.tag.to_string();
                sink.borrow_mut().push(tag.clone());
                if tag == "b" {
                    // Exit callbacks of a removed node never run.
                    let _ = ctx.remove_node(node);
                    return Some(vec![exit_fn(|_ctx, _node| panic!("exit of removed node"))]);
                }
                None
            }),
        );
        traverse_node(&mut ctx, &mut TransformNode::Root(&mut root));

        assert_eq!(*seen.borrow(), vec!["a", "b", "c"]);
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn test_removing_previous_sibling() {
        let allocator = Bump::new();
        let (mut root, _) = parse(&allocator, "<a></a><b></b><c></c>");
        let seen = Rc::new(RefCell::new(std::vec::Vec::new()));
        let sink = Rc::clone(&seen);

        let mut ctx = context_with(
            &allocator,
            node_transform(move |ctx, node| {
                let tag = node.element(ctx.cursor)?.tag.to_string();
                sink.borrow_mut().push(tag.clone());
                if tag == "b" {
                    let _ = ctx.remove_child_at(node, 0);
                }
                None
            }),
        );
        traverse_node(&mut ctx, &mut TransformNode::Root(&mut root));

        assert_eq!(*seen.borrow(), vec!["a", "b", "c"]);
        assert_eq!(root.children.len(), 2);
        assert!(ctx.cursor == Cursor::DETACHED);
    }

    #[test]
    fn test_comment_and_interpolation_helpers() {
        let allocator = Bump::new();
        let (mut root, _) = parse(&allocator, "<!-- note -->{{ a }}");
        let mut ctx = context_with(&allocator, node_transform(|_ctx, _node| None));
        traverse_node(&mut ctx, &mut TransformNode::Root(&mut root));
        assert!(ctx.helpers.contains(RuntimeHelper::CreateComment));
        assert!(ctx.helpers.contains(RuntimeHelper::ToDisplayString));
    }
}
