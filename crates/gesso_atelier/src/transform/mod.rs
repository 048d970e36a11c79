//! Transform pipeline.
//!
//! A transform run walks the tree once. Node transforms see every node on
//! the way down and may hand back exit callbacks that run on the way up,
//! after the node's children are done. Directive transforms turn a single
//! directive into props for the element being built.

mod context;
mod structural;
mod traverse;

use std::rc::Rc;

use regex::Regex;
use rustc_hash::FxHashMap;

use gesso_carton::{Bump, PatchFlags, String, Vec};

use crate::ast::*;
use crate::errors::CompilerError;
use crate::options::TransformOptions;
use crate::transforms::hoist_static::hoist_static;
use crate::transforms::utils::convert_to_block;
use crate::transforms::{
    transform_element, transform_expression, transform_slot_outlet, transform_text, v_bind, v_for,
    v_if, v_memo, v_model, v_on, v_once, v_show, v_slot,
};

pub use context::{
    Cursor, ExpressionMode, ExpressionProcessor, ParentKind, Scopes, TransformContext,
    TransformError,
};
pub(crate) use context::identifier_list;
pub use structural::{create_structural_directive_transform, StructuralHandler};
pub(crate) use traverse::is_transition_tag;
pub use traverse::{traverse_children, traverse_node};

/// Node visited by a transform.
///
/// Child nodes are reached through their sibling list so a transform can
/// replace or remove the node in place; the index lives in the context's
/// [`Cursor`].
pub enum TransformNode<'n, 'a> {
    Root(&'n mut RootNode<'a>),
    Branch(&'n mut IfBranchNode<'a>),
    Child(&'n mut Vec<'a, TemplateChildNode<'a>>),
}

impl<'n, 'a> TransformNode<'n, 'a> {
    /// Child under the cursor, if it is still attached.
    pub fn current(&self, cursor: Cursor) -> Option<&TemplateChildNode<'a>> {
        match self {
            Self::Child(siblings) if cursor.has_current => siblings.get(cursor.child_index),
            _ => None,
        }
    }

    pub fn current_mut(&mut self, cursor: Cursor) -> Option<&mut TemplateChildNode<'a>> {
        match self {
            Self::Child(siblings) if cursor.has_current => siblings.get_mut(cursor.child_index),
            _ => None,
        }
    }

    pub fn element(&self, cursor: Cursor) -> Option<&ElementNode<'a>> {
        self.current(cursor).and_then(TemplateChildNode::as_element)
    }

    pub fn element_mut(&mut self, cursor: Cursor) -> Option<&mut ElementNode<'a>> {
        self.current_mut(cursor)
            .and_then(TemplateChildNode::as_element_mut)
    }

    /// Whether the visited child was detached from its parent.
    pub fn is_removed(&self, cursor: Cursor) -> bool {
        matches!(self, Self::Child(_)) && !cursor.has_current
    }

    /// Child list owned by the visited node, for the kinds that have one.
    pub fn children_mut(&mut self, cursor: Cursor) -> Option<&mut Vec<'a, TemplateChildNode<'a>>> {
        match self {
            Self::Root(root) => Some(&mut root.children),
            Self::Branch(branch) => Some(&mut branch.children),
            Self::Child(siblings) => {
                if !cursor.has_current {
                    return None;
                }
                match siblings.get_mut(cursor.child_index)? {
                    TemplateChildNode::Element(el) => Some(&mut el.children),
                    TemplateChildNode::For(for_node) => Some(&mut for_node.children),
                    _ => None,
                }
            }
        }
    }
}

/// Deferred work run after the node's children were traversed
pub type ExitFn<'a> =
    std::boxed::Box<dyn for<'n> FnOnce(&mut TransformContext<'a>, &mut TransformNode<'n, 'a>) + 'a>;

/// Whole-node transform
pub type NodeTransform<'a> = Rc<
    dyn for<'n> Fn(
            &mut TransformContext<'a>,
            &mut TransformNode<'n, 'a>,
        ) -> Option<std::vec::Vec<ExitFn<'a>>>
        + 'a,
>;

/// Per-directive transform producing props for the element being built
pub type DirectiveTransform<'a> = fn(
    &DirectiveNode<'a>,
    &ElementNode<'a>,
    &mut TransformContext<'a>,
) -> DirectiveTransformResult<'a>;

/// Hook run on a child list after the static optimizer hoisted some of it
pub type TransformHoist<'a> =
    fn(&mut Vec<'a, TemplateChildNode<'a>>, &mut TransformContext<'a>, ParentKind);

/// Box a closure as an [`ExitFn`].
pub fn exit_fn<'a, F>(f: F) -> ExitFn<'a>
where
    F: for<'n> FnOnce(&mut TransformContext<'a>, &mut TransformNode<'n, 'a>) + 'a,
{
    std::boxed::Box::new(f)
}

/// Share a function or closure as a [`NodeTransform`].
pub fn node_transform<'a, F>(f: F) -> NodeTransform<'a>
where
    F: for<'n> Fn(&mut TransformContext<'a>, &mut TransformNode<'n, 'a>) -> Option<std::vec::Vec<ExitFn<'a>>>
        + 'a,
{
    Rc::new(f)
}

/// Runtime support a directive needs besides its props
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeedRuntime {
    #[default]
    None,
    /// User directive resolved with `resolveDirective`
    Resolve,
    /// Built-in runtime directive
    Helper(RuntimeHelper),
}

/// Output of a [`DirectiveTransform`]
#[derive(Debug, Default)]
pub struct DirectiveTransformResult<'a> {
    pub props: std::vec::Vec<Property<'a>>,
    pub need_runtime: NeedRuntime,
}

impl<'a> DirectiveTransformResult<'a> {
    pub fn props(props: std::vec::Vec<Property<'a>>) -> Self {
        Self {
            props,
            need_runtime: NeedRuntime::None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Selects the directives a structural transform handles
#[derive(Debug, Clone)]
pub enum DirectiveMatcher {
    Name(&'static str),
    Names(&'static [&'static str]),
    Pattern(Regex),
}

impl DirectiveMatcher {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Name(expected) => *expected == name,
            Self::Names(names) => names.contains(&name),
            Self::Pattern(re) => re.is_match(name),
        }
    }
}

/// Node and directive transforms installed in a context
pub struct TransformPreset<'a> {
    pub node_transforms: std::vec::Vec<NodeTransform<'a>>,
    pub directive_transforms: FxHashMap<String, DirectiveTransform<'a>>,
    pub transform_hoist: Option<TransformHoist<'a>>,
}

impl<'a> TransformPreset<'a> {
    /// The default pipeline.
    ///
    /// Order matters: `v-once` and the structural directives must see an
    /// element before the element transform builds its codegen, and text
    /// merging must finish (its exit runs first) before parents look at
    /// their children.
    pub fn base() -> Self {
        let node_transforms = vec![
            node_transform(v_once::transform_once),
            v_if::transform_if(),
            node_transform(v_memo::transform_memo),
            v_for::transform_for(),
            node_transform(v_slot::track_v_for_slot_scopes),
            node_transform(transform_expression::transform_expression),
            node_transform(transform_slot_outlet::transform_slot_outlet),
            node_transform(transform_element::transform_element),
            node_transform(v_slot::track_slot_scopes),
            node_transform(transform_text::transform_text),
        ];

        let mut directive_transforms: FxHashMap<String, DirectiveTransform<'a>> =
            FxHashMap::default();
        directive_transforms.insert(String::const_new("bind"), v_bind::transform_bind);
        directive_transforms.insert(String::const_new("on"), v_on::transform_on);
        directive_transforms.insert(String::const_new("model"), v_model::transform_model);
        directive_transforms.insert(String::const_new("show"), v_show::transform_show);

        Self {
            node_transforms,
            directive_transforms,
            transform_hoist: None,
        }
    }

    /// Append a node transform after the built-in ones.
    pub fn push_node_transform(mut self, transform: NodeTransform<'a>) -> Self {
        self.node_transforms.push(transform);
        self
    }

    pub fn add_directive_transform(
        mut self,
        name: impl Into<String>,
        transform: DirectiveTransform<'a>,
    ) -> Self {
        self.directive_transforms.insert(name.into(), transform);
        self
    }

    pub fn with_transform_hoist(mut self, hook: TransformHoist<'a>) -> Self {
        self.transform_hoist = Some(hook);
        self
    }
}

impl Default for TransformPreset<'_> {
    fn default() -> Self {
        Self::base()
    }
}

/// Transform `root` with the default preset. Returns every reported error.
pub fn transform<'a>(
    allocator: &'a Bump,
    root: &mut RootNode<'a>,
    options: TransformOptions,
) -> std::vec::Vec<CompilerError> {
    let mut ctx = TransformContext::new(allocator, options);
    transform_with_context(root, &mut ctx);
    std::mem::take(&mut ctx.errors)
}

/// Transform `root` with a prepared context.
pub fn transform_with_context<'a>(root: &mut RootNode<'a>, ctx: &mut TransformContext<'a>) {
    ctx.cursor = Cursor::DETACHED;
    traverse_node(ctx, &mut TransformNode::Root(root));

    if ctx.options.hoist_static {
        hoist_static(root, ctx);
    }
    if !ctx.options.ssr {
        create_root_codegen(root, ctx);
    }
    finalize_root(root, ctx);
}

/// Attach the top-level codegen descriptor.
fn create_root_codegen<'a>(root: &mut RootNode<'a>, ctx: &mut TransformContext<'a>) {
    match root.children.len() {
        0 => {}
        1 => {
            if let TemplateChildNode::Element(el) = &mut root.children[0] {
                if !el.is_slot_outlet() {
                    if let Some(JsChildNode::VNodeCall(call)) = &mut el.codegen_node {
                        convert_to_block(call, ctx);
                    }
                }
            }
            root.codegen_node = Some(JsChildNode::Tree(TreeRef::OnlyChild));
        }
        _ => {
            let mut patch_flag = PatchFlags::STABLE_FRAGMENT;
            let real_children = root
                .children
                .iter()
                .filter(|c| !matches!(c, TemplateChildNode::Comment(_)))
                .count();
            if ctx.options.dev && real_children == 1 {
                patch_flag |= PatchFlags::DEV_ROOT_FRAGMENT;
            }

            ctx.helper(RuntimeHelper::Fragment);
            ctx.helpers.require_vnode(true, false, ctx.options.ssr);
            root.codegen_node = Some(JsChildNode::VNodeCall(gesso_carton::Box::new_in(
                VNodeCall {
                    tag: VNodeTag::Symbol(RuntimeHelper::Fragment),
                    props: None,
                    children: Some(VNodeChildren::Tree(TreeRef::Children)),
                    patch_flag: Some(patch_flag),
                    dynamic_props: None,
                    directives: None,
                    is_block: true,
                    disable_tracking: false,
                    is_component: false,
                    loc: SourceLocation::STUB,
                },
                ctx.allocator,
            )));
        }
    }
}

/// Copy the collected bookkeeping into the root.
fn finalize_root<'a>(root: &mut RootNode<'a>, ctx: &mut TransformContext<'a>) {
    root.helpers.clear();
    root.helpers.extend(ctx.helpers.sorted());
    root.components.clear();
    root.components.extend(ctx.components.iter().cloned());
    root.directives.clear();
    root.directives.extend(ctx.directives.iter().cloned());
    root.hoists.extend(ctx.hoists.drain(..));
    root.imports.extend(ctx.imports.drain(..));
    root.cached = ctx.cached;
    root.temps = ctx.temps;
    root.transformed = true;

    tracing::debug!(
        helpers = root.helpers.len(),
        hoists = root.hoists.len(),
        cached = root.cached,
        errors = ctx.errors.len(),
        "transform finished"
    );
}

/// Helper a vnode call of this shape needs.
pub(crate) fn vnode_call_helpers(ctx: &mut TransformContext<'_>, call: &VNodeCall<'_>) {
    ctx.helpers.require_vnode(call.is_block, call.is_component, ctx.options.ssr);
    if call.directives.is_some() {
        ctx.helper(RuntimeHelper::WithDirectives);
    }
}
