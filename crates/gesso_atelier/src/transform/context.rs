//! Transform context.
//!
//! The single mutable state threaded through every transform: helper
//! usage, hoists, cache slots, identifier scopes, the traversal cursor and
//! the error channel.

use std::rc::Rc;

use compact_str::format_compact;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use gesso_carton::{Box, Bump, String, Vec};

use super::{DirectiveTransform, NodeTransform, TransformHoist, TransformNode, TransformPreset};
use crate::ast::*;
use crate::errors::{CompilerError, ErrorCode};
use crate::options::TransformOptions;
use crate::runtime_helpers::RuntimeHelpers;
use crate::transforms::transform_expression::ScanningProcessor;

/// Contract violations of the node mutation API.
///
/// These are never caused by template content; a transform that triggers
/// one asked for something the traversal cannot provide.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("there is no node under the cursor")]
    NoCurrentNode,
    #[error("the root node has no parent and cannot be replaced or removed")]
    NoParent,
    #[error("child index {index} is out of bounds for {len} siblings")]
    OutOfBounds { index: usize, len: usize },
}

/// Kind of node owning the child list being traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentKind {
    Root,
    Element {
        tag_type: ElementType,
        is_transition: bool,
    },
    IfBranch,
    For,
}

/// Position of the node being visited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub parent: Option<ParentKind>,
    pub child_index: usize,
    /// Cleared once the visited node is removed from its parent.
    pub has_current: bool,
}

impl Cursor {
    pub const DETACHED: Self = Self {
        parent: None,
        child_index: 0,
        has_current: false,
    };
}

/// Nesting depth of scope-introducing constructs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scopes {
    pub v_for: u32,
    pub v_slot: u32,
    pub v_once: u32,
}

/// How an expression is read by the expression service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpressionMode {
    #[default]
    Normal,
    /// Function parameters: identifiers are declared, never prefixed.
    Params,
    /// Statement list of an inline handler.
    Statements,
}

/// Rewrites template expressions so they read from the render context.
///
/// Implementations report syntax problems through the context and must
/// always return a usable expression.
pub trait ExpressionProcessor {
    fn process<'a>(
        &self,
        ctx: &mut TransformContext<'a>,
        exp: ExpressionNode<'a>,
        mode: ExpressionMode,
    ) -> ExpressionNode<'a>;
}

/// Transform context
pub struct TransformContext<'a> {
    pub allocator: &'a Bump,
    pub options: TransformOptions,
    pub(crate) node_transforms: Rc<[NodeTransform<'a>]>,
    pub(crate) directive_transforms: FxHashMap<String, DirectiveTransform<'a>>,
    pub(crate) transform_hoist: Option<TransformHoist<'a>>,
    expression_processor: Rc<dyn ExpressionProcessor>,

    pub helpers: RuntimeHelpers,
    pub components: std::vec::Vec<String>,
    pub directives: std::vec::Vec<String>,
    pub hoists: std::vec::Vec<Option<JsChildNode<'a>>>,
    pub imports: std::vec::Vec<ImportItem<'a>>,
    pub cached: u32,
    pub temps: u32,

    /// Scope-local identifiers with their declaration counts
    pub identifiers: FxHashMap<String, u32>,
    pub scopes: Scopes,
    pub in_v_once: bool,
    pub cursor: Cursor,
    pub errors: std::vec::Vec<CompilerError>,

    pub(crate) constant_cache: FxHashMap<NodeId, ConstantType>,
    pub(crate) once_seen: FxHashSet<NodeId>,
    pub(crate) memo_seen: FxHashSet<NodeId>,
}

impl<'a> TransformContext<'a> {
    /// Context with the default transform preset.
    pub fn new(allocator: &'a Bump, options: TransformOptions) -> Self {
        Self::with_preset(allocator, options, TransformPreset::base())
    }

    pub fn with_preset(
        allocator: &'a Bump,
        options: TransformOptions,
        preset: TransformPreset<'a>,
    ) -> Self {
        let TransformPreset {
            node_transforms,
            directive_transforms,
            transform_hoist,
        } = preset;

        let mut ctx = Self {
            allocator,
            options,
            node_transforms: node_transforms.into(),
            directive_transforms,
            transform_hoist,
            expression_processor: Rc::new(ScanningProcessor),
            helpers: RuntimeHelpers::default(),
            components: std::vec::Vec::new(),
            directives: std::vec::Vec::new(),
            hoists: std::vec::Vec::new(),
            imports: std::vec::Vec::new(),
            cached: 0,
            temps: 0,
            identifiers: FxHashMap::default(),
            scopes: Scopes::default(),
            in_v_once: false,
            cursor: Cursor::DETACHED,
            errors: std::vec::Vec::new(),
            constant_cache: FxHashMap::default(),
            once_seen: FxHashSet::default(),
            memo_seen: FxHashSet::default(),
        };
        ctx.check_options();
        ctx
    }

    /// Replace the expression service.
    pub fn with_expression_processor(mut self, processor: Rc<dyn ExpressionProcessor>) -> Self {
        self.expression_processor = processor;
        self
    }

    /// Report option combinations this build cannot honor.
    fn check_options(&mut self) {
        if self.options.cache_handlers && !self.options.prefix_identifiers {
            self.on_error(ErrorCode::XCacheHandlerNotSupported, None);
            self.options.cache_handlers = false;
        }
        if self.options.scope_id.is_some() && !self.options.prefix_identifiers {
            self.on_error(ErrorCode::XScopeIdNotSupported, None);
        }
    }

    // ------------------------------------------------------------------
    // Helpers and assets
    // ------------------------------------------------------------------

    /// Require a runtime helper
    pub fn helper(&mut self, helper: RuntimeHelper) -> RuntimeHelper {
        self.helpers.require(helper);
        helper
    }

    /// Release a runtime helper
    pub fn remove_helper(&mut self, helper: RuntimeHelper) {
        self.helpers.release(helper);
    }

    pub fn add_component(&mut self, name: &str) {
        if !self.components.iter().any(|c| c.as_str() == name) {
            self.components.push(String::from(name));
        }
    }

    pub fn add_directive(&mut self, name: &str) {
        if !self.directives.iter().any(|d| d.as_str() == name) {
            self.directives.push(String::from(name));
        }
    }

    pub fn add_import(&mut self, exp: SimpleExpressionNode<'a>, path: impl Into<String>) {
        self.imports.push(ImportItem {
            exp: Box::new_in(exp, self.allocator),
            path: path.into(),
        });
    }

    /// Move `exp` into the hoist registry and return the reference to it.
    pub fn hoist(&mut self, exp: JsChildNode<'a>) -> SimpleExpressionNode<'a> {
        self.hoists.push(Some(exp));
        let name = format_compact!("_hoisted_{}", self.hoists.len());
        tracing::debug!(name = %name, "hoisted static node");
        SimpleExpressionNode::with_const_type(
            name,
            false,
            SourceLocation::STUB,
            ConstantType::CanHoist,
        )
    }

    /// Wrap `value` in the next cache slot.
    pub fn cache(&mut self, value: JsChildNode<'a>, is_vnode: bool) -> JsChildNode<'a> {
        let index = self.cached;
        self.cached += 1;
        tracing::debug!(index, is_vnode, "allocated cache slot");
        JsChildNode::Cache(Box::new_in(
            CacheExpression {
                index,
                value,
                need_pause_tracking: is_vnode,
                in_v_once: self.in_v_once,
                need_array_spread: false,
                loc: SourceLocation::STUB,
            },
            self.allocator,
        ))
    }

    /// Allocate a cache slot without wrapping anything (`withMemo`, memoized loops).
    pub fn next_cache_index(&mut self) -> u32 {
        let index = self.cached;
        self.cached += 1;
        tracing::debug!(index, "allocated cache slot");
        index
    }

    // ------------------------------------------------------------------
    // Identifier scopes
    // ------------------------------------------------------------------

    pub fn track(&mut self, name: &str) {
        *self.identifiers.entry(String::from(name)).or_insert(0) += 1;
    }

    pub fn untrack(&mut self, name: &str) {
        if let Some(count) = self.identifiers.get_mut(name) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.identifiers.remove(name);
            }
        }
    }

    /// Check if `name` is declared by an enclosing scope
    pub fn is_tracked(&self, name: &str) -> bool {
        self.identifiers.contains_key(name)
    }

    /// Declare the identifiers introduced by a params expression.
    pub fn add_identifiers(&mut self, exp: &ExpressionNode<'a>) {
        match exp {
            ExpressionNode::Simple(simple) => match &simple.identifiers {
                Some(ids) => ids.iter().for_each(|id| self.track(id)),
                None => self.track(&simple.content),
            },
            ExpressionNode::Compound(compound) => {
                if let Some(ids) = &compound.identifiers {
                    ids.iter().for_each(|id| self.track(id));
                }
            }
        }
    }

    pub fn remove_identifiers(&mut self, exp: &ExpressionNode<'a>) {
        match exp {
            ExpressionNode::Simple(simple) => match &simple.identifiers {
                Some(ids) => ids.iter().for_each(|id| self.untrack(id)),
                None => self.untrack(&simple.content),
            },
            ExpressionNode::Compound(compound) => {
                if let Some(ids) = &compound.identifiers {
                    ids.iter().for_each(|id| self.untrack(id));
                }
            }
        }
    }

    /// Run `exp` through the expression service.
    pub fn process_expression(
        &mut self,
        exp: ExpressionNode<'a>,
        mode: ExpressionMode,
    ) -> ExpressionNode<'a> {
        let processor = Rc::clone(&self.expression_processor);
        processor.process(self, exp, mode)
    }

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    pub fn directive_transform(&self, name: &str) -> Option<DirectiveTransform<'a>> {
        self.directive_transforms.get(name).copied()
    }

    pub fn has_directive_transform(&self, name: &str) -> bool {
        self.directive_transforms.contains_key(name)
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    pub fn on_error(&mut self, code: ErrorCode, loc: Option<&SourceLocation>) {
        self.report(CompilerError::new(code, loc.cloned()));
    }

    pub fn report(&mut self, error: CompilerError) {
        tracing::debug!(code = ?error.code, message = %error.message, "transform error");
        if let Some(hook) = self.options.on_error {
            hook(&error);
        }
        self.errors.push(error);
    }

    // ------------------------------------------------------------------
    // Node mutation
    // ------------------------------------------------------------------

    /// Swap the node under the cursor for `replacement`, returning the old one.
    pub fn replace_node(
        &mut self,
        node: &mut TransformNode<'_, 'a>,
        replacement: TemplateChildNode<'a>,
    ) -> Result<TemplateChildNode<'a>, TransformError> {
        let TransformNode::Child(siblings) = node else {
            return Err(TransformError::NoParent);
        };
        if !self.cursor.has_current {
            return Err(TransformError::NoCurrentNode);
        }
        let len = siblings.len();
        let index = self.cursor.child_index;
        let slot = siblings
            .get_mut(index)
            .ok_or(TransformError::OutOfBounds { index, len })?;
        tracing::trace!(
            index,
            from = slot.kind(),
            to = replacement.kind(),
            "replaced node"
        );
        Ok(std::mem::replace(slot, replacement))
    }

    /// Detach the node under the cursor.
    pub fn remove_node(
        &mut self,
        node: &mut TransformNode<'_, 'a>,
    ) -> Result<TemplateChildNode<'a>, TransformError> {
        if !self.cursor.has_current {
            return Err(TransformError::NoCurrentNode);
        }
        self.remove_child_at(node, self.cursor.child_index)
    }

    /// Detach the sibling at `index`, keeping the cursor on the visited node.
    pub fn remove_child_at(
        &mut self,
        node: &mut TransformNode<'_, 'a>,
        index: usize,
    ) -> Result<TemplateChildNode<'a>, TransformError> {
        let TransformNode::Child(siblings) = node else {
            return Err(TransformError::NoParent);
        };
        if index >= siblings.len() {
            return Err(TransformError::OutOfBounds {
                index,
                len: siblings.len(),
            });
        }

        let removed = siblings.remove(index);
        tracing::trace!(index, kind = removed.kind(), "removed node");
        if self.cursor.has_current {
            if index == self.cursor.child_index {
                self.cursor.has_current = false;
            } else if index < self.cursor.child_index {
                self.cursor.child_index -= 1;
            }
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for TransformContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformContext")
            .field("helpers", &self.helpers)
            .field("hoists", &self.hoists.len())
            .field("cached", &self.cached)
            .field("scopes", &self.scopes)
            .field("cursor", &self.cursor)
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

/// Arena list of identifier names declared by a params expression.
pub(crate) fn identifier_list<'a>(
    allocator: &'a Bump,
    names: impl IntoIterator<Item = String>,
) -> Vec<'a, String> {
    let mut list = Vec::new_in(allocator);
    list.extend(names);
    list
}
