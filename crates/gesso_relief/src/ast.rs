//! Template tree and codegen descriptor types.
//!
//! Every node lives in a bumpalo arena. Template nodes are produced by the
//! reader and reshaped by the transforms; codegen descriptors (`JsChildNode`
//! and friends) are attached by the transforms and consumed by codegen.
//!
//! Descriptors never alias template children. When a descriptor renders
//! children that are still owned by the tree it points at them with a
//! [`TreeRef`], resolved relative to the node that owns the descriptor.

use serde::{Deserialize, Serialize};
use gesso_carton::{Box, Bump, CloneIn, PatchFlags, String, Vec};

/// Element type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ElementType {
    #[default]
    Element = 0,
    Component = 1,
    Slot = 2,
    Template = 3,
}

/// Namespace for elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Namespace {
    #[default]
    Html = 0,
    Svg = 1,
    MathMl = 2,
}

/// How safely a subtree's output can be reused across renders.
///
/// The order is meaningful: a higher rank carries every guarantee of the
/// lower ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[repr(u8)]
pub enum ConstantType {
    #[default]
    NotConstant = 0,
    CanSkipPatch = 1,
    CanHoist = 2,
    CanStringify = 3,
}

/// Source position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    /// Byte offset from start of file
    pub offset: u32,
    /// 1-indexed line number
    pub line: u32,
    /// 1-indexed column number
    pub column: u32,
}

impl Position {
    pub const fn new(offset: u32, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

/// Source location span [start, end)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
    pub source: String,
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::STUB
    }
}

impl SourceLocation {
    /// Location for generated nodes
    pub const STUB: Self = Self {
        start: Position::new(0, 1, 1),
        end: Position::new(0, 1, 1),
        source: String::const_new(""),
    };

    pub fn new(start: Position, end: Position, source: impl Into<String>) -> Self {
        Self {
            start,
            end,
            source: source.into(),
        }
    }
}

/// Identity of an arena-allocated node.
///
/// Arena allocations never move or get reused within one compilation, so the
/// address is a stable key for side tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub fn of<T>(node: &T) -> Self {
        Self(node as *const T as usize)
    }
}

/// Root of a template
#[derive(Debug)]
pub struct RootNode<'a> {
    pub children: Vec<'a, TemplateChildNode<'a>>,
    pub helpers: Vec<'a, RuntimeHelper>,
    pub components: Vec<'a, String>,
    pub directives: Vec<'a, String>,
    pub hoists: Vec<'a, Option<JsChildNode<'a>>>,
    pub imports: Vec<'a, ImportItem<'a>>,
    pub cached: u32,
    pub temps: u32,
    pub source: String,
    pub loc: SourceLocation,
    pub codegen_node: Option<JsChildNode<'a>>,
    pub transformed: bool,
}

impl<'a> RootNode<'a> {
    pub fn new(allocator: &'a Bump, source: impl Into<String>) -> Self {
        Self {
            children: Vec::new_in(allocator),
            helpers: Vec::new_in(allocator),
            components: Vec::new_in(allocator),
            directives: Vec::new_in(allocator),
            hoists: Vec::new_in(allocator),
            imports: Vec::new_in(allocator),
            cached: 0,
            temps: 0,
            source: source.into(),
            loc: SourceLocation::STUB,
            codegen_node: None,
            transformed: false,
        }
    }

    /// Whether the finalized helper set contains `helper`.
    pub fn has_helper(&self, helper: RuntimeHelper) -> bool {
        self.helpers.contains(&helper)
    }
}

/// Import item for code generation
#[derive(Debug)]
pub struct ImportItem<'a> {
    pub exp: Box<'a, SimpleExpressionNode<'a>>,
    pub path: String,
}

macro_rules! runtime_helpers {
    ($($variant:ident => $name:literal,)*) => {
        /// Runtime helper symbols.
        ///
        /// Declaration order is the order helpers are listed on the root.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum RuntimeHelper {
            $($variant,)*
        }

        impl RuntimeHelper {
            pub const ALL: &'static [RuntimeHelper] = &[$(Self::$variant,)*];

            /// Name exported by the runtime.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

runtime_helpers! {
    Fragment => "Fragment",
    Teleport => "Teleport",
    Suspense => "Suspense",
    KeepAlive => "KeepAlive",
    BaseTransition => "BaseTransition",
    Transition => "Transition",
    TransitionGroup => "TransitionGroup",
    OpenBlock => "openBlock",
    CreateBlock => "createBlock",
    CreateElementBlock => "createElementBlock",
    CreateVNode => "createVNode",
    CreateElementVNode => "createElementVNode",
    CreateComment => "createCommentVNode",
    CreateText => "createTextVNode",
    CreateStatic => "createStaticVNode",
    ResolveComponent => "resolveComponent",
    ResolveDynamicComponent => "resolveDynamicComponent",
    ResolveDirective => "resolveDirective",
    WithDirectives => "withDirectives",
    RenderList => "renderList",
    RenderSlot => "renderSlot",
    CreateSlots => "createSlots",
    ToDisplayString => "toDisplayString",
    MergeProps => "mergeProps",
    NormalizeClass => "normalizeClass",
    NormalizeStyle => "normalizeStyle",
    NormalizeProps => "normalizeProps",
    GuardReactiveProps => "guardReactiveProps",
    ToHandlers => "toHandlers",
    Camelize => "camelize",
    Capitalize => "capitalize",
    ToHandlerKey => "toHandlerKey",
    SetBlockTracking => "setBlockTracking",
    WithCtx => "withCtx",
    Unref => "unref",
    IsRef => "isRef",
    WithMemo => "withMemo",
    IsMemoSame => "isMemoSame",
    VShow => "vShow",
    VModelText => "vModelText",
    VModelCheckbox => "vModelCheckbox",
    VModelRadio => "vModelRadio",
    VModelSelect => "vModelSelect",
    VModelDynamic => "vModelDynamic",
    WithModifiers => "withModifiers",
    WithKeys => "withKeys",
}

impl RuntimeHelper {
    /// Built-in component behind a tag name, if any.
    pub fn core_component(tag: &str) -> Option<Self> {
        match tag {
            "Teleport" | "teleport" => Some(Self::Teleport),
            "Suspense" | "suspense" => Some(Self::Suspense),
            "KeepAlive" | "keep-alive" => Some(Self::KeepAlive),
            "BaseTransition" | "base-transition" => Some(Self::BaseTransition),
            "Transition" | "transition" => Some(Self::Transition),
            "TransitionGroup" | "transition-group" => Some(Self::TransitionGroup),
            _ => None,
        }
    }
}

/// Template child node
#[derive(Debug)]
pub enum TemplateChildNode<'a> {
    Element(Box<'a, ElementNode<'a>>),
    Text(Box<'a, TextNode>),
    Comment(Box<'a, CommentNode>),
    Interpolation(Box<'a, InterpolationNode<'a>>),
    If(Box<'a, IfNode<'a>>),
    For(Box<'a, ForNode<'a>>),
    TextCall(Box<'a, TextCallNode<'a>>),
    CompoundExpression(Box<'a, CompoundExpressionNode<'a>>),
}

impl<'a> TemplateChildNode<'a> {
    /// Short name of the node kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Element(_) => "element",
            Self::Text(_) => "text",
            Self::Comment(_) => "comment",
            Self::Interpolation(_) => "interpolation",
            Self::If(_) => "if",
            Self::For(_) => "for",
            Self::TextCall(_) => "text-call",
            Self::CompoundExpression(_) => "compound",
        }
    }

    pub fn loc(&self) -> &SourceLocation {
        match self {
            Self::Element(n) => &n.loc,
            Self::Text(n) => &n.loc,
            Self::Comment(n) => &n.loc,
            Self::Interpolation(n) => &n.loc,
            Self::If(n) => &n.loc,
            Self::For(n) => &n.loc,
            Self::TextCall(n) => &n.loc,
            Self::CompoundExpression(n) => &n.loc,
        }
    }

    /// Text or interpolation, the children that merge into text runs.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_) | Self::Interpolation(_))
    }

    pub fn as_element(&self) -> Option<&ElementNode<'a>> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementNode<'a>> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Codegen attached to this node, for the kinds that carry one.
    pub fn codegen_node(&self) -> Option<&JsChildNode<'a>> {
        match self {
            Self::Element(n) => n.codegen_node.as_ref(),
            Self::If(n) => n.codegen_node.as_ref(),
            Self::For(n) => n.codegen_node.as_ref(),
            Self::TextCall(n) => n.codegen_node.as_ref(),
            _ => None,
        }
    }

    pub fn codegen_node_mut(&mut self) -> Option<&mut Option<JsChildNode<'a>>> {
        match self {
            Self::Element(n) => Some(&mut n.codegen_node),
            Self::If(n) => Some(&mut n.codegen_node),
            Self::For(n) => Some(&mut n.codegen_node),
            Self::TextCall(n) => Some(&mut n.codegen_node),
            _ => None,
        }
    }
}

/// Element node
#[derive(Debug)]
pub struct ElementNode<'a> {
    pub ns: Namespace,
    pub tag: String,
    pub tag_type: ElementType,
    pub props: Vec<'a, PropNode<'a>>,
    pub children: Vec<'a, TemplateChildNode<'a>>,
    pub is_self_closing: bool,
    pub loc: SourceLocation,
    /// Set by the element transform (or a structural wrapper around it).
    pub codegen_node: Option<JsChildNode<'a>>,
}

impl<'a> ElementNode<'a> {
    pub fn new(allocator: &'a Bump, tag: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            ns: Namespace::Html,
            tag: tag.into(),
            tag_type: ElementType::Element,
            props: Vec::new_in(allocator),
            children: Vec::new_in(allocator),
            is_self_closing: false,
            loc,
            codegen_node: None,
        }
    }

    /// Find a directive by name. Directives without a value are skipped
    /// unless `allow_empty` is set.
    pub fn find_dir(&self, name: &str, allow_empty: bool) -> Option<&DirectiveNode<'a>> {
        self.props.iter().find_map(|prop| match prop {
            PropNode::Directive(dir)
                if dir.name == name && (allow_empty || dir.exp.is_some()) =>
            {
                Some(&**dir)
            }
            _ => None,
        })
    }

    pub fn has_dir(&self, name: &str) -> bool {
        self.find_dir(name, true).is_some()
    }

    /// Find a prop by name, either a static attribute or a `v-bind:name`.
    pub fn find_prop(
        &self,
        name: &str,
        dynamic_only: bool,
        allow_empty: bool,
    ) -> Option<&PropNode<'a>> {
        self.props.iter().find(|prop| match prop {
            PropNode::Attribute(attr) => {
                !dynamic_only && attr.name == name && (allow_empty || attr.value.is_some())
            }
            PropNode::Directive(dir) => {
                dir.name == "bind"
                    && (allow_empty || dir.exp.is_some())
                    && dir.arg.as_ref().is_some_and(|arg| arg.is_static_named(name))
            }
        })
    }

    pub fn is_template(&self) -> bool {
        self.tag_type == ElementType::Template
    }

    /// `<slot>` outlet.
    pub fn is_slot_outlet(&self) -> bool {
        self.tag_type == ElementType::Slot
    }

    /// `<template v-slot>` wrapper owned by a component.
    pub fn is_template_with_slot(&self) -> bool {
        self.is_template()
            && self
                .props
                .iter()
                .any(|p| matches!(p, PropNode::Directive(d) if d.name == "slot"))
    }
}

/// Prop node (attribute or directive)
#[derive(Debug)]
pub enum PropNode<'a> {
    Attribute(Box<'a, AttributeNode>),
    Directive(Box<'a, DirectiveNode<'a>>),
}

impl<'a> PropNode<'a> {
    pub fn loc(&self) -> &SourceLocation {
        match self {
            Self::Attribute(attr) => &attr.loc,
            Self::Directive(dir) => &dir.loc,
        }
    }
}

/// Attribute node
#[derive(Debug, Clone)]
pub struct AttributeNode {
    pub name: String,
    pub name_loc: SourceLocation,
    pub value: Option<TextNode>,
    pub loc: SourceLocation,
}

impl AttributeNode {
    pub fn new(name: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            name: name.into(),
            name_loc: loc.clone(),
            value: None,
            loc,
        }
    }
}

/// Directive node
#[derive(Debug)]
pub struct DirectiveNode<'a> {
    /// Normalized name without prefix (`if`, `bind`, `on`, ...)
    pub name: String,
    /// Name as written (`v-if`, `:`, `@`, `#`)
    pub raw_name: Option<String>,
    pub exp: Option<ExpressionNode<'a>>,
    pub arg: Option<ExpressionNode<'a>>,
    pub modifiers: Vec<'a, SimpleExpressionNode<'a>>,
    /// Alias clause of a `v-for`, parsed once and reused.
    pub for_parse_result: Option<ForParseResult<'a>>,
    pub loc: SourceLocation,
}

impl<'a> DirectiveNode<'a> {
    pub fn new(allocator: &'a Bump, name: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            name: name.into(),
            raw_name: None,
            exp: None,
            arg: None,
            modifiers: Vec::new_in(allocator),
            for_parse_result: None,
            loc,
        }
    }

    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.iter().any(|m| m.content == name)
    }

    /// Whether the argument is the static name `name`.
    pub fn is_static_arg(&self, name: &str) -> bool {
        self.arg.as_ref().is_some_and(|arg| arg.is_static_named(name))
    }
}

/// Text node
#[derive(Debug, Clone)]
pub struct TextNode {
    pub content: String,
    pub loc: SourceLocation,
}

impl TextNode {
    pub fn new(content: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            content: content.into(),
            loc,
        }
    }
}

/// Comment node
#[derive(Debug, Clone)]
pub struct CommentNode {
    pub content: String,
    pub loc: SourceLocation,
}

impl CommentNode {
    pub fn new(content: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            content: content.into(),
            loc,
        }
    }
}

/// `{{ expression }}`
#[derive(Debug)]
pub struct InterpolationNode<'a> {
    pub content: ExpressionNode<'a>,
    pub loc: SourceLocation,
}

/// Expression node (simple or compound)
#[derive(Debug)]
pub enum ExpressionNode<'a> {
    Simple(Box<'a, SimpleExpressionNode<'a>>),
    Compound(Box<'a, CompoundExpressionNode<'a>>),
}

impl<'a> ExpressionNode<'a> {
    pub fn simple(allocator: &'a Bump, node: SimpleExpressionNode<'a>) -> Self {
        Self::Simple(Box::new_in(node, allocator))
    }

    pub fn loc(&self) -> &SourceLocation {
        match self {
            Self::Simple(exp) => &exp.loc,
            Self::Compound(exp) => &exp.loc,
        }
    }

    pub fn as_simple(&self) -> Option<&SimpleExpressionNode<'a>> {
        match self {
            Self::Simple(exp) => Some(exp),
            Self::Compound(_) => None,
        }
    }

    /// Static simple expression (a literal key or argument).
    pub fn is_static_exp(&self) -> bool {
        matches!(self, Self::Simple(exp) if exp.is_static)
    }

    pub fn is_static_named(&self, name: &str) -> bool {
        matches!(self, Self::Simple(exp) if exp.is_static && exp.content == name)
    }

    /// Simple content, or the source text of a compound expression.
    pub fn content(&self) -> &str {
        match self {
            Self::Simple(exp) => &exp.content,
            Self::Compound(exp) => &exp.loc.source,
        }
    }

    pub fn set_handler_key(&mut self) {
        match self {
            Self::Simple(exp) => exp.is_handler_key = true,
            Self::Compound(exp) => exp.is_handler_key = true,
        }
    }

    pub fn is_handler_key(&self) -> bool {
        match self {
            Self::Simple(exp) => exp.is_handler_key,
            Self::Compound(exp) => exp.is_handler_key,
        }
    }
}

/// Simple expression
#[derive(Debug)]
pub struct SimpleExpressionNode<'a> {
    pub content: String,
    pub is_static: bool,
    pub const_type: ConstantType,
    pub loc: SourceLocation,
    /// Identifiers declared by this expression when used as params.
    pub identifiers: Option<Vec<'a, String>>,
    /// Key produced by an event directive (`onClick`).
    pub is_handler_key: bool,
}

impl<'a> SimpleExpressionNode<'a> {
    /// Static expressions start out stringifiable, dynamic ones not constant.
    pub fn new(content: impl Into<String>, is_static: bool, loc: SourceLocation) -> Self {
        let const_type = if is_static {
            ConstantType::CanStringify
        } else {
            ConstantType::NotConstant
        };
        Self::with_const_type(content, is_static, loc, const_type)
    }

    pub fn with_const_type(
        content: impl Into<String>,
        is_static: bool,
        loc: SourceLocation,
        const_type: ConstantType,
    ) -> Self {
        Self {
            content: content.into(),
            is_static,
            const_type,
            loc,
            identifiers: None,
            is_handler_key: false,
        }
    }
}

/// Expression made of string fragments and nested nodes
#[derive(Debug)]
pub struct CompoundExpressionNode<'a> {
    pub children: Vec<'a, CompoundExpressionChild<'a>>,
    pub loc: SourceLocation,
    pub identifiers: Option<Vec<'a, String>>,
    pub is_handler_key: bool,
}

impl<'a> CompoundExpressionNode<'a> {
    pub fn new(allocator: &'a Bump, loc: SourceLocation) -> Self {
        Self {
            children: Vec::new_in(allocator),
            loc,
            identifiers: None,
            is_handler_key: false,
        }
    }
}

/// Child of a compound expression
#[derive(Debug)]
pub enum CompoundExpressionChild<'a> {
    Simple(Box<'a, SimpleExpressionNode<'a>>),
    Compound(Box<'a, CompoundExpressionNode<'a>>),
    Interpolation(Box<'a, InterpolationNode<'a>>),
    Text(Box<'a, TextNode>),
    String(String),
    Symbol(RuntimeHelper),
}

/// `v-if` container
#[derive(Debug)]
pub struct IfNode<'a> {
    pub branches: Vec<'a, IfBranchNode<'a>>,
    pub loc: SourceLocation,
    /// Chain of conditional expressions (or its cache wrapper).
    pub codegen_node: Option<JsChildNode<'a>>,
}

/// One branch of a `v-if` chain
#[derive(Debug)]
pub struct IfBranchNode<'a> {
    /// Absent for `v-else`
    pub condition: Option<ExpressionNode<'a>>,
    pub children: Vec<'a, TemplateChildNode<'a>>,
    pub user_key: Option<PropNode<'a>>,
    pub is_template_if: bool,
    pub loc: SourceLocation,
}

/// `v-for` container
#[derive(Debug)]
pub struct ForNode<'a> {
    pub source: ExpressionNode<'a>,
    pub value_alias: Option<ExpressionNode<'a>>,
    pub key_alias: Option<ExpressionNode<'a>>,
    pub object_index_alias: Option<ExpressionNode<'a>>,
    pub parse_result: ForParseResult<'a>,
    pub children: Vec<'a, TemplateChildNode<'a>>,
    pub loc: SourceLocation,
    /// Fragment wrapping the `renderList` call.
    pub codegen_node: Option<JsChildNode<'a>>,
}

/// Parsed `value, key, index in source` clause
#[derive(Debug)]
pub struct ForParseResult<'a> {
    pub source: ExpressionNode<'a>,
    pub value: Option<ExpressionNode<'a>>,
    pub key: Option<ExpressionNode<'a>>,
    pub index: Option<ExpressionNode<'a>>,
    /// Aliases already ran through the expression service.
    pub finalized: bool,
}

/// Text node wrapped in `createTextVNode`
#[derive(Debug)]
pub struct TextCallNode<'a> {
    pub content: TextCallContent<'a>,
    pub loc: SourceLocation,
    pub codegen_node: Option<JsChildNode<'a>>,
}

/// Content of a text call
#[derive(Debug)]
pub enum TextCallContent<'a> {
    Text(Box<'a, TextNode>),
    Interpolation(Box<'a, InterpolationNode<'a>>),
    Compound(Box<'a, CompoundExpressionNode<'a>>),
}

// ============================================================================
// Codegen descriptors
// ============================================================================

/// Points at template children that stay owned by the tree.
///
/// Resolved relative to the node that owns the descriptor: the root, an
/// element, a conditional container or an iteration container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeRef {
    /// Codegen of the owner's only child.
    OnlyChild,
    /// Codegen of the only child of branch `n`.
    BranchChild(usize),
    /// The owner's child list.
    Children,
    /// Child list of branch `n`.
    BranchChildren(usize),
    /// Child list of the owner's child at `n` (a `<template v-slot>`).
    TemplateChildren(usize),
    /// The owner's children outside `<template v-slot>` wrappers, comments
    /// excluded.
    ImplicitChildren,
}

/// Codegen node for JavaScript output
#[derive(Debug)]
pub enum JsChildNode<'a> {
    VNodeCall(Box<'a, VNodeCall<'a>>),
    Call(Box<'a, CallExpression<'a>>),
    Object(Box<'a, ObjectExpression<'a>>),
    Array(Box<'a, ArrayExpression<'a>>),
    Function(Box<'a, FunctionExpression<'a>>),
    Conditional(Box<'a, ConditionalExpression<'a>>),
    Cache(Box<'a, CacheExpression<'a>>),
    Simple(Box<'a, SimpleExpressionNode<'a>>),
    Compound(Box<'a, CompoundExpressionNode<'a>>),
    Tree(TreeRef),
}

impl<'a> JsChildNode<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::VNodeCall(_) => "vnode",
            Self::Call(_) => "call",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::Function(_) => "function",
            Self::Conditional(_) => "conditional",
            Self::Cache(_) => "cache",
            Self::Simple(_) => "simple",
            Self::Compound(_) => "compound",
            Self::Tree(_) => "tree",
        }
    }

    pub fn from_expression(exp: ExpressionNode<'a>) -> Self {
        match exp {
            ExpressionNode::Simple(exp) => Self::Simple(exp),
            ExpressionNode::Compound(exp) => Self::Compound(exp),
        }
    }

    pub fn as_vnode_call(&self) -> Option<&VNodeCall<'a>> {
        match self {
            Self::VNodeCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_vnode_call_mut(&mut self) -> Option<&mut VNodeCall<'a>> {
        match self {
            Self::VNodeCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_simple(&self) -> Option<&SimpleExpressionNode<'a>> {
        match self {
            Self::Simple(exp) => Some(exp),
            _ => None,
        }
    }
}

/// VNode creation call (`createVNode` / `createElementBlock` / ...)
#[derive(Debug)]
pub struct VNodeCall<'a> {
    pub tag: VNodeTag<'a>,
    pub props: Option<PropsExpression<'a>>,
    pub children: Option<VNodeChildren<'a>>,
    pub patch_flag: Option<PatchFlags>,
    pub dynamic_props: Option<DynamicProps<'a>>,
    pub directives: Option<DirectiveArguments<'a>>,
    pub is_block: bool,
    pub disable_tracking: bool,
    pub is_component: bool,
    pub loc: SourceLocation,
}

/// VNode tag
#[derive(Debug)]
pub enum VNodeTag<'a> {
    /// Literal tag (`"div"`) or resolved asset id (`_component_foo`)
    String(String),
    /// Runtime symbol (`Fragment`, `Teleport`, ...)
    Symbol(RuntimeHelper),
    /// `resolveDynamicComponent(...)`
    Call(Box<'a, CallExpression<'a>>),
}

/// Props argument of a vnode call
#[derive(Debug)]
pub enum PropsExpression<'a> {
    Object(Box<'a, ObjectExpression<'a>>),
    Call(Box<'a, CallExpression<'a>>),
    /// Bare binding, or a hoisted reference
    Expression(ExpressionNode<'a>),
}

/// Children argument of a vnode call
#[derive(Debug)]
pub enum VNodeChildren<'a> {
    /// Children still owned by the tree (`Children` or `BranchChildren`).
    Tree(TreeRef),
    /// The owner's single text-like child, passed without an array.
    TreeText,
    /// Child list detached from the tree by hoisting.
    Nodes(Vec<'a, TemplateChildNode<'a>>),
    /// Single text-like child detached from the tree by hoisting.
    Text(TemplateChildNode<'a>),
    /// Slots object (or `createSlots` call) of a component.
    Slots(JsChildNode<'a>),
    /// `renderList` call of a `v-for` fragment.
    RenderList(Box<'a, CallExpression<'a>>),
    /// Hoisted child array.
    Hoisted(Box<'a, SimpleExpressionNode<'a>>),
}

/// Dynamic prop names of a vnode call
#[derive(Debug)]
pub enum DynamicProps<'a> {
    Names(Vec<'a, String>),
    Hoisted(Box<'a, SimpleExpressionNode<'a>>),
}

/// Directives applied through `withDirectives`
#[derive(Debug)]
pub struct DirectiveArguments<'a> {
    pub elements: Vec<'a, DirectiveArgumentNode<'a>>,
    pub loc: SourceLocation,
}

/// `[dir, exp, arg, modifiers]`
#[derive(Debug)]
pub struct DirectiveArgumentNode<'a> {
    pub directive: Callee,
    pub exp: Option<ExpressionNode<'a>>,
    pub arg: Option<ExpressionNode<'a>>,
    pub modifiers: Option<Box<'a, ObjectExpression<'a>>>,
}

/// Call expression
#[derive(Debug)]
pub struct CallExpression<'a> {
    pub callee: Callee,
    pub arguments: Vec<'a, CallArgument<'a>>,
    pub loc: SourceLocation,
}

impl<'a> CallExpression<'a> {
    pub fn new(allocator: &'a Bump, callee: Callee) -> Self {
        Self {
            callee,
            arguments: Vec::new_in(allocator),
            loc: SourceLocation::STUB,
        }
    }
}

/// Callee of a call expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    Symbol(RuntimeHelper),
    String(String),
}

/// Argument of a call expression
#[derive(Debug)]
pub enum CallArgument<'a> {
    String(String),
    Symbol(RuntimeHelper),
    Js(JsChildNode<'a>),
    Text(TextCallContent<'a>),
}

/// Object expression
#[derive(Debug)]
pub struct ObjectExpression<'a> {
    pub properties: Vec<'a, Property<'a>>,
    pub loc: SourceLocation,
}

impl<'a> ObjectExpression<'a> {
    pub fn new(allocator: &'a Bump, loc: SourceLocation) -> Self {
        Self {
            properties: Vec::new_in(allocator),
            loc,
        }
    }

    pub fn find(&self, key: &str) -> Option<&Property<'a>> {
        self.properties.iter().find(|p| p.key.is_static_named(key))
    }
}

/// `key: value`
#[derive(Debug)]
pub struct Property<'a> {
    pub key: ExpressionNode<'a>,
    pub value: JsChildNode<'a>,
    pub loc: SourceLocation,
}

/// Array expression
#[derive(Debug)]
pub struct ArrayExpression<'a> {
    pub elements: Vec<'a, JsChildNode<'a>>,
    pub loc: SourceLocation,
}

/// Function expression
#[derive(Debug)]
pub struct FunctionExpression<'a> {
    pub params: Option<FunctionParams<'a>>,
    pub returns: Option<JsChildNode<'a>>,
    /// Statements run before returning (memoized loop bodies).
    pub body: Option<FunctionBody<'a>>,
    pub newline: bool,
    pub is_slot: bool,
    pub loc: SourceLocation,
}

/// Function parameters
#[derive(Debug)]
pub enum FunctionParams<'a> {
    /// Single destructuring or identifier (slot props)
    Expression(ExpressionNode<'a>),
    /// Positional list; gaps are filled with `_`, `__`, ...
    List(Vec<'a, ExpressionNode<'a>>),
}

/// Body of a memoized `v-for` iterator
#[derive(Debug)]
pub enum FunctionBody<'a> {
    /// `const _memo = (memo); if (_cached && _cached.key === key && isMemoSame(_cached, _memo)) return _cached`
    MemoCheck {
        memo: ExpressionNode<'a>,
        key: Option<ExpressionNode<'a>>,
    },
}

/// `test ? consequent : alternate`
#[derive(Debug)]
pub struct ConditionalExpression<'a> {
    pub test: ExpressionNode<'a>,
    pub consequent: JsChildNode<'a>,
    pub alternate: JsChildNode<'a>,
    pub newline: bool,
    pub loc: SourceLocation,
}

/// `_cache[index] || (_cache[index] = value)`
#[derive(Debug)]
pub struct CacheExpression<'a> {
    pub index: u32,
    pub value: JsChildNode<'a>,
    /// Holds a vnode; block tracking is paused while computing it.
    pub need_pause_tracking: bool,
    pub in_v_once: bool,
    pub need_array_spread: bool,
    pub loc: SourceLocation,
}

// ============================================================================
// Arena cloning
// ============================================================================

impl<'a> CloneIn<'a> for SimpleExpressionNode<'a> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        Self {
            content: self.content.clone(),
            is_static: self.is_static,
            const_type: self.const_type,
            loc: self.loc.clone(),
            identifiers: self.identifiers.clone_in(allocator),
            is_handler_key: self.is_handler_key,
        }
    }
}

impl<'a> CloneIn<'a> for CompoundExpressionNode<'a> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        Self {
            children: self.children.clone_in(allocator),
            loc: self.loc.clone(),
            identifiers: self.identifiers.clone_in(allocator),
            is_handler_key: self.is_handler_key,
        }
    }
}

impl<'a> CloneIn<'a> for CompoundExpressionChild<'a> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        match self {
            Self::Simple(exp) => Self::Simple(exp.clone_in(allocator)),
            Self::Compound(exp) => Self::Compound(exp.clone_in(allocator)),
            Self::Interpolation(node) => Self::Interpolation(node.clone_in(allocator)),
            Self::Text(text) => Self::Text(Box::new_in((**text).clone(), allocator)),
            Self::String(s) => Self::String(s.clone()),
            Self::Symbol(helper) => Self::Symbol(*helper),
        }
    }
}

impl<'a> CloneIn<'a> for ExpressionNode<'a> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        match self {
            Self::Simple(exp) => Self::Simple(exp.clone_in(allocator)),
            Self::Compound(exp) => Self::Compound(exp.clone_in(allocator)),
        }
    }
}

impl<'a> CloneIn<'a> for InterpolationNode<'a> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        Self {
            content: self.content.clone_in(allocator),
            loc: self.loc.clone(),
        }
    }
}

impl<'a> CloneIn<'a> for TextCallContent<'a> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        match self {
            Self::Text(text) => Self::Text(Box::new_in((**text).clone(), allocator)),
            Self::Interpolation(node) => Self::Interpolation(node.clone_in(allocator)),
            Self::Compound(exp) => Self::Compound(exp.clone_in(allocator)),
        }
    }
}

impl<'a> CloneIn<'a> for ForParseResult<'a> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        Self {
            source: self.source.clone_in(allocator),
            value: self.value.clone_in(allocator),
            key: self.key.clone_in(allocator),
            index: self.index.clone_in(allocator),
            finalized: self.finalized,
        }
    }
}

impl<'a> CloneIn<'a> for DirectiveNode<'a> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        Self {
            name: self.name.clone(),
            raw_name: self.raw_name.clone(),
            exp: self.exp.clone_in(allocator),
            arg: self.arg.clone_in(allocator),
            modifiers: self.modifiers.clone_in(allocator),
            for_parse_result: self.for_parse_result.clone_in(allocator),
            loc: self.loc.clone(),
        }
    }
}

impl<'a> CloneIn<'a> for PropNode<'a> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        match self {
            Self::Attribute(attr) => Self::Attribute(Box::new_in((**attr).clone(), allocator)),
            Self::Directive(dir) => Self::Directive(dir.clone_in(allocator)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_type_order() {
        assert!(ConstantType::NotConstant < ConstantType::CanSkipPatch);
        assert!(ConstantType::CanSkipPatch < ConstantType::CanHoist);
        assert!(ConstantType::CanHoist < ConstantType::CanStringify);
    }

    #[test]
    fn test_simple_expression_default_rank() {
        let stat = SimpleExpressionNode::new("foo", true, SourceLocation::STUB);
        let dynamic = SimpleExpressionNode::new("foo", false, SourceLocation::STUB);
        assert_eq!(stat.const_type, ConstantType::CanStringify);
        assert_eq!(dynamic.const_type, ConstantType::NotConstant);
    }

    #[test]
    fn test_node_id_is_stable_across_moves() {
        let allocator = Bump::new();
        let el = Box::new_in(
            ElementNode::new(&allocator, "div", SourceLocation::STUB),
            &allocator,
        );
        let id = NodeId::of(&*el);
        let mut list = Vec::new_in(&allocator);
        list.push(TemplateChildNode::Element(el));
        let moved = list.pop();
        if let Some(TemplateChildNode::Element(el)) = moved {
            assert_eq!(NodeId::of(&*el), id);
        } else {
            panic!("expected element");
        }
    }

    #[test]
    fn test_find_prop() {
        let allocator = Bump::new();
        let mut el = ElementNode::new(&allocator, "div", SourceLocation::STUB);
        let mut attr = AttributeNode::new("key", SourceLocation::STUB);
        attr.value = Some(TextNode::new("a", SourceLocation::STUB));
        el.props
            .push(PropNode::Attribute(Box::new_in(attr, &allocator)));

        let mut dir = DirectiveNode::new(&allocator, "bind", SourceLocation::STUB);
        dir.arg = Some(ExpressionNode::simple(
            &allocator,
            SimpleExpressionNode::new("id", true, SourceLocation::STUB),
        ));
        dir.exp = Some(ExpressionNode::simple(
            &allocator,
            SimpleExpressionNode::new("foo", false, SourceLocation::STUB),
        ));
        el.props
            .push(PropNode::Directive(Box::new_in(dir, &allocator)));

        assert!(matches!(el.find_prop("key", false, false), Some(PropNode::Attribute(_))));
        assert!(el.find_prop("key", true, false).is_none());
        assert!(matches!(el.find_prop("id", false, false), Some(PropNode::Directive(_))));
        assert!(el.find_dir("bind", false).is_some());
        assert!(el.find_dir("if", true).is_none());
    }

    #[test]
    fn test_clone_compound_expression() {
        let allocator = Bump::new();
        let mut compound = CompoundExpressionNode::new(&allocator, SourceLocation::STUB);
        compound.children.push(CompoundExpressionChild::Simple(Box::new_in(
            SimpleExpressionNode::new("_ctx.a", false, SourceLocation::STUB),
            &allocator,
        )));
        compound
            .children
            .push(CompoundExpressionChild::String(String::const_new(" + 1")));

        let copy = compound.clone_in(&allocator);
        assert_eq!(copy.children.len(), 2);
        assert!(matches!(
            &copy.children[0],
            CompoundExpressionChild::Simple(exp) if exp.content == "_ctx.a"
        ));
    }

    #[test]
    fn test_helper_table() {
        assert_eq!(RuntimeHelper::ALL.len(), RuntimeHelper::WithKeys as usize + 1);
        assert!(RuntimeHelper::ALL.windows(2).all(|pair| pair[0] < pair[1]));
        let names: std::collections::HashSet<_> =
            RuntimeHelper::ALL.iter().map(RuntimeHelper::name).collect();
        assert_eq!(names.len(), RuntimeHelper::ALL.len());
        assert_eq!(RuntimeHelper::CreateComment.name(), "createCommentVNode");
    }
}
