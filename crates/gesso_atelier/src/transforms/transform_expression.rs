//! Expression transform.
//!
//! Template expressions are scanned token by token. Free identifiers are
//! rewritten to read from the render context when prefixing is enabled,
//! identifiers declared by the template (loop aliases, slot props, arrow
//! params) are left alone, and every processed expression gets a constant
//! rank the static optimizer relies on.

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use gesso_carton::{
    is_globally_allowed, is_identifier_char, is_identifier_start, is_keyword,
    is_literal_whitelisted, is_simple_identifier, Box, String,
};

use crate::ast::*;
use crate::errors::{CompilerError, ErrorCode};
use crate::options::BindingType;
use crate::transform::{
    identifier_list, ExitFn, ExpressionMode, ExpressionProcessor, TransformContext, TransformNode,
};

/// Calls and non-numeric member access keep an identifier-free expression dynamic.
static CONSTANT_BAIL_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\w\s*\(|\.[^\d]").ok());

/// Default expression service.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanningProcessor;

impl ExpressionProcessor for ScanningProcessor {
    fn process<'a>(
        &self,
        ctx: &mut TransformContext<'a>,
        exp: ExpressionNode<'a>,
        mode: ExpressionMode,
    ) -> ExpressionNode<'a> {
        match exp {
            ExpressionNode::Simple(simple) => process_simple(ctx, simple, mode),
            // Compound expressions were produced by an earlier pass.
            compound @ ExpressionNode::Compound(_) => compound,
        }
    }
}

/// Pre-phase: process interpolations and the values of directives.
pub fn transform_expression<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
) -> Option<std::vec::Vec<ExitFn<'a>>> {
    let cursor = ctx.cursor;
    match node.current_mut(cursor)? {
        TemplateChildNode::Interpolation(interpolation) => {
            let content = take_expression(&mut interpolation.content, ctx);
            interpolation.content = ctx.process_expression(content, ExpressionMode::Normal);
        }
        TemplateChildNode::Element(el) => {
            for prop in el.props.iter_mut() {
                let PropNode::Directive(dir) = prop else {
                    continue;
                };
                if dir.name == "for" {
                    continue;
                }
                if let Some(exp) = dir.exp.take() {
                    // Handlers with an argument are processed by the event transform.
                    let processed = if dir.name == "on" && dir.arg.is_some() {
                        exp
                    } else if dir.name == "slot" {
                        ctx.process_expression(exp, ExpressionMode::Params)
                    } else {
                        ctx.process_expression(exp, ExpressionMode::Normal)
                    };
                    dir.exp = Some(processed);
                }
                if let Some(arg) = dir.arg.take() {
                    dir.arg = Some(if arg.is_static_exp() {
                        arg
                    } else {
                        ctx.process_expression(arg, ExpressionMode::Normal)
                    });
                }
            }
        }
        _ => {}
    }
    None
}

/// Move an expression out of a slot, leaving an empty placeholder.
fn take_expression<'a>(slot: &mut ExpressionNode<'a>, ctx: &TransformContext<'a>) -> ExpressionNode<'a> {
    std::mem::replace(
        slot,
        ExpressionNode::simple(
            ctx.allocator,
            SimpleExpressionNode::new("", false, SourceLocation::STUB),
        ),
    )
}

fn process_simple<'a>(
    ctx: &mut TransformContext<'a>,
    mut simple: Box<'a, SimpleExpressionNode<'a>>,
    mode: ExpressionMode,
) -> ExpressionNode<'a> {
    if simple.is_static || simple.content.trim().is_empty() {
        return ExpressionNode::Simple(simple);
    }

    let source = simple.content.clone();
    let tokens = match tokenize(&source) {
        Ok(tokens) => tokens,
        Err(detail) => {
            ctx.report(CompilerError::with_detail(
                ErrorCode::InvalidExpression,
                Some(simple.loc.clone()),
                &format!("{detail} in `{source}`"),
            ));
            return ExpressionNode::Simple(simple);
        }
    };
    if mode == ExpressionMode::Params {
        let names = binding_names(&source, &tokens, 0, tokens.len());
        simple.identifiers = Some(identifier_list(
            ctx.allocator,
            names.into_iter().map(String::from),
        ));
        return ExpressionNode::Simple(simple);
    }
    let scan = analyze(&source, &tokens);

    let rewrite = ctx.options.prefix_identifiers && !ctx.in_v_once;

    // Single identifier fast path.
    if is_simple_identifier(source.trim()) {
        let name = source.trim();
        let is_local = ctx.is_tracked(name);
        let is_literal = is_literal_whitelisted(name);
        let binding = binding_type(ctx, name);
        let is_global = is_globally_allowed(name) && binding.is_none();

        if !is_local && !is_literal && !is_global {
            if rewrite {
                simple.content = rewrite_identifier(ctx, name);
            }
            if matches!(binding, Some(BindingType::SetupConst | BindingType::LiteralConst)) {
                simple.const_type = ConstantType::CanSkipPatch;
            }
        } else if is_literal {
            simple.const_type = ConstantType::CanStringify;
        } else if is_global {
            simple.const_type = ConstantType::CanHoist;
        }
        return ExpressionNode::Simple(simple);
    }

    if scan.references.is_empty() {
        simple.const_type = if bails(&source) {
            ConstantType::NotConstant
        } else {
            ConstantType::CanStringify
        };
        return ExpressionNode::Simple(simple);
    }

    let classified: SmallVec<[(Reference, ConstantType); 8]> = scan
        .references
        .iter()
        .map(|r| {
            let name = &source[r.start..r.end];
            let kind = if r.is_local || ctx.is_tracked(name) {
                Reference::Local
            } else if is_globally_allowed(name) && binding_type(ctx, name).is_none() {
                Reference::Global
            } else {
                Reference::Free
            };
            let rank = if kind == Reference::Global && r.standalone {
                ConstantType::CanStringify
            } else {
                ConstantType::NotConstant
            };
            (kind, rank)
        })
        .collect();

    if !rewrite {
        simple.const_type = classified
            .iter()
            .map(|(_, rank)| *rank)
            .min()
            .unwrap_or(ConstantType::NotConstant);
        return ExpressionNode::Simple(simple);
    }

    let allocator = ctx.allocator;
    let mut compound = CompoundExpressionNode::new(
        allocator,
        SourceLocation {
            source: source.clone(),
            ..simple.loc.clone()
        },
    );
    compound.is_handler_key = simple.is_handler_key;

    let mut last = 0;
    for (reference, (kind, rank)) in scan.references.iter().zip(classified.iter()) {
        let name = &source[reference.start..reference.end];
        let mut leading = String::from(&source[last..reference.start]);
        let content = if *kind == Reference::Free {
            if reference.shorthand {
                leading.push_str(name);
                leading.push_str(": ");
            }
            rewrite_identifier(ctx, name)
        } else {
            String::from(name)
        };
        if !leading.is_empty() {
            compound.children.push(CompoundExpressionChild::String(leading));
        }
        compound
            .children
            .push(CompoundExpressionChild::Simple(Box::new_in(
                SimpleExpressionNode::with_const_type(
                    content,
                    false,
                    SourceLocation::STUB,
                    *rank,
                ),
                allocator,
            )));
        last = reference.end;
    }
    if last < source.len() {
        compound
            .children
            .push(CompoundExpressionChild::String(String::from(&source[last..])));
    }
    if !scan.declared.is_empty() {
        let names = scan.declared.iter().map(|name| String::from(name.as_str()));
        compound.identifiers = Some(identifier_list(allocator, names));
    }

    tracing::trace!(source = %source, parts = compound.children.len(), "rewrote expression");
    ExpressionNode::Compound(Box::new_in(compound, allocator))
}

fn bails(source: &str) -> bool {
    CONSTANT_BAIL_RE
        .as_ref()
        .is_some_and(|re| re.is_match(source))
}

fn binding_type(ctx: &TransformContext<'_>, name: &str) -> Option<BindingType> {
    ctx.options
        .binding_metadata
        .as_ref()
        .and_then(|metadata| metadata.get(name))
}

/// Rewrite a free identifier so it reads from the right place.
fn rewrite_identifier(ctx: &mut TransformContext<'_>, name: &str) -> String {
    let binding = binding_type(ctx, name);
    let mut out = String::default();
    if ctx.options.inline {
        match binding {
            Some(BindingType::SetupConst | BindingType::SetupReactiveConst | BindingType::LiteralConst) => {
                out.push_str(name);
            }
            Some(BindingType::SetupRef) => {
                out.push_str(name);
                out.push_str(".value");
            }
            Some(BindingType::SetupMaybeRef | BindingType::SetupLet) => {
                ctx.helper(RuntimeHelper::Unref);
                out.push('_');
                out.push_str(RuntimeHelper::Unref.name());
                out.push('(');
                out.push_str(name);
                out.push(')');
            }
            Some(BindingType::Props) => {
                out.push_str("__props.");
                out.push_str(name);
            }
            Some(BindingType::PropsAliased) => {
                let key = ctx
                    .options
                    .binding_metadata
                    .as_ref()
                    .and_then(|m| m.props_aliases.get(name))
                    .map_or(name, |key| key.as_str());
                out.push_str("__props.");
                out.push_str(key);
            }
            _ => {
                out.push_str("_ctx.");
                out.push_str(name);
            }
        }
        return out;
    }

    let prefix = match binding {
        Some(
            BindingType::SetupConst
            | BindingType::SetupReactiveConst
            | BindingType::LiteralConst
            | BindingType::SetupRef
            | BindingType::SetupMaybeRef
            | BindingType::SetupLet,
        ) => "$setup.",
        Some(BindingType::Props | BindingType::PropsAliased) => "$props.",
        Some(BindingType::Data) => "$data.",
        Some(BindingType::Options) => "$options.",
        None => "_ctx.",
    };
    out.push_str(prefix);
    out.push_str(name);
    out
}

// ----------------------------------------------------------------------------
// Scanner
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Ident,
    Number,
    Str,
    Template,
    Regex,
    Punct,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

impl Token {
    fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }

    fn is_punct(&self, source: &str, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text(source) == punct
    }
}

const TEMPLATE_MARK: u8 = b'`';

fn tokenize(source: &str) -> Result<std::vec::Vec<Token>, &'static str> {
    let bytes = source.as_bytes();
    let mut tokens = std::vec::Vec::new();
    let mut brackets: SmallVec<[u8; 8]> = SmallVec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'\'' | b'"' => {
                let end = scan_string(bytes, i)?;
                tokens.push(Token { kind: TokenKind::Str, start: i, end });
                i = end;
            }
            b'`' => {
                i = scan_template(bytes, i, i + 1, &mut tokens, &mut brackets)?;
            }
            b'0'..=b'9' => {
                let end = scan_number(bytes, i);
                tokens.push(Token { kind: TokenKind::Number, start: i, end });
                i = end;
            }
            b'.' if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                let end = scan_number(bytes, i);
                tokens.push(Token { kind: TokenKind::Number, start: i, end });
                i = end;
            }
            b'(' | b'[' | b'{' => {
                brackets.push(c);
                tokens.push(Token { kind: TokenKind::Punct, start: i, end: i + 1 });
                i += 1;
            }
            b')' | b']' | b'}' => {
                let open = match c {
                    b')' => b'(',
                    b']' => b'[',
                    _ => b'{',
                };
                match brackets.pop() {
                    Some(TEMPLATE_MARK) if c == b'}' => {
                        i = scan_template(bytes, i, i + 1, &mut tokens, &mut brackets)?;
                    }
                    Some(top) if top == open => {
                        tokens.push(Token { kind: TokenKind::Punct, start: i, end: i + 1 });
                        i += 1;
                    }
                    _ => return Err("unbalanced brackets"),
                }
            }
            b'/' if regex_allowed(source, tokens.last()) => {
                let end = scan_regex(bytes, i)?;
                tokens.push(Token { kind: TokenKind::Regex, start: i, end });
                i = end;
            }
            _ => {
                let ch = source[i..].chars().next().unwrap_or('\0');
                if is_identifier_start(ch) {
                    let end = source[i..]
                        .char_indices()
                        .find(|&(_, c)| !is_identifier_char(c))
                        .map_or(source.len(), |(offset, _)| i + offset);
                    tokens.push(Token { kind: TokenKind::Ident, start: i, end });
                    i = end;
                } else {
                    let len = punct_len(&source[i..]);
                    tokens.push(Token { kind: TokenKind::Punct, start: i, end: i + len });
                    i += len;
                }
            }
        }
    }

    if brackets.contains(&TEMPLATE_MARK) {
        return Err("unterminated template literal");
    }
    if !brackets.is_empty() {
        return Err("unbalanced brackets");
    }
    Ok(tokens)
}

fn punct_len(rest: &str) -> usize {
    const MULTI: [&str; 6] = ["...", "=>", "?.", "===", "!==", "**"];
    for op in MULTI {
        if rest.starts_with(op) {
            // `a?.5:1` is a conditional, not optional chaining.
            if op == "?." && rest.as_bytes().get(2).is_some_and(u8::is_ascii_digit) {
                return 1;
            }
            return op.len();
        }
    }
    rest.chars().next().map_or(1, char::len_utf8)
}

fn scan_string(bytes: &[u8], start: usize) -> Result<usize, &'static str> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err("unterminated string literal")
}

fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.' || bytes[i] == b'_') {
        i += 1;
    }
    i
}

/// Scan a template literal chunk starting at `from` (just past a backtick
/// or the `}` closing a substitution). Stops after the closing backtick or
/// after `${`, pushing a marker so the matching `}` resumes the literal.
fn scan_template(
    bytes: &[u8],
    token_start: usize,
    from: usize,
    tokens: &mut std::vec::Vec<Token>,
    brackets: &mut SmallVec<[u8; 8]>,
) -> Result<usize, &'static str> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => {
                tokens.push(Token { kind: TokenKind::Template, start: token_start, end: i + 1 });
                return Ok(i + 1);
            }
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                tokens.push(Token { kind: TokenKind::Template, start: token_start, end: i + 2 });
                brackets.push(TEMPLATE_MARK);
                return Ok(i + 2);
            }
            _ => i += 1,
        }
    }
    Err("unterminated template literal")
}

fn regex_allowed(source: &str, prev: Option<&Token>) -> bool {
    match prev {
        None => true,
        Some(token) => match token.kind {
            TokenKind::Punct => !matches!(token.text(source), ")" | "]" | "}"),
            TokenKind::Ident => is_keyword(token.text(source)),
            _ => false,
        },
    }
}

fn scan_regex(bytes: &[u8], start: usize) -> Result<usize, &'static str> {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return Ok(i);
            }
            b'\n' => break,
            _ => i += 1,
        }
    }
    Err("unterminated regular expression")
}

// ----------------------------------------------------------------------------
// Analysis
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    /// Declared by the template or inside the expression
    Local,
    /// Allowed global (`Math`, `Date`, ...)
    Global,
    Free,
}

/// Identifier read by an expression.
#[derive(Debug, Clone, Copy)]
struct IdentifierRef {
    start: usize,
    end: usize,
    /// Declared by an arrow or function inside the expression
    is_local: bool,
    /// `{ foo }` object shorthand
    shorthand: bool,
    /// Not called, indexed or dereferenced
    standalone: bool,
}

#[derive(Debug, Default)]
struct Scan {
    references: std::vec::Vec<IdentifierRef>,
    /// Names declared by the expression (params, arrow params, `const`)
    declared: std::vec::Vec<std::string::String>,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    open: u8,
    is_object: bool,
}

fn analyze(source: &str, tokens: &[Token]) -> Scan {
    let matching = match_brackets(source, tokens);
    let mut scan = Scan::default();
    let mut frames: SmallVec<[Frame; 8]> = SmallVec::new();
    // (name, frame depth it lives in)
    let mut locals: std::vec::Vec<(&str, usize)> = std::vec::Vec::new();
    let mut skip = vec![false; tokens.len()];

    let text = |k: usize| tokens[k].text(source);
    let is_punct = |k: Option<usize>, p: &str| k.is_some_and(|k| tokens[k].is_punct(source, p));

    for k in 0..tokens.len() {
        let token = tokens[k];
        let prev = k.checked_sub(1);
        let next = (k + 1 < tokens.len()).then_some(k + 1);

        if token.kind == TokenKind::Punct {
            match text(k) {
                "(" | "[" | "{" => {
                    let open = source.as_bytes()[token.start];
                    let is_object = open == b'{' && !(is_punct(prev, "=>") || is_punct(prev, ")"));
                    frames.push(Frame { open, is_object });

                    // `(a, b) =>` declares the params for the rest of the enclosing group.
                    if open == b'(' {
                        if let Some(close) = matching[k] {
                            if is_punct(Some(close + 1).filter(|&n| n < tokens.len()), "=>") {
                                let depth = frames.len() - 1;
                                for name in binding_names(source, tokens, k + 1, close) {
                                    locals.push((name, depth));
                                    scan.declared.push(name.to_owned());
                                }
                                skip[k + 1..close].iter_mut().for_each(|s| *s = true);
                            }
                        }
                    }
                }
                ")" | "]" | "}" => {
                    frames.pop();
                    let depth = frames.len();
                    locals.retain(|&(_, d)| d <= depth);
                }
                _ => {}
            }
            continue;
        }

        if token.kind != TokenKind::Ident || skip[k] {
            continue;
        }
        let name = text(k);

        // `x => ...`
        if is_punct(next, "=>") {
            locals.push((name, frames.len()));
            scan.declared.push(name.to_owned());
            continue;
        }
        if name == "function" {
            declare_function_params(source, tokens, &matching, k, frames.len(), &mut locals, &mut scan, &mut skip);
            continue;
        }
        if matches!(name, "const" | "let" | "var") {
            if let Some(n) = next.filter(|&n| tokens[n].kind == TokenKind::Ident) {
                locals.push((text(n), frames.len()));
                scan.declared.push(text(n).to_owned());
                skip[n] = true;
            }
            continue;
        }
        if is_keyword(name) || is_literal_whitelisted(name) {
            continue;
        }
        if is_punct(prev, ".") || is_punct(prev, "?.") {
            continue;
        }

        let in_object = frames.last().is_some_and(|f| f.open == b'{' && f.is_object);
        let after_separator = is_punct(prev, "{") || is_punct(prev, ",");
        if in_object && after_separator && is_punct(next, ":") {
            continue;
        }
        let shorthand =
            in_object && after_separator && (is_punct(next, ",") || is_punct(next, "}"));

        let standalone = !(is_punct(next, "(")
            || is_punct(next, ".")
            || is_punct(next, "?.")
            || is_punct(next, "[")
            || next.is_some_and(|n| tokens[n].kind == TokenKind::Template)
            || prev.is_some_and(|p| text(p) == "new"));

        scan.references.push(IdentifierRef {
            start: token.start,
            end: token.end,
            is_local: locals.iter().any(|&(local, _)| local == name),
            shorthand,
            standalone,
        });
    }

    scan
}

/// Index of the matching close bracket for every open bracket token.
fn match_brackets(source: &str, tokens: &[Token]) -> std::vec::Vec<Option<usize>> {
    let mut matching = vec![None; tokens.len()];
    let mut stack: SmallVec<[usize; 8]> = SmallVec::new();
    for (k, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text(source) {
            "(" | "[" | "{" => stack.push(k),
            ")" | "]" | "}" => {
                if let Some(open) = stack.pop() {
                    matching[open] = Some(k);
                }
            }
            _ => {}
        }
    }
    matching
}

/// Names bound by a parameter list or destructuring pattern in `from..to`.
///
/// Object keys, member properties and default values are not bindings.
fn binding_names<'s>(source: &'s str, tokens: &[Token], from: usize, to: usize) -> SmallVec<[&'s str; 4]> {
    let mut names = SmallVec::new();
    let mut depth = 0usize;
    let mut in_default: Option<usize> = None;

    for k in from..to {
        let token = tokens[k];
        if token.kind == TokenKind::Punct {
            match token.text(source) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth = depth.saturating_sub(1);
                    if in_default.is_some_and(|d| depth < d) {
                        in_default = None;
                    }
                }
                "=" => in_default = Some(depth),
                "," => {
                    if in_default == Some(depth) {
                        in_default = None;
                    }
                }
                _ => {}
            }
            continue;
        }
        if token.kind != TokenKind::Ident || in_default.is_some() {
            continue;
        }
        let name = token.text(source);
        let prev_dot = k > from && tokens[k - 1].is_punct(source, ".");
        let next_colon = k + 1 < to && tokens[k + 1].is_punct(source, ":");
        if prev_dot || next_colon || is_keyword(name) {
            continue;
        }
        names.push(name);
    }
    names
}

#[allow(clippy::too_many_arguments)]
fn declare_function_params<'s>(
    source: &'s str,
    tokens: &[Token],
    matching: &[Option<usize>],
    k: usize,
    depth: usize,
    locals: &mut std::vec::Vec<(&'s str, usize)>,
    scan: &mut Scan,
    skip: &mut [bool],
) {
    let mut open = k + 1;
    if open < tokens.len() && tokens[open].kind == TokenKind::Ident {
        skip[open] = true;
        open += 1;
    }
    if open >= tokens.len() || !tokens[open].is_punct(source, "(") {
        return;
    }
    let Some(close) = matching[open] else {
        return;
    };
    for name in binding_names(source, tokens, open + 1, close) {
        locals.push((name, depth));
        scan.declared.push(name.to_owned());
    }
    skip[open + 1..close].iter_mut().for_each(|s| *s = true);
}

/// Validate an expression without processing it.
pub fn validate_expression(source: &str) -> Result<(), &'static str> {
    tokenize(source).map(|_| ())
}
