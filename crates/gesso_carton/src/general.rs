//! String and identifier helpers.

use compact_str::CompactString as String;
use phf::phf_set;

/// Directives handled by the compiler itself (never resolved at runtime).
static BUILTIN_DIRECTIVES: phf::Set<&'static str> = phf_set! {
    "bind", "cloak", "else-if", "else", "for", "html", "if", "model", "on",
    "once", "pre", "show", "slot", "text", "memo",
};

/// Props reserved by the runtime vnode layer.
static RESERVED_PROPS: phf::Set<&'static str> = phf_set! {
    "", "key", "ref", "ref_for", "ref_key",
    "onVnodeBeforeMount", "onVnodeMounted",
    "onVnodeBeforeUpdate", "onVnodeUpdated",
    "onVnodeBeforeUnmount", "onVnodeUnmounted",
};

/// Globals a template expression may reference without a context prefix.
static GLOBALS_ALLOWED: phf::Set<&'static str> = phf_set! {
    "Infinity", "undefined", "NaN", "isFinite", "isNaN", "parseFloat",
    "parseInt", "decodeURI", "decodeURIComponent", "encodeURI",
    "encodeURIComponent", "Math", "Number", "Date", "Array", "Object",
    "Boolean", "String", "RegExp", "Map", "Set", "JSON", "Intl", "BigInt",
    "console", "Error", "Symbol",
};

/// JavaScript keywords that can never be free identifiers.
static KEYWORDS: phf::Set<&'static str> = phf_set! {
    "await", "break", "case", "catch", "class", "const", "continue",
    "debugger", "default", "delete", "do", "else", "export", "extends",
    "finally", "for", "function", "if", "import", "in", "instanceof", "let",
    "new", "return", "super", "switch", "throw", "try", "typeof", "var",
    "void", "while", "with", "yield", "async", "of",
};

/// Identifiers that are literal values.
static LITERAL_WHITELIST: phf::Set<&'static str> = phf_set! {
    "true", "false", "null", "this",
};

#[inline]
pub fn is_builtin_directive(name: &str) -> bool {
    BUILTIN_DIRECTIVES.contains(name)
}

#[inline]
pub fn is_reserved_prop(name: &str) -> bool {
    RESERVED_PROPS.contains(name)
}

#[inline]
pub fn is_globally_allowed(name: &str) -> bool {
    GLOBALS_ALLOWED.contains(name)
}

#[inline]
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(name)
}

#[inline]
pub fn is_literal_whitelisted(name: &str) -> bool {
    LITERAL_WHITELIST.contains(name)
}

/// `onXxx` event handler key (the third char must not be lowercase).
pub fn is_on(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes.len() > 2 && bytes[0] == b'o' && bytes[1] == b'n' && !bytes[2].is_ascii_lowercase()
}

#[inline]
pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$' || !c.is_ascii()
}

#[inline]
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || !c.is_ascii()
}

/// Whether `s` is a single identifier such as `foo` or `$event`.
pub fn is_simple_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => chars.all(is_identifier_char),
        _ => false,
    }
}

/// `foo-bar` -> `fooBar`
pub fn camelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    if upper_next {
        out.push('-');
    }
    out
}

/// `fooBar` -> `FooBar`
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::with_capacity(s.len());
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
            out
        }
        None => String::default(),
    }
}

/// `fooBar` -> `foo-bar`
pub fn hyphenate(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `click` -> `onClick`, empty input stays empty.
pub fn to_handler_key(s: &str) -> String {
    if s.is_empty() {
        return String::default();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push_str("on");
    out.push_str(&capitalize(s));
    out
}

/// Build the local variable name a resolved asset is bound to.
///
/// `my-comp` with `component` becomes `_component_my_comp`; characters that
/// are not valid in identifiers are replaced by their char code.
pub fn to_valid_asset_id(name: &str, kind: &str) -> String {
    let mut out = String::with_capacity(name.len() + kind.len() + 2);
    out.push('_');
    out.push_str(kind);
    out.push('_');
    for c in name.chars() {
        if c == '-' {
            out.push('_');
        } else if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push_str(&(c as u32).to_string());
        }
    }
    out
}
