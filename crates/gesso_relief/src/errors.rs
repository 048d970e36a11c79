//! Compiler diagnostics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::SourceLocation;
use gesso_carton::String;

/// Error codes reported by the reader and the transform passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorCode {
    // Reader
    EofInTag = 0,
    EofInComment,
    MissingEndTag,
    InvalidEndTag,
    MissingInterpolationEnd,
    MissingDirectiveName,
    DuplicateAttribute,

    // Transform
    VIfNoExpression = 28,
    VIfSameKey,
    VElseNoAdjacentIf,
    VForNoExpression,
    VForMalformedExpression,
    VForTemplateKeyPlacement,
    VBindNoExpression,
    VOnNoExpression,
    VSlotUnexpectedDirectiveOnSlotOutlet,
    VSlotMixedSlotUsage,
    VSlotDuplicateSlotNames,
    VSlotExtraneousDefaultSlotChildren,
    VSlotMisplaced,
    VModelNoExpression,
    VModelMalformedExpression,
    VModelOnScopeVariable,
    VModelOnProps,
    VModelArgOnElement,
    VModelOnFileInputElement,
    VModelUnnecessaryValue,
    VModelOnInvalidElement,
    VShowNoExpression,
    InvalidExpression,
    UnexpectedDirectiveOnSlotOutlet,

    // Configuration
    XPrefixIdNotSupported = 52,
    XModuleModeNotSupported,
    XCacheHandlerNotSupported,
    XScopeIdNotSupported,

    // Generic
    VMemoNoExpression = 56,
    UnhandledCodePath,
}

impl ErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            Self::EofInTag => "Unexpected EOF in tag.",
            Self::EofInComment => "Unexpected EOF in comment.",
            Self::MissingEndTag => "Element is missing end tag.",
            Self::InvalidEndTag => "Invalid end tag.",
            Self::MissingInterpolationEnd => "Interpolation end sign was not found.",
            Self::MissingDirectiveName => "Legal directive name was expected.",
            Self::DuplicateAttribute => "Duplicate attribute.",
            Self::VIfNoExpression => "v-if/v-else-if is missing expression.",
            Self::VIfSameKey => "v-if/else branches must use unique keys.",
            Self::VElseNoAdjacentIf => "v-else/v-else-if has no adjacent v-if or v-else-if.",
            Self::VForNoExpression => "v-for is missing expression.",
            Self::VForMalformedExpression => "v-for has invalid expression.",
            Self::VForTemplateKeyPlacement => {
                "<template v-for> key should be placed on the <template> tag."
            }
            Self::VBindNoExpression => "v-bind is missing expression.",
            Self::VOnNoExpression => "v-on is missing expression.",
            Self::VSlotUnexpectedDirectiveOnSlotOutlet => {
                "Unexpected custom directive on <slot> outlet."
            }
            Self::VSlotMixedSlotUsage => {
                "Mixed v-slot usage on both the component and nested <template>. \
                 When there are multiple named slots, all slots should use <template> \
                 syntax to avoid scope ambiguity."
            }
            Self::VSlotDuplicateSlotNames => "Duplicate slot names found.",
            Self::VSlotExtraneousDefaultSlotChildren => {
                "Extraneous children found when component already has explicitly named \
                 default slot. These children will be ignored."
            }
            Self::VSlotMisplaced => "v-slot can only be used on components or <template> tags.",
            Self::VModelNoExpression => "v-model is missing expression.",
            Self::VModelMalformedExpression => {
                "v-model value must be a valid JavaScript member expression."
            }
            Self::VModelOnScopeVariable => {
                "v-model cannot be used on v-for or v-slot scope variables because they \
                 are not writable."
            }
            Self::VModelOnProps => {
                "v-model cannot be used on a prop, because local prop bindings are not \
                 writable."
            }
            Self::VModelArgOnElement => "v-model argument is not supported on plain elements.",
            Self::VModelOnFileInputElement => {
                "v-model cannot be used on file inputs since they are read-only."
            }
            Self::VModelUnnecessaryValue => {
                "Unnecessary value binding used alongside v-model. It will interfere with \
                 v-model's behavior."
            }
            Self::VModelOnInvalidElement => {
                "v-model can only be used on <input>, <textarea> and <select> elements."
            }
            Self::VShowNoExpression => "v-show is missing expression.",
            Self::InvalidExpression => "Error parsing JavaScript expression.",
            Self::UnexpectedDirectiveOnSlotOutlet => {
                "Unexpected custom directive on <slot> outlet."
            }
            Self::XPrefixIdNotSupported => {
                "\"prefixIdentifiers\" option is not supported in this build of compiler."
            }
            Self::XModuleModeNotSupported => {
                "ES module mode is not supported in this build of compiler."
            }
            Self::XCacheHandlerNotSupported => {
                "\"cacheHandlers\" option is only supported when the \"prefixIdentifiers\" \
                 option is enabled."
            }
            Self::XScopeIdNotSupported => {
                "\"scopeId\" option is only supported in module mode."
            }
            Self::VMemoNoExpression => "v-memo is missing expression.",
            Self::UnhandledCodePath => "Unhandled code path.",
        }
    }

    /// Codes that only warn and never fail a build.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::VSlotExtraneousDefaultSlotChildren)
    }
}

/// Diagnostic with its code, location and rendered message
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct CompilerError {
    pub code: ErrorCode,
    pub loc: Option<SourceLocation>,
    pub message: String,
}

impl CompilerError {
    pub fn new(code: ErrorCode, loc: Option<SourceLocation>) -> Self {
        Self {
            code,
            loc,
            message: String::const_new(code.message()),
        }
    }

    /// Error carrying extra detail appended to the code's message.
    pub fn with_detail(code: ErrorCode, loc: Option<SourceLocation>, detail: &str) -> Self {
        let mut message = String::const_new(code.message());
        message.push_str(" ");
        message.push_str(detail);
        Self { code, loc, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert!(!ErrorCode::VIfSameKey.message().is_empty());
        assert!(!ErrorCode::VElseNoAdjacentIf.message().is_empty());
        assert!(!ErrorCode::VForMalformedExpression.message().is_empty());
        assert!(!ErrorCode::XCacheHandlerNotSupported.message().is_empty());
    }

    #[test]
    fn test_display_uses_message() {
        let err = CompilerError::new(ErrorCode::VMemoNoExpression, None);
        assert_eq!(err.to_string(), "v-memo is missing expression.");
    }

    #[test]
    fn test_with_detail() {
        let err = CompilerError::with_detail(ErrorCode::InvalidExpression, None, "`a +`");
        assert_eq!(err.to_string(), "Error parsing JavaScript expression. `a +`");
        assert_eq!(err.code, ErrorCode::InvalidExpression);
    }
}
