//! Compiler options.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::CompilerError;
use gesso_carton::{FxHashMap, String};

/// File name looked up by [`load_options`].
pub const CONFIG_FILE_NAME: &str = "gesso.config.json";

/// Whitespace handling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitespaceStrategy {
    /// Condense whitespace (default)
    #[default]
    Condense,
    /// Preserve all whitespace
    Preserve,
}

/// Reader options
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Whether to trim whitespace
    pub whitespace: WhitespaceStrategy,
    /// Custom delimiters for interpolation (default: ["{{", "}}"])
    pub delimiters: (String, String),
    /// Whether is a void tag
    pub is_void_tag: fn(&str) -> bool,
    /// Tags that never resolve to components
    pub is_native_tag: fn(&str) -> bool,
    /// Keep comment nodes
    pub comments: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            whitespace: WhitespaceStrategy::Condense,
            delimiters: (String::const_new("{{"), String::const_new("}}")),
            is_void_tag: gesso_carton::is_void_tag,
            is_native_tag: gesso_carton::is_native_tag,
            comments: true,
        }
    }
}

/// Transform options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Filename for error messages
    pub filename: String,
    /// Whether to prefix identifiers
    pub prefix_identifiers: bool,
    /// Whether to hoist static nodes
    pub hoist_static: bool,
    /// Whether to cache handlers
    pub cache_handlers: bool,
    /// Scope ID for scoped CSS
    pub scope_id: Option<String>,
    /// Whether in SSR mode
    pub ssr: bool,
    /// Development build (dev-only fragments and comments)
    pub dev: bool,
    /// Binding metadata from script setup
    pub binding_metadata: Option<BindingMetadata>,
    /// Inline mode
    pub inline: bool,
    /// Whether is TypeScript
    pub is_ts: bool,
    /// Whitespace handling for the reader
    pub whitespace: WhitespaceStrategy,
    /// Keep comment nodes in production builds
    pub comments: bool,
    /// Tag names rendered as plain elements
    #[serde(skip)]
    pub is_native_tag: fn(&str) -> bool,
    /// Called for every reported error, in report order
    #[serde(skip)]
    pub on_error: Option<fn(&CompilerError)>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            filename: String::const_new("template.vue"),
            prefix_identifiers: false,
            hoist_static: false,
            cache_handlers: false,
            scope_id: None,
            ssr: false,
            dev: true,
            binding_metadata: None,
            inline: false,
            is_ts: false,
            whitespace: WhitespaceStrategy::Condense,
            comments: false,
            is_native_tag: gesso_carton::is_native_tag,
            on_error: None,
        }
    }
}

impl TransformOptions {
    /// Parse options from a JSON document. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reader options matching these transform options.
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            whitespace: self.whitespace,
            is_native_tag: self.is_native_tag,
            comments: self.dev || self.comments,
            ..ParserOptions::default()
        }
    }
}

/// Binding metadata from script setup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingMetadata {
    /// Setup bindings with their types
    pub bindings: FxHashMap<std::string::String, BindingType>,

    /// Props aliases (local name -> prop key)
    #[serde(default)]
    pub props_aliases: FxHashMap<std::string::String, std::string::String>,

    /// Whether these bindings are from script setup
    #[serde(default)]
    pub is_script_setup: bool,
}

impl BindingMetadata {
    pub fn get(&self, name: &str) -> Option<BindingType> {
        self.bindings.get(name).copied()
    }
}

/// Binding type from script setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum BindingType {
    /// Variable declared with let in setup
    SetupLet = 0,
    /// Const binding that may be a ref
    SetupMaybeRef = 1,
    /// Const binding that is definitely a ref
    SetupRef = 2,
    /// Reactive const binding (reactive(), shallowReactive())
    SetupReactiveConst = 3,
    /// Const binding (functions, classes, non-reactive values)
    SetupConst = 4,
    /// Binding from props
    Props = 5,
    /// Binding from props with alias
    PropsAliased = 6,
    /// Data binding from data()
    Data = 7,
    /// Options API binding (computed, methods, inject)
    Options = 8,
    /// Literal constant (string, number, boolean literals)
    LiteralConst = 9,
}

/// Failure while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load `gesso.config.json` from `dir`. A missing file yields the defaults.
pub fn load_options(dir: &Path) -> Result<TransformOptions, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(TransformOptions::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    TransformOptions::from_json_str(&content).map_err(|source| ConfigError::Parse { path, source })
}
