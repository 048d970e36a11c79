//! Armature - the template reader.
//!
//! Turns template source into the tree the transform passes work on:
//! elements, attributes, directives, interpolations, comments and text.
//!
//! # Example
//!
//! ```
//! use gesso_armature::parse;
//! use gesso_carton::Bump;
//!
//! let allocator = Bump::new();
//! let (root, errors) = parse(&allocator, "<div v-if=\"ok\">{{ msg }}</div>");
//! assert!(errors.is_empty());
//! assert_eq!(root.children.len(), 1);
//! ```

mod parser;

pub use parser::{parse, parse_with_options, Parser};
