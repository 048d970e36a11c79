//! Carton - the toolbox shared by every gesso crate.
//!
//! Holds the arena types the tree is allocated in, the flag sets attached to
//! codegen descriptors, DOM tag tables and small string helpers.
//!
//! # Example
//!
//! ```
//! use gesso_carton::{Allocator, Box, Vec};
//!
//! let allocator = Allocator::default();
//!
//! let boxed = Box::new_in(42, allocator.as_bump());
//! assert_eq!(*boxed, 42);
//!
//! let mut vec = Vec::new_in(allocator.as_bump());
//! vec.push(1);
//! vec.push(2);
//! assert_eq!(vec.len(), 2);
//! ```

mod allocator;
mod clone_in;

pub mod dom_tag_config;
pub mod flags;
pub mod general;

pub use allocator::Allocator;
pub use clone_in::CloneIn;

// Arena collections
pub use bumpalo::boxed::Box;
pub use bumpalo::collections::Vec;
pub use bumpalo::Bump;

pub use compact_str::CompactString;
pub use compact_str::CompactString as String;

pub use smallvec::{smallvec, SmallVec};

pub use bitflags::bitflags;

pub use rustc_hash::{FxHashMap, FxHashSet};

pub use phf::{phf_set, Set as PhfSet};

pub use dom_tag_config::*;
pub use flags::*;
pub use general::*;
