//! Deep copies into an arena.

use bumpalo::boxed::Box;
use bumpalo::collections::Vec;
use bumpalo::Bump;

/// Clone a value whose owned parts live in a bump arena.
///
/// Arena boxes and vectors cannot implement [`Clone`] because they need an
/// allocator to copy into; tree types implement this trait instead.
pub trait CloneIn<'a>: Sized {
    fn clone_in(&self, allocator: &'a Bump) -> Self;
}

impl<'a, T: CloneIn<'a>> CloneIn<'a> for Box<'a, T> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        Box::new_in(self.as_ref().clone_in(allocator), allocator)
    }
}

impl<'a, T: CloneIn<'a>> CloneIn<'a> for Vec<'a, T> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        let mut out = Vec::with_capacity_in(self.len(), allocator);
        for item in self.iter() {
            out.push(item.clone_in(allocator));
        }
        out
    }
}

impl<'a, T: CloneIn<'a>> CloneIn<'a> for Option<T> {
    fn clone_in(&self, allocator: &'a Bump) -> Self {
        self.as_ref().map(|value| value.clone_in(allocator))
    }
}

macro_rules! impl_clone_in_for_clone {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<'a> CloneIn<'a> for $ty {
                #[inline]
                fn clone_in(&self, _: &'a Bump) -> Self {
                    self.clone()
                }
            }
        )*
    };
}

impl_clone_in_for_clone!(bool, u8, u32, usize, i32, compact_str::CompactString);
