//! Arena owning every node of one compilation.

use bumpalo::Bump;

/// Bump arena wrapper.
///
/// Nodes are never freed individually; the whole arena is dropped (or reset)
/// once the compilation result is no longer needed.
#[derive(Default)]
pub struct Allocator {
    bump: Bump,
}

impl Allocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bump: Bump::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn as_bump(&self) -> &Bump {
        &self.bump
    }

    /// Bytes handed out by the arena so far.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    /// Drop every allocation while keeping the largest chunk for reuse.
    pub fn reset(&mut self) {
        self.bump.reset();
    }
}

impl std::ops::Deref for Allocator {
    type Target = Bump;

    fn deref(&self) -> &Self::Target {
        &self.bump
    }
}

impl std::fmt::Debug for Allocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocator")
            .field("allocated_bytes", &self.bump.allocated_bytes())
            .finish()
    }
}
