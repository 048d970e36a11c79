//! Flags shared between the transform passes and the runtime.

use bitflags::bitflags;
use smallvec::SmallVec;

bitflags! {
    /// Change-tracking hints attached to a vnode call.
    ///
    /// Positive values are combinable bits. `HOISTED` and `BAIL` are
    /// special markers and must be compared with `==`, never `contains`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PatchFlags: i32 {
        /// Dynamic text content.
        const TEXT = 1;
        /// Dynamic `class` binding.
        const CLASS = 1 << 1;
        /// Dynamic `style` binding.
        const STYLE = 1 << 2;
        /// Dynamic props other than class/style, listed in `dynamicProps`.
        const PROPS = 1 << 3;
        /// Props with dynamic keys; requires a full diff.
        const FULL_PROPS = 1 << 4;
        /// Event listeners must be attached during hydration.
        const NEED_HYDRATION = 1 << 5;
        /// Fragment whose children order never changes.
        const STABLE_FRAGMENT = 1 << 6;
        /// Fragment with keyed children.
        const KEYED_FRAGMENT = 1 << 7;
        /// Fragment with unkeyed children.
        const UNKEYED_FRAGMENT = 1 << 8;
        /// Needs patching for refs, vnode hooks or runtime directives.
        const NEED_PATCH = 1 << 9;
        /// Component with dynamic slots.
        const DYNAMIC_SLOTS = 1 << 10;
        /// Fragment created only because of dev-only root comments.
        const DEV_ROOT_FRAGMENT = 1 << 11;
        /// Static vnode lifted out of the render function.
        const HOISTED = -1;
        /// Diffing should leave optimized mode.
        const BAIL = -2;
    }
}

const FLAG_NAMES: [(PatchFlags, &str); 12] = [
    (PatchFlags::TEXT, "TEXT"),
    (PatchFlags::CLASS, "CLASS"),
    (PatchFlags::STYLE, "STYLE"),
    (PatchFlags::PROPS, "PROPS"),
    (PatchFlags::FULL_PROPS, "FULL_PROPS"),
    (PatchFlags::NEED_HYDRATION, "NEED_HYDRATION"),
    (PatchFlags::STABLE_FRAGMENT, "STABLE_FRAGMENT"),
    (PatchFlags::KEYED_FRAGMENT, "KEYED_FRAGMENT"),
    (PatchFlags::UNKEYED_FRAGMENT, "UNKEYED_FRAGMENT"),
    (PatchFlags::NEED_PATCH, "NEED_PATCH"),
    (PatchFlags::DYNAMIC_SLOTS, "DYNAMIC_SLOTS"),
    (PatchFlags::DEV_ROOT_FRAGMENT, "DEV_ROOT_FRAGMENT"),
];

impl PatchFlags {
    /// Whether this value is one of the negative markers.
    #[inline]
    pub fn is_special(self) -> bool {
        self.bits() < 0
    }

    /// Flag names in bit order, used for development annotations.
    pub fn names(self) -> SmallVec<[&'static str; 4]> {
        let mut names = SmallVec::new();
        if self == Self::HOISTED {
            names.push("HOISTED");
            return names;
        }
        if self == Self::BAIL {
            names.push("BAIL");
            return names;
        }
        for (flag, name) in FLAG_NAMES {
            if self.contains(flag) {
                names.push(name);
            }
        }
        names
    }
}

/// Describes how a component's slots object may change between renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SlotFlags {
    /// Slots only reference slot props or context state.
    Stable = 1,
    /// Slots depend on conditional or looped structure.
    Dynamic = 2,
    /// Slots pass through parent slots (`<slot/>` inside a component slot).
    Forwarded = 3,
}

impl SlotFlags {
    pub fn name(self) -> &'static str {
        match self {
            Self::Stable => "STABLE",
            Self::Dynamic => "DYNAMIC",
            Self::Forwarded => "FORWARDED",
        }
    }
}
