//! Style declarations and class-based style compaction.
//!
//! Rendering produces one [`StyleDeclarations`] per element and pass. The
//! [`StyleDeduplicator`] then maps every distinct set to a single CSS rule,
//! so thousands of cells that share a handful of looks cost a handful of
//! rules instead of thousands of inline `style` attributes.

mod declarations;
mod dedup;

pub use declarations::{
    CanonicalKey, DeclarationsBuilder, StyleDeclarations, StyleValue, UnstableValue,
};
pub use dedup::{
    deduplicate, validate_class_prefix, ClassAssignments, CompactStyles, GroupId, StyleDeduplicator,
    StyleGroup,
};
