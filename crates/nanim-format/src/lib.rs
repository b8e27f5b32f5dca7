//! NANIM binary container (engine-agnostic).
//!
//! Three layers, bottom up:
//! - `document`: a schemaless length-prefixed binary value tree.
//! - `archive`: the named-entry wrapper (`anim_data`, `character_data`) with a
//!   bare-document fallback for pre-archive files.
//! - `nanim`: the versioned (1-3) animation / character schema parsed out of
//!   those documents into raw, math-library-free data types.

pub mod archive;
pub mod document;
pub mod error;
pub mod nanim;

pub use archive::{Archive, ArchiveWriter, ANIM_ENTRY, CHARACTER_ENTRY};
pub use document::{document_from_bytes, read_document, write_document, DocValue};
pub use error::{FormatError, Result};
pub use nanim::{
    load_animation_set, load_character_set, parse_animation_set, parse_character_set,
    save_animation_set, AnimationSet, CastEntry, CharacterSet, GenderFilter, RawAnimation,
    RawKeyframe, RawTimeline, MAX_VERSION,
};
