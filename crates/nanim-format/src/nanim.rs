//! Versioned NANIM schema over the schemaless document codec.
//!
//! `anim_data` holds `{version, animations: {id -> {duration, timelines,
//! metadata}}}`. Version 1 stored each keyframe as an object
//! `{time, position, rotation}`; versions 2 and 3 use a flat
//! `[time, x, y, z, qw, qx, qy, qz]` array per key. `character_data`, present
//! only in multi-actor packages, holds the cast descriptor.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::warn;

use crate::archive::{Archive, ArchiveWriter, ANIM_ENTRY, CHARACTER_ENTRY};
use crate::document::{document_from_bytes, read_document, write_document, DocValue};
use crate::error::{FormatError, Result};

pub const MAX_VERSION: u32 = 3;

/// One sampled key on the wire: seconds, translation, rotation (w, x, y, z).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawKeyframe {
    pub time: f32,
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
}

/// Per-node key list, already ordered by time on well-formed files.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTimeline {
    pub keys: Vec<RawKeyframe>,
}

/// One animation as stored: duration plus timelines keyed by node name.
/// Nodes absent from the file simply have no entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawAnimation {
    pub duration: f32,
    pub timelines: Vec<(String, RawTimeline)>,
    pub metadata: Vec<(String, Vec<String>)>,
}

/// The `anim_data` entry: a named set of animations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationSet {
    pub version: u32,
    pub animations: Vec<(String, RawAnimation)>,
}

impl AnimationSet {
    pub fn get(&self, id: &str) -> Option<&RawAnimation> {
        self.animations
            .iter()
            .find_map(|(k, a)| if k == id { Some(a) } else { None })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenderFilter {
    Male,
    Female,
    #[default]
    Any,
}

impl GenderFilter {
    pub fn matches(&self, is_female: bool) -> bool {
        match self {
            GenderFilter::Male => !is_female,
            GenderFilter::Female => is_female,
            GenderFilter::Any => true,
        }
    }
}

/// One actor in a multi-character package.
#[derive(Clone, Debug, PartialEq)]
pub struct CastEntry {
    pub id: String,
    /// Target skeleton / behavior-graph id the actor's timelines address.
    pub graph: String,
    pub gender: GenderFilter,
    pub scale: Option<f32>,
}

/// The optional `character_data` entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CharacterSet {
    pub id: String,
    pub characters: Vec<CastEntry>,
}

fn require<'a>(doc: &'a DocValue, key: &str) -> Result<&'a DocValue> {
    doc.get(key)
        .ok_or_else(|| FormatError::Malformed(format!("missing field '{key}'")))
}

fn float_at(items: &[DocValue], idx: usize, ctx: &str) -> Result<f32> {
    items
        .get(idx)
        .and_then(DocValue::as_f32)
        .ok_or_else(|| FormatError::Malformed(format!("{ctx}: bad float at index {idx}")))
}

fn parse_keyframe_v1(doc: &DocValue) -> Result<RawKeyframe> {
    let time = require(doc, "time")?
        .as_f32()
        .ok_or_else(|| FormatError::Malformed("keyframe time is not a number".into()))?;
    let pos = require(doc, "position")?
        .as_array()
        .ok_or_else(|| FormatError::Malformed("keyframe position is not an array".into()))?;
    let rot = require(doc, "rotation")?
        .as_array()
        .ok_or_else(|| FormatError::Malformed("keyframe rotation is not an array".into()))?;
    if pos.len() != 3 || rot.len() != 4 {
        return Err(FormatError::Malformed(
            "keyframe position/rotation arity".into(),
        ));
    }
    Ok(RawKeyframe {
        time,
        translation: [
            float_at(pos, 0, "position")?,
            float_at(pos, 1, "position")?,
            float_at(pos, 2, "position")?,
        ],
        rotation: [
            float_at(rot, 0, "rotation")?,
            float_at(rot, 1, "rotation")?,
            float_at(rot, 2, "rotation")?,
            float_at(rot, 3, "rotation")?,
        ],
    })
}

fn parse_keyframe_flat(doc: &DocValue) -> Result<RawKeyframe> {
    let items = doc
        .as_array()
        .ok_or_else(|| FormatError::Malformed("keyframe is not an array".into()))?;
    if items.len() != 8 {
        return Err(FormatError::Malformed(format!(
            "keyframe array has {} elements, expected 8",
            items.len()
        )));
    }
    Ok(RawKeyframe {
        time: float_at(items, 0, "keyframe")?,
        translation: [
            float_at(items, 1, "keyframe")?,
            float_at(items, 2, "keyframe")?,
            float_at(items, 3, "keyframe")?,
        ],
        rotation: [
            float_at(items, 4, "keyframe")?,
            float_at(items, 5, "keyframe")?,
            float_at(items, 6, "keyframe")?,
            float_at(items, 7, "keyframe")?,
        ],
    })
}

fn parse_timeline(doc: &DocValue, version: u32) -> Result<RawTimeline> {
    let items = doc
        .as_array()
        .ok_or_else(|| FormatError::Malformed("timeline is not an array".into()))?;
    let mut keys = Vec::with_capacity(items.len());
    for item in items {
        keys.push(if version == 1 {
            parse_keyframe_v1(item)?
        } else {
            parse_keyframe_flat(item)?
        });
    }
    Ok(RawTimeline { keys })
}

fn parse_metadata(doc: Option<&DocValue>) -> Result<Vec<(String, Vec<String>)>> {
    let Some(entries) = doc.and_then(DocValue::as_map) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let items = value
            .as_array()
            .ok_or_else(|| FormatError::Malformed(format!("metadata '{key}' is not a list")))?;
        let mut strings = Vec::with_capacity(items.len());
        for item in items {
            strings.push(
                item.as_str()
                    .ok_or_else(|| {
                        FormatError::Malformed(format!("metadata '{key}' holds a non-string"))
                    })?
                    .to_string(),
            );
        }
        out.push((key.clone(), strings));
    }
    Ok(out)
}

fn parse_animation(doc: &DocValue, version: u32) -> Result<RawAnimation> {
    let duration = require(doc, "duration")?
        .as_f32()
        .ok_or_else(|| FormatError::Malformed("animation duration is not a number".into()))?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(FormatError::Malformed(format!(
            "animation duration {duration} is not positive"
        )));
    }
    let timelines_doc = require(doc, "timelines")?
        .as_map()
        .ok_or_else(|| FormatError::Malformed("timelines is not a map".into()))?;
    let mut timelines = Vec::with_capacity(timelines_doc.len());
    for (node, tl) in timelines_doc {
        timelines.push((node.clone(), parse_timeline(tl, version)?));
    }
    Ok(RawAnimation {
        duration,
        timelines,
        metadata: parse_metadata(doc.get("metadata"))?,
    })
}

/// Parse an `anim_data` document into an [`AnimationSet`].
pub fn parse_animation_set(doc: &DocValue) -> Result<AnimationSet> {
    let version = require(doc, "version")?
        .as_i64()
        .ok_or_else(|| FormatError::Malformed("version is not an integer".into()))? as u32;
    if version == 0 || version > MAX_VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }
    let anims_doc = require(doc, "animations")?
        .as_map()
        .ok_or_else(|| FormatError::Malformed("animations is not a map".into()))?;
    let mut animations: Vec<(String, RawAnimation)> = Vec::with_capacity(anims_doc.len());
    for (id, anim_doc) in anims_doc {
        let anim = parse_animation(anim_doc, version)?;
        if let Some(slot) = animations.iter_mut().find(|(k, _)| k == id) {
            // Last-loaded entry wins on duplicate ids.
            warn!("duplicate animation id '{id}', keeping the later entry");
            slot.1 = anim;
        } else {
            animations.push((id.clone(), anim));
        }
    }
    Ok(AnimationSet {
        version,
        animations,
    })
}

/// Parse a `character_data` document.
pub fn parse_character_set(doc: &DocValue) -> Result<CharacterSet> {
    let id = require(doc, "id")?
        .as_str()
        .ok_or_else(|| FormatError::Malformed("character set id is not a string".into()))?
        .to_string();
    let chars_doc = require(doc, "characters")?
        .as_array()
        .ok_or_else(|| FormatError::Malformed("characters is not an array".into()))?;
    let mut characters = Vec::with_capacity(chars_doc.len());
    for entry in chars_doc {
        let gender = match entry.get("gender").and_then(DocValue::as_str) {
            Some("Male") => GenderFilter::Male,
            Some("Female") => GenderFilter::Female,
            Some(other) => {
                return Err(FormatError::Malformed(format!(
                    "unknown gender filter '{other}'"
                )))
            }
            None => GenderFilter::Any,
        };
        characters.push(CastEntry {
            id: require(entry, "id")?
                .as_str()
                .ok_or_else(|| FormatError::Malformed("character id is not a string".into()))?
                .to_string(),
            graph: require(entry, "graph")?
                .as_str()
                .ok_or_else(|| FormatError::Malformed("character graph is not a string".into()))?
                .to_string(),
            gender,
            scale: entry.get("scale").and_then(DocValue::as_f32),
        });
    }
    Ok(CharacterSet { id, characters })
}

/// Serialize an [`AnimationSet`] as a current-version (3) document.
pub fn animation_set_to_document(set: &AnimationSet) -> DocValue {
    let mut anims = Vec::with_capacity(set.animations.len());
    for (id, anim) in &set.animations {
        let mut timelines = Vec::with_capacity(anim.timelines.len());
        for (node, tl) in &anim.timelines {
            let keys = tl
                .keys
                .iter()
                .map(|k| {
                    DocValue::Array(vec![
                        DocValue::F32(k.time),
                        DocValue::F32(k.translation[0]),
                        DocValue::F32(k.translation[1]),
                        DocValue::F32(k.translation[2]),
                        DocValue::F32(k.rotation[0]),
                        DocValue::F32(k.rotation[1]),
                        DocValue::F32(k.rotation[2]),
                        DocValue::F32(k.rotation[3]),
                    ])
                })
                .collect();
            timelines.push((node.clone(), DocValue::Array(keys)));
        }
        let mut fields = vec![
            ("duration".to_string(), DocValue::F32(anim.duration)),
            ("timelines".to_string(), DocValue::Map(timelines)),
        ];
        if !anim.metadata.is_empty() {
            let metadata = anim
                .metadata
                .iter()
                .map(|(k, vs)| {
                    (
                        k.clone(),
                        DocValue::Array(vs.iter().map(|s| DocValue::Str(s.clone())).collect()),
                    )
                })
                .collect();
            fields.push(("metadata".to_string(), DocValue::Map(metadata)));
        }
        anims.push((id.clone(), DocValue::Map(fields)));
    }
    DocValue::Map(vec![
        ("version".to_string(), DocValue::I32(MAX_VERSION as i32)),
        ("animations".to_string(), DocValue::Map(anims)),
    ])
}

/// Load the animation set from a file. Falls back to treating the whole file
/// as a bare (pre-archive) document when the archive magic is absent.
pub fn load_animation_set(path: &Path) -> Result<AnimationSet> {
    match Archive::open(path) {
        Ok(archive) => {
            let bytes = archive.require(ANIM_ENTRY)?;
            parse_animation_set(&document_from_bytes(bytes)?)
        }
        Err(FormatError::NotAnArchive) => {
            let mut r = BufReader::new(File::open(path)?);
            parse_animation_set(&read_document(&mut r)?)
        }
        Err(e) => Err(e),
    }
}

/// Load the cast descriptor, if the file is an archive carrying one.
/// Pre-archive files never held character data, so there is no fallback here.
pub fn load_character_set(path: &Path) -> Result<Option<CharacterSet>> {
    let archive = Archive::open(path)?;
    match archive.entry(CHARACTER_ENTRY) {
        Some(bytes) => Ok(Some(parse_character_set(&document_from_bytes(bytes)?)?)),
        None => Ok(None),
    }
}

/// Write an animation set (and optional cast descriptor) as an archive.
pub fn save_animation_set(
    path: &Path,
    set: &AnimationSet,
    characters: Option<&CharacterSet>,
) -> Result<()> {
    let mut anim_bytes = Vec::new();
    write_document(&mut anim_bytes, &animation_set_to_document(set))?;
    let mut writer = ArchiveWriter::new();
    writer.add_entry(ANIM_ENTRY, anim_bytes);
    if let Some(cast) = characters {
        let mut cast_bytes = Vec::new();
        write_document(&mut cast_bytes, &character_set_to_document(cast))?;
        writer.add_entry(CHARACTER_ENTRY, cast_bytes);
    }
    let mut w = BufWriter::new(File::create(path)?);
    writer.write_to(&mut w)?;
    w.flush()?;
    Ok(())
}

/// Serialize a cast descriptor.
pub fn character_set_to_document(set: &CharacterSet) -> DocValue {
    let characters = set
        .characters
        .iter()
        .map(|c| {
            let mut fields = Vec::new();
            match c.gender {
                GenderFilter::Male => {
                    fields.push(("gender".to_string(), DocValue::Str("Male".into())))
                }
                GenderFilter::Female => {
                    fields.push(("gender".to_string(), DocValue::Str("Female".into())))
                }
                GenderFilter::Any => {}
            }
            fields.push(("graph".to_string(), DocValue::Str(c.graph.clone())));
            fields.push(("id".to_string(), DocValue::Str(c.id.clone())));
            if let Some(scale) = c.scale {
                fields.push(("scale".to_string(), DocValue::F32(scale)));
            }
            DocValue::Map(fields)
        })
        .collect();
    DocValue::Map(vec![
        ("id".to_string(), DocValue::Str(set.id.clone())),
        ("characters".to_string(), DocValue::Array(characters)),
    ])
}
