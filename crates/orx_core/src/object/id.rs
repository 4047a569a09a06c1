//! # Structure Identifiers
//!
//! Structure types, storage kinds and GUIDs.
//!
//! A GUID packs three fields into 64 bits:
//! - Bits 0..8: structure type
//! - Bits 8..32: item index in the type's header bank
//! - Bits 32..64: instance counter of the type at creation

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every structure type known to the engine.
///
/// Linkable types come first, see [`StructureId::LINKABLE_NUMBER`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum StructureId {
    /// Animation pointer.
    AnimPointer = 0,
    /// Physical body.
    Body,
    /// Clock.
    Clock,
    /// Spatial frame.
    Frame,
    /// FX pointer.
    FxPointer,
    /// Graphic.
    Graphic,
    /// Shader pointer.
    ShaderPointer,
    /// Sound pointer.
    SoundPointer,
    /// Spawner.
    Spawner,
    /// Timeline.
    TimeLine,
    /// Trigger.
    Trigger,
    /// Animation.
    Anim,
    /// Animation set.
    AnimSet,
    /// Camera.
    Camera,
    /// Font.
    Font,
    /// FX.
    Fx,
    /// Object.
    Object,
    /// Shader.
    Shader,
    /// Sound.
    Sound,
    /// Text.
    Text,
    /// Texture.
    Texture,
    /// Viewport.
    Viewport,
}

impl StructureId {
    /// Number of structure types.
    pub const NUMBER: usize = 22;

    /// Number of types that can be linked to an object.
    pub const LINKABLE_NUMBER: usize = 11;

    /// Every type, in id order.
    pub const ALL: [Self; Self::NUMBER] = [
        Self::AnimPointer,
        Self::Body,
        Self::Clock,
        Self::Frame,
        Self::FxPointer,
        Self::Graphic,
        Self::ShaderPointer,
        Self::SoundPointer,
        Self::Spawner,
        Self::TimeLine,
        Self::Trigger,
        Self::Anim,
        Self::AnimSet,
        Self::Camera,
        Self::Font,
        Self::Fx,
        Self::Object,
        Self::Shader,
        Self::Sound,
        Self::Text,
        Self::Texture,
        Self::Viewport,
    ];

    /// Returns the type with the given raw id.
    #[inline]
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::NUMBER {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Checks whether structures of this type can be linked to an object.
    #[inline]
    #[must_use]
    pub const fn is_linkable(self) -> bool {
        self.index() < Self::LINKABLE_NUMBER
    }

    /// Returns the type's literal name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AnimPointer => "ANIMPOINTER",
            Self::Body => "BODY",
            Self::Clock => "CLOCK",
            Self::Frame => "FRAME",
            Self::FxPointer => "FXPOINTER",
            Self::Graphic => "GRAPHIC",
            Self::ShaderPointer => "SHADERPOINTER",
            Self::SoundPointer => "SOUNDPOINTER",
            Self::Spawner => "SPAWNER",
            Self::TimeLine => "TIMELINE",
            Self::Trigger => "TRIGGER",
            Self::Anim => "ANIM",
            Self::AnimSet => "ANIMSET",
            Self::Camera => "CAMERA",
            Self::Font => "FONT",
            Self::Fx => "FX",
            Self::Object => "OBJECT",
            Self::Shader => "SHADER",
            Self::Sound => "SOUND",
            Self::Text => "TEXT",
            Self::Texture => "TEXTURE",
            Self::Viewport => "VIEWPORT",
        }
    }
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Physical storage backing a structure type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Doubly-linked list, new structures go to the head.
    List,
    /// Tree, new structures go under the type's root.
    Tree,
}

/// Globally unique structure identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Guid(u64);

impl Guid {
    /// No structure.
    pub const NONE: Self = Self(u64::MAX);

    /// Largest item index a GUID can carry.
    pub const ITEM_MAX: u32 = 0x00FF_FFFF;

    const ID_MASK: u64 = 0x0000_0000_0000_00FF;
    const ITEM_SHIFT: u32 = 8;
    const ITEM_MASK: u64 = 0x0000_0000_FFFF_FF00;
    const INSTANCE_SHIFT: u32 = 32;

    /// Packs a GUID.
    ///
    /// # Panics
    ///
    /// Panics if `item` exceeds [`Guid::ITEM_MAX`].
    #[inline]
    #[must_use]
    pub const fn new(id: StructureId, item: u32, instance: u32) -> Self {
        assert!(item <= Self::ITEM_MAX, "GUID item index out of range");
        Self(
            ((instance as u64) << Self::INSTANCE_SHIFT)
                | ((item as u64) << Self::ITEM_SHIFT)
                | id as u64,
        )
    }

    /// Returns the structure type, `None` for [`Guid::NONE`] or garbage.
    #[inline]
    #[must_use]
    pub const fn structure_id(self) -> Option<StructureId> {
        StructureId::from_index((self.0 & Self::ID_MASK) as usize)
    }

    /// Returns the item index.
    #[inline]
    #[must_use]
    pub const fn item(self) -> u32 {
        ((self.0 & Self::ITEM_MASK) >> Self::ITEM_SHIFT) as u32
    }

    /// Returns the instance counter.
    #[inline]
    #[must_use]
    pub const fn instance(self) -> u32 {
        (self.0 >> Self::INSTANCE_SHIFT) as u32
    }

    /// Checks whether this is [`Guid::NONE`].
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }

    /// Returns the packed value.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Rebuilds a GUID from its packed value.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl Default for Guid {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.structure_id() {
            Some(id) if !self.is_none() => f
                .debug_struct("Guid")
                .field("id", &id)
                .field("item", &self.item())
                .field("instance", &self.instance())
                .finish(),
            _ => write!(f, "Guid({self})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_layout() {
        let guid = Guid::new(StructureId::Frame, 0x12_3456, 0xABCD_0001);
        assert_eq!(guid.to_bits(), 0xABCD_0001_1234_5603);
        assert_eq!(guid.structure_id(), Some(StructureId::Frame));
        assert_eq!(guid.item(), 0x12_3456);
        assert_eq!(guid.instance(), 0xABCD_0001);
    }

    #[test]
    fn test_guid_none() {
        assert!(Guid::default().is_none());
        assert_eq!(Guid::NONE.structure_id(), None);
        assert_eq!(Guid::NONE.to_string(), "0xFFFFFFFFFFFFFFFF");
    }

    #[test]
    fn test_structure_id_table() {
        for (index, id) in StructureId::ALL.iter().enumerate() {
            assert_eq!(id.index(), index);
            assert_eq!(StructureId::from_index(index), Some(*id));
        }
        assert_eq!(StructureId::from_index(StructureId::NUMBER), None);
        assert!(StructureId::Trigger.is_linkable());
        assert!(!StructureId::Anim.is_linkable());
        assert_eq!(StructureId::FxPointer.name(), "FXPOINTER");
    }
}
