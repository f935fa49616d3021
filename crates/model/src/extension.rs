//! Decoding of the variable length extension attached to an order.
//!
//! The first 32 bytes are a header of eight big-endian `u32` end offsets,
//! field `i` stored in bits `32 * i .. 32 * (i + 1)` of the header word. The
//! offsets are relative to the first byte after the header and the fields
//! are laid out back to back: field `i` begins where field `i - 1` ends.
//! Whatever follows the end of the last field is custom data.
//!
//! An extension is bound to its order by the salt: the low 160 bits of the
//! salt must equal the low 160 bits of `keccak256(extension)`.

use {
    alloy::primitives::{Address, U256, keccak256},
    std::ops::Range,
};

const HEADER_LEN: usize = 32;
const FIELD_COUNT: usize = 8;
const ADDRESS_LEN: usize = 20;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Field {
    MakerAssetSuffix = 0,
    TakerAssetSuffix = 1,
    MakingAmountData = 2,
    TakingAmountData = 3,
    Predicate = 4,
    MakerPermit = 5,
    PreInteractionData = 6,
    PostInteractionData = 7,
}

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::MakerAssetSuffix,
        Field::TakerAssetSuffix,
        Field::MakingAmountData,
        Field::TakingAmountData,
        Field::Predicate,
        Field::MakerPermit,
        Field::PreInteractionData,
        Field::PostInteractionData,
    ];
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum ExtensionError {
    #[error("extension of {len} bytes is shorter than its 32 byte header")]
    MissingHeader { len: usize },
    #[error("{field:?} ends at {end} past the {len} bytes of field data")]
    OffsetOutOfBounds { field: Field, end: u32, len: usize },
    #[error("{field:?} ends at {end} before it begins at {begin}")]
    NonMonotonicOffsets { field: Field, begin: u32, end: u32 },
}

/// A validated view into extension bytes.
///
/// Every offset is checked on construction, accessing a field afterwards
/// can't go out of bounds.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Extension<'a> {
    bytes: &'a [u8],
    fields: [Range<usize>; FIELD_COUNT],
    custom: Range<usize>,
}

impl<'a> Extension<'a> {
    /// Decodes the extension bytes. An empty byte string is the empty
    /// extension, any other input shorter than the header is rejected.
    pub fn decode(bytes: &'a [u8]) -> Result<Self, ExtensionError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        if bytes.len() < HEADER_LEN {
            return Err(ExtensionError::MissingHeader { len: bytes.len() });
        }

        let len = bytes.len() - HEADER_LEN;
        let mut fields: [Range<usize>; FIELD_COUNT] = Default::default();
        let mut begin = 0u32;
        for field in Field::ALL {
            let end = end_offset(bytes, field);
            if end < begin {
                return Err(ExtensionError::NonMonotonicOffsets { field, begin, end });
            }
            // u32 always fits into usize on supported targets.
            let end_usize = end as usize;
            if end_usize > len {
                return Err(ExtensionError::OffsetOutOfBounds { field, end, len });
            }
            fields[field as usize] = HEADER_LEN + begin as usize..HEADER_LEN + end_usize;
            begin = end;
        }

        Ok(Self {
            bytes,
            fields,
            custom: HEADER_LEN + begin as usize..bytes.len(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the field's bytes, or `None` when the field is absent.
    pub fn field(&self, field: Field) -> Option<&'a [u8]> {
        let range = self.fields[field as usize].clone();
        (!range.is_empty()).then(|| &self.bytes[range])
    }

    pub fn custom_data(&self) -> &'a [u8] {
        &self.bytes[self.custom.clone()]
    }

    pub fn pre_interaction(&self) -> Option<Interaction<'a>> {
        self.field(Field::PreInteractionData).map(Interaction::split)
    }

    pub fn post_interaction(&self) -> Option<Interaction<'a>> {
        self.field(Field::PostInteractionData).map(Interaction::split)
    }

    /// `keccak256` of the extension bytes truncated to 160 bits.
    pub fn hash(bytes: &[u8]) -> U256 {
        U256::from_be_slice(keccak256(bytes).as_slice()) & low_160_mask()
    }

    /// Whether the extension bytes are the ones committed to by `salt`.
    pub fn is_bound_to(bytes: &[u8], salt: U256) -> bool {
        Self::hash(bytes) == salt & low_160_mask()
    }

    pub fn builder() -> Builder {
        Builder::default()
    }
}

fn end_offset(bytes: &[u8], field: Field) -> u32 {
    let index = field as usize;
    let start = HEADER_LEN - 4 * (index + 1);
    let mut end = [0u8; 4];
    end.copy_from_slice(&bytes[start..start + 4]);
    u32::from_be_bytes(end)
}

fn low_160_mask() -> U256 {
    (U256::from(1) << 160) - U256::from(1)
}

/// An interaction segment: a call target followed by opaque data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Interaction<'a> {
    /// `None` when the segment is shorter than an address. The caller then
    /// decides who to notify.
    pub target: Option<Address>,
    pub data: &'a [u8],
}

impl<'a> Interaction<'a> {
    pub fn split(segment: &'a [u8]) -> Self {
        if segment.len() < ADDRESS_LEN {
            return Self {
                target: None,
                data: segment,
            };
        }
        let (target, data) = segment.split_at(ADDRESS_LEN);
        Self {
            target: Some(Address::from_slice(target)),
            data,
        }
    }
}

/// Assembles extension bytes from individual fields.
#[derive(Clone, Debug, Default)]
pub struct Builder {
    fields: [Vec<u8>; FIELD_COUNT],
    custom: Vec<u8>,
}

impl Builder {
    pub fn field(mut self, field: Field, data: impl Into<Vec<u8>>) -> Self {
        self.fields[field as usize] = data.into();
        self
    }

    pub fn pre_interaction(self, target: Address, data: &[u8]) -> Self {
        self.field(Field::PreInteractionData, [target.as_slice(), data].concat())
    }

    pub fn post_interaction(self, target: Address, data: &[u8]) -> Self {
        self.field(Field::PostInteractionData, [target.as_slice(), data].concat())
    }

    pub fn custom_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.custom = data.into();
        self
    }

    /// Concatenates the fields behind their offset header.
    ///
    /// # Panics
    ///
    /// Panics if the fields are longer than `u32::MAX` bytes in total.
    pub fn build(self) -> Vec<u8> {
        let mut header = [0u8; HEADER_LEN];
        let mut body = Vec::new();
        for (index, field) in self.fields.iter().enumerate() {
            body.extend_from_slice(field);
            let end = u32::try_from(body.len()).expect("extension fields exceed u32 offsets");
            let start = HEADER_LEN - 4 * (index + 1);
            header[start..start + 4].copy_from_slice(&end.to_be_bytes());
        }
        if body.is_empty() && self.custom.is_empty() {
            return Vec::new();
        }
        [&header[..], &body[..], &self.custom[..]].concat()
    }
}
