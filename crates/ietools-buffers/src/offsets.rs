//! Offset arrays for repeated substructures
//!
//! Infinity Engine resources describe variable-length lists of records with
//! a header triple: an offset field pointing at the first record, a count
//! field, and sometimes a start-index field. [`OffsetArraySpec`] captures
//! where those fields live and how wide they are; the buffer turns it into
//! absolute offsets of every record.
//!
//! ```
//! use ietools_buffers::ByteBuffer;
//! use ietools_buffers::offsets::presets;
//!
//! let mut itm = ByteBuffer::with_len(0x72 + 2 * 0x38);
//! itm.put_u32(0x64, 0x72).unwrap(); // ability table offset
//! itm.put_u16(0x68, 2).unwrap(); // ability count
//!
//! let abilities = itm.get_offset_array(&presets::ITM_V10_HEADERS).unwrap();
//! assert_eq!(abilities, vec![0x72, 0x72 + 0x38]);
//! ```

use crate::buffer::ByteBuffer;
use crate::error::{BufferError, BufferResult};

/// Width of an integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldWidth {
    /// 8-bit field
    Byte = 1,
    /// 16-bit field
    Word = 2,
    /// 32-bit field
    Dword = 4,
}

impl FieldWidth {
    /// Parse a width given in bytes
    pub fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            1 => Some(Self::Byte),
            2 => Some(Self::Word),
            4 => Some(Self::Dword),
            _ => None,
        }
    }
}

/// Location and layout of a list of substructures
///
/// Widths are given in bytes. An `index_field` of zero means the list has no
/// start index field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffsetArraySpec {
    /// Offset of the field holding the list offset
    pub offset_field: usize,
    /// Width of the list offset field (2 or 4)
    pub offset_width: usize,
    /// Offset of the field holding the record count
    pub count_field: usize,
    /// Width of the count field (1, 2 or 4)
    pub count_width: usize,
    /// Offset of the field holding the start index, or 0
    pub index_field: usize,
    /// Width of the start index field (1, 2 or 4), ignored without index
    pub index_width: usize,
    /// Size of a single record in bytes
    pub struct_size: usize,
}

/// Validated field widths
struct Widths {
    offset: FieldWidth,
    count: FieldWidth,
    index: Option<FieldWidth>,
}

impl OffsetArraySpec {
    /// Build a spec from the classic seven-value tuple
    pub const fn new(
        offset_field: usize,
        offset_width: usize,
        count_field: usize,
        count_width: usize,
        index_field: usize,
        index_width: usize,
        struct_size: usize,
    ) -> Self {
        Self {
            offset_field,
            offset_width,
            count_field,
            count_width,
            index_field,
            index_width,
            struct_size,
        }
    }

    /// Whether the list has a start index field
    pub fn has_index(&self) -> bool {
        self.index_field > 0
    }

    fn widths(&self) -> BufferResult<Widths> {
        let invalid = |msg: String| BufferError::InvalidArguments(msg);

        if self.offset_field == 0 {
            return Err(invalid("offset field position must be non-zero".into()));
        }
        if self.count_field == 0 {
            return Err(invalid("count field position must be non-zero".into()));
        }
        if self.struct_size == 0 {
            return Err(invalid("struct size must be non-zero".into()));
        }

        let offset = match FieldWidth::from_bytes(self.offset_width) {
            Some(w @ (FieldWidth::Word | FieldWidth::Dword)) => w,
            _ => {
                return Err(invalid(format!(
                    "offset field width must be 2 or 4, got {}",
                    self.offset_width
                )));
            }
        };
        let count = FieldWidth::from_bytes(self.count_width).ok_or_else(|| {
            invalid(format!(
                "count field width must be 1, 2 or 4, got {}",
                self.count_width
            ))
        })?;
        let index = if self.has_index() {
            Some(FieldWidth::from_bytes(self.index_width).ok_or_else(|| {
                invalid(format!(
                    "index field width must be 1, 2 or 4, got {}",
                    self.index_width
                ))
            })?)
        } else {
            None
        };

        Ok(Widths {
            offset,
            count,
            index,
        })
    }

    /// Re-anchor count and index fields at `ref_offset`
    fn relative_to(&self, ref_offset: usize) -> BufferResult<Self> {
        let shift = |field: usize| {
            ref_offset.checked_add(field).ok_or_else(|| {
                BufferError::InvalidArguments(format!(
                    "field {field:#x} relative to {ref_offset:#x} overflows"
                ))
            })
        };
        let index_field = if self.index_field > 0 && self.index_width > 0 {
            shift(self.index_field)?
        } else {
            0
        };
        Ok(Self {
            count_field: shift(self.count_field)?,
            index_field,
            ..*self
        })
    }
}

impl ByteBuffer {
    /// Absolute offsets of every record described by `spec`
    ///
    /// Reads the list offset, the record count and the optional start index
    /// as signed values and returns `offset + i * struct_size` for every
    /// `i` in `index..count`. A non-positive offset or count, a negative
    /// index, or an index not below the count yields an empty list.
    ///
    /// Fails with [`BufferError::OutOfRange`] when the last record would
    /// start past the end of the buffer.
    pub fn get_offset_array(&mut self, spec: &OffsetArraySpec) -> BufferResult<Vec<usize>> {
        self.check()?;
        let widths = match spec.widths() {
            Ok(widths) => widths,
            Err(err) => return self.fail(err),
        };

        let base = i64::from(self.get_int(spec.offset_field, widths.offset)?);
        let count = i64::from(self.get_int(spec.count_field, widths.count)?);
        let index = match widths.index {
            Some(width) => i64::from(self.get_int(spec.index_field, width)?),
            None => 0,
        };

        if base <= 0 || count <= 0 || index < 0 || count <= index {
            return Ok(Vec::new());
        }

        // Every record must start inside the buffer
        let len = self.buffer_length();
        let last = usize::try_from(count - 1)
            .ok()
            .and_then(|last| last.checked_mul(spec.struct_size))
            .and_then(|span| span.checked_add(base as usize));
        match last {
            Some(last) if last < len => {}
            Some(last) => {
                return self.fail(BufferError::OutOfRange {
                    offset: last,
                    size: spec.struct_size,
                    len,
                });
            }
            None => {
                return self.fail(BufferError::InvalidArguments(format!(
                    "{count} records of {} bytes at {base:#x} overflow",
                    spec.struct_size
                )));
            }
        }

        let base = base as usize;
        Ok((index as usize..count as usize)
            .map(|i| base + i * spec.struct_size)
            .collect())
    }

    /// Absolute offsets of records nested inside the record at `ref_offset`
    ///
    /// The list offset is read as in [`ByteBuffer::get_offset_array`]; the
    /// count and index fields are resolved relative to `ref_offset`, which
    /// usually comes from a previous `get_offset_array` call.
    pub fn get_offset_array2(
        &mut self,
        ref_offset: usize,
        spec: &OffsetArraySpec,
    ) -> BufferResult<Vec<usize>> {
        self.check()?;
        if ref_offset == 0 {
            return self.fail(BufferError::InvalidArguments(
                "reference offset must be non-zero".into(),
            ));
        }
        match spec.relative_to(ref_offset) {
            Ok(relative) => self.get_offset_array(&relative),
            Err(err) => self.fail(err),
        }
    }
}

/// Layouts of common resource substructures
///
/// Specs for [`ByteBuffer::get_offset_array2`] carry count and index field
/// positions relative to the parent record.
pub mod presets {
    use super::OffsetArraySpec;

    /// ARE V1.0 actors
    pub const ARE_V10_ACTORS: OffsetArraySpec = OffsetArraySpec::new(0x54, 4, 0x58, 2, 0, 0, 0x110);
    /// ARE V1.0 regions
    pub const ARE_V10_REGIONS: OffsetArraySpec = OffsetArraySpec::new(0x5c, 4, 0x5a, 2, 0, 0, 0xc4);
    /// ARE V1.0 spawn points
    pub const ARE_V10_SPAWN_POINTS: OffsetArraySpec = OffsetArraySpec::new(0x60, 4, 0x64, 4, 0, 0, 0xc8);
    /// ARE V1.0 entrances
    pub const ARE_V10_ENTRANCES: OffsetArraySpec = OffsetArraySpec::new(0x68, 4, 0x6c, 4, 0, 0, 0x68);
    /// ARE V1.0 containers
    pub const ARE_V10_CONTAINERS: OffsetArraySpec = OffsetArraySpec::new(0x70, 4, 0x74, 2, 0, 0, 0xc0);
    /// ARE V1.0 ambients
    pub const ARE_V10_AMBIENTS: OffsetArraySpec = OffsetArraySpec::new(0x84, 4, 0x82, 2, 0, 0, 0xd4);
    /// ARE V1.0 doors
    pub const ARE_V10_DOORS: OffsetArraySpec = OffsetArraySpec::new(0xa8, 4, 0xa4, 4, 0, 0, 0xc8);
    /// ARE V1.0 animations
    pub const ARE_V10_ANIMATIONS: OffsetArraySpec = OffsetArraySpec::new(0xb0, 4, 0xac, 4, 0, 0, 0x4c);
    /// ARE V9.1 actors
    pub const ARE_V91_ACTORS: OffsetArraySpec = OffsetArraySpec::new(0x64, 4, 0x68, 2, 0, 0, 0x110);

    /// CRE V1.0 known spells
    pub const CRE_V10_KNOWN_SPELLS: OffsetArraySpec = OffsetArraySpec::new(0x2a0, 4, 0x2a4, 4, 0, 0, 0xc);
    /// CRE V1.0 spell memorization info
    pub const CRE_V10_SPELL_MEM_INFO: OffsetArraySpec = OffsetArraySpec::new(0x2a8, 4, 0x2ac, 4, 0, 0, 0x10);
    /// CRE V1.0 effects
    pub const CRE_V10_EFFECTS: OffsetArraySpec = OffsetArraySpec::new(0x2c4, 4, 0x2c8, 4, 0, 0, 0x108);
    /// CRE V1.0 items
    pub const CRE_V10_ITEMS: OffsetArraySpec = OffsetArraySpec::new(0x2bc, 4, 0x2c0, 4, 0, 0, 0x14);

    /// ITM V1.0 extended headers
    pub const ITM_V10_HEADERS: OffsetArraySpec = OffsetArraySpec::new(0x64, 4, 0x68, 2, 0, 0, 0x38);
    /// ITM V1.0 global effects
    pub const ITM_V10_GEN_EFFECTS: OffsetArraySpec = OffsetArraySpec::new(0x6a, 4, 0x70, 2, 0x6e, 2, 0x30);

    /// SPL V1.0 extended headers
    pub const SPL_V10_HEADERS: OffsetArraySpec = OffsetArraySpec::new(0x64, 4, 0x68, 2, 0, 0, 0x28);
    /// SPL V1.0 global effects
    pub const SPL_V10_GEN_EFFECTS: OffsetArraySpec = OffsetArraySpec::new(0x6a, 4, 0x70, 2, 0x6e, 2, 0x30);

    /// STO V1.0 purchased item types
    pub const STO_V10_ITEMS_PURCHASED: OffsetArraySpec = OffsetArraySpec::new(0x2c, 4, 0x30, 4, 0, 0, 0x4);
    /// STO V1.0 items for sale
    pub const STO_V10_ITEMS_SOLD: OffsetArraySpec = OffsetArraySpec::new(0x34, 4, 0x38, 4, 0, 0, 0x1c);
    /// STO V1.0 drinks
    pub const STO_V10_DRINKS: OffsetArraySpec = OffsetArraySpec::new(0x4c, 4, 0x50, 4, 0, 0, 0x14);
    /// STO V1.0 cures
    pub const STO_V10_CURES: OffsetArraySpec = OffsetArraySpec::new(0x70, 4, 0x74, 4, 0, 0, 0xc);

    /// WMP area entries
    pub const WMP_AREAS: OffsetArraySpec = OffsetArraySpec::new(0x34, 4, 0x30, 4, 0, 0, 0xf0);
    /// WMP area links
    pub const WMP_LINKS: OffsetArraySpec = OffsetArraySpec::new(0x38, 4, 0x3c, 4, 0, 0, 0xd8);

    /// ARE V1.0 container items (relative to a container record)
    pub const ARE_V10_ITEMS: OffsetArraySpec = OffsetArraySpec::new(0x78, 4, 0x44, 4, 0x40, 4, 0x14);
    /// ARE V1.0 region vertices (relative to a region record)
    pub const ARE_V10_REGION_VERTICES: OffsetArraySpec = OffsetArraySpec::new(0x7c, 4, 0x2a, 2, 0x2c, 4, 0x4);
    /// ARE V1.0 container vertices (relative to a container record)
    pub const ARE_V10_CONTAINER_VERTICES: OffsetArraySpec = OffsetArraySpec::new(0x7c, 4, 0x54, 2, 0x50, 4, 0x4);
    /// ARE V1.0 open door outline (relative to a door record)
    pub const ARE_V10_DOOR_OPEN_OUTLINE_VERTICES: OffsetArraySpec = OffsetArraySpec::new(0x7c, 4, 0x30, 2, 0x2c, 4, 0x4);
    /// ARE V1.0 closed door outline (relative to a door record)
    pub const ARE_V10_DOOR_CLOSED_OUTLINE_VERTICES: OffsetArraySpec = OffsetArraySpec::new(0x7c, 4, 0x32, 2, 0x34, 4, 0x4);
    /// ARE V1.0 open door impeded cells (relative to a door record)
    pub const ARE_V10_DOOR_OPEN_CELL_VERTICES: OffsetArraySpec = OffsetArraySpec::new(0x7c, 4, 0x4c, 2, 0x48, 4, 0x4);
    /// ARE V1.0 closed door impeded cells (relative to a door record)
    pub const ARE_V10_DOOR_CLOSED_CELL_VERTICES: OffsetArraySpec = OffsetArraySpec::new(0x7c, 4, 0x4e, 2, 0x50, 4, 0x4);

    /// CRE V1.0 memorized spells (relative to a memorization info record)
    pub const CRE_V10_SPELL_MEM: OffsetArraySpec = OffsetArraySpec::new(0x2b0, 4, 0xc, 4, 0x8, 4, 0xc);

    /// ITM V1.0 ability effects (relative to an extended header)
    pub const ITM_V10_HEAD_EFFECTS: OffsetArraySpec = OffsetArraySpec::new(0x6a, 4, 0x1e, 2, 0x20, 2, 0x30);

    /// SPL V1.0 ability effects (relative to an extended header)
    pub const SPL_V10_HEAD_EFFECTS: OffsetArraySpec = OffsetArraySpec::new(0x6a, 4, 0x1e, 2, 0x20, 2, 0x30);

    /// WMP links leaving an area northwards (relative to an area record)
    pub const WMP_NORTH_LINKS: OffsetArraySpec = OffsetArraySpec::new(0x38, 4, 0x54, 4, 0x50, 4, 0xd8);
    /// WMP links leaving an area westwards (relative to an area record)
    pub const WMP_WEST_LINKS: OffsetArraySpec = OffsetArraySpec::new(0x38, 4, 0x5c, 4, 0x58, 4, 0xd8);
    /// WMP links leaving an area southwards (relative to an area record)
    pub const WMP_SOUTH_LINKS: OffsetArraySpec = OffsetArraySpec::new(0x38, 4, 0x64, 4, 0x60, 4, 0xd8);
    /// WMP links leaving an area eastwards (relative to an area record)
    pub const WMP_EAST_LINKS: OffsetArraySpec = OffsetArraySpec::new(0x38, 4, 0x6c, 4, 0x68, 4, 0xd8);
}
