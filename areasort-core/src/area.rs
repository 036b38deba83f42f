use std::ops::Range;

use crate::{Result, SorterError};

pub const AREA_TAG: &str = "AREA";
pub const AREA_VERSION: &str = "V1.0";

// Header fields (absolute offsets into the area buffer).
const ACTOR_OFFSET_FIELD: usize = 0x0054;
const ACTOR_COUNT_FIELD: usize = 0x0058;
const CONTAINER_OFFSET_FIELD: usize = 0x0070;
const CONTAINER_COUNT_FIELD: usize = 0x0074;
const ITEM_COUNT_FIELD: usize = 0x0076;
const ITEM_OFFSET_FIELD: usize = 0x0078;
const HEADER_LEN: usize = ITEM_OFFSET_FIELD + 4;

pub const ACTOR_STRIDE: usize = 0x0110;
pub const CONTAINER_STRIDE: usize = 0x00C0;
pub const ITEM_STRIDE: usize = 0x0014;

pub const ACTOR_NAME_LEN: usize = 32;
pub const CONTAINER_NAME_LEN: usize = 32;
pub const ITEM_REFERENCE_LEN: usize = 8;

// Offsets within a container record.
const CONTAINER_FIRST_ITEM: usize = 0x0040;
const CONTAINER_ITEM_COUNT: usize = 0x0044;

/// Decodes a NUL-padded ASCII field, dropping trailing NULs only.
pub fn decode_fixed_string(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |pos| pos + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Encodes `value` into a `width`-byte field, right-padded with NULs.
pub fn encode_fixed_string(value: &str, width: usize) -> Result<Vec<u8>> {
    if !value.is_ascii() || value.len() > width {
        return Err(SorterError::FieldTooLong {
            value: value.to_string(),
            width,
        });
    }
    let mut out = value.as_bytes().to_vec();
    out.resize(width, 0);
    Ok(out)
}

fn le_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Position of one fixed-stride record array inside the area buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordArray {
    pub offset: usize,
    pub count: usize,
    pub stride: usize,
}

impl RecordArray {
    pub fn record_range(&self, index: usize) -> Range<usize> {
        let start = self.offset + index * self.stride;
        start..start + self.stride
    }

    fn end(&self) -> Option<usize> {
        self.count
            .checked_mul(self.stride)
            .and_then(|len| len.checked_add(self.offset))
    }

    fn check_bounds(&self, array: &'static str, len: usize) -> Result<()> {
        match self.end() {
            Some(end) if end <= len => Ok(()),
            _ => Err(SorterError::RecordsOutOfBounds {
                array,
                offset: self.offset,
                count: self.count,
                stride: self.stride,
                len,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaLayout {
    pub actors: RecordArray,
    pub items: RecordArray,
    pub containers: RecordArray,
}

impl AreaLayout {
    fn read(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(SorterError::Truncated {
                context: "area header",
                expected: HEADER_LEN,
                got: data.len(),
            });
        }

        Ok(AreaLayout {
            actors: RecordArray {
                offset: le_u16(data, ACTOR_OFFSET_FIELD) as usize,
                count: le_u16(data, ACTOR_COUNT_FIELD) as usize,
                stride: ACTOR_STRIDE,
            },
            items: RecordArray {
                offset: le_u32(data, ITEM_OFFSET_FIELD) as usize,
                count: le_u16(data, ITEM_COUNT_FIELD) as usize,
                stride: ITEM_STRIDE,
            },
            containers: RecordArray {
                offset: le_u16(data, CONTAINER_OFFSET_FIELD) as usize,
                count: le_u16(data, CONTAINER_COUNT_FIELD) as usize,
                stride: CONTAINER_STRIDE,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub resource_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub name: String,
    pub first_item_index: u32,
    pub item_count: u32,
}

impl Container {
    /// Half-open slot range into the item array, widened so it cannot overflow.
    pub fn item_span(&self) -> Range<u64> {
        let start = u64::from(self.first_item_index);
        start..start + u64::from(self.item_count)
    }
}

/// A decompressed area resource and the record views decoded from it.
///
/// The views are rebuilt from the buffer after every mutation; they are never
/// patched in place.
#[derive(Debug, Clone)]
pub struct AreaResource {
    data: Vec<u8>,
    views: Views,
}

#[derive(Debug, Clone)]
struct Views {
    layout: AreaLayout,
    actors: Vec<Actor>,
    items: Vec<Item>,
    containers: Vec<Container>,
}

impl Views {
    fn decode(data: &[u8]) -> Result<Self> {
        let layout = AreaLayout::read(data)?;
        // Items before containers: container ranges index into the item array.
        let actors = decode_actors(data, &layout.actors)?;
        let items = decode_items(data, &layout.items)?;
        let containers = decode_containers(data, &layout.containers)?;
        Ok(Views {
            layout,
            actors,
            items,
            containers,
        })
    }
}

fn check_tag(found: &[u8], context: &'static str, expected: &'static str) -> Result<()> {
    let found = decode_fixed_string(found);
    if found != expected {
        return Err(SorterError::Format {
            context,
            expected,
            found,
        });
    }
    Ok(())
}

fn decode_actors(data: &[u8], array: &RecordArray) -> Result<Vec<Actor>> {
    array.check_bounds("actor", data.len())?;
    Ok((0..array.count)
        .map(|i| {
            let record = &data[array.record_range(i)];
            Actor {
                name: decode_fixed_string(&record[..ACTOR_NAME_LEN]),
            }
        })
        .collect())
}

fn decode_items(data: &[u8], array: &RecordArray) -> Result<Vec<Item>> {
    array.check_bounds("item", data.len())?;
    Ok((0..array.count)
        .map(|i| {
            let record = &data[array.record_range(i)];
            Item {
                resource_reference: decode_fixed_string(&record[..ITEM_REFERENCE_LEN]),
            }
        })
        .collect())
}

fn decode_containers(data: &[u8], array: &RecordArray) -> Result<Vec<Container>> {
    array.check_bounds("container", data.len())?;
    Ok((0..array.count)
        .map(|i| {
            let record = &data[array.record_range(i)];
            Container {
                name: decode_fixed_string(&record[..CONTAINER_NAME_LEN]),
                first_item_index: le_u32(record, CONTAINER_FIRST_ITEM),
                item_count: le_u32(record, CONTAINER_ITEM_COUNT),
            }
        })
        .collect())
}

impl AreaResource {
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        if data.len() < 8 {
            return Err(SorterError::Truncated {
                context: "area tag",
                expected: 8,
                got: data.len(),
            });
        }
        check_tag(&data[0..4], "area", AREA_TAG)?;
        check_tag(&data[4..8], "area version", AREA_VERSION)?;

        let views = Views::decode(&data)?;
        Ok(AreaResource { data, views })
    }

    /// Re-derives the layout and every record view from the current buffer.
    pub(crate) fn rebuild_views(&mut self) -> Result<()> {
        self.views = Views::decode(&self.data)?;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn layout(&self) -> &AreaLayout {
        &self.views.layout
    }

    pub fn actors(&self) -> &[Actor] {
        &self.views.actors
    }

    pub fn items(&self) -> &[Item] {
        &self.views.items
    }

    pub fn containers(&self) -> &[Container] {
        &self.views.containers
    }

    /// Slot range of container `index`, checked against the item array.
    pub fn container_slots(&self, index: usize) -> Result<Range<usize>> {
        let container = &self.views.containers[index];
        let span = container.item_span();
        if span.end > self.views.items.len() as u64 {
            return Err(SorterError::ItemRangeOutOfBounds {
                container: index,
                start: span.start,
                end: span.end,
                item_count: self.views.items.len(),
            });
        }
        Ok(span.start as usize..span.end as usize)
    }

    /// Items referenced by container `index`, in current slot order.
    pub fn container_items(&self, index: usize) -> Result<&[Item]> {
        let slots = self.container_slots(index)?;
        Ok(&self.views.items[slots])
    }
}
