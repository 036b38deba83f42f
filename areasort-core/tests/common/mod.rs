//! Shared fixtures for the save-archive integration tests.

use areasort_core::area::{
    encode_fixed_string, ACTOR_NAME_LEN, ACTOR_STRIDE, CONTAINER_NAME_LEN, CONTAINER_STRIDE,
    ITEM_REFERENCE_LEN, ITEM_STRIDE,
};
use areasort_core::{ArchiveEntry, ArchiveWriter};

pub const ITEM_OFFSET: usize = 0x0200;

/// Builds an area with one actor per name, the given item references and
/// containers given as `(name, first_item_index, item_count)`.
pub fn area_bytes(actors: &[&str], items: &[&str], containers: &[(&str, u32, u32)]) -> Vec<u8> {
    let actor_offset = ITEM_OFFSET + items.len() * ITEM_STRIDE;
    let container_offset = actor_offset + actors.len() * ACTOR_STRIDE;

    let mut data = vec![0u8; ITEM_OFFSET];
    data[0..4].copy_from_slice(b"AREA");
    data[4..8].copy_from_slice(b"V1.0");
    // Unrelated header bytes that must survive untouched.
    data[0x10..0x20].copy_from_slice(b"header-filler-01");
    data[0x54..0x56].copy_from_slice(&(actor_offset as u16).to_le_bytes());
    data[0x58..0x5A].copy_from_slice(&(actors.len() as u16).to_le_bytes());
    data[0x70..0x72].copy_from_slice(&(container_offset as u16).to_le_bytes());
    data[0x74..0x76].copy_from_slice(&(containers.len() as u16).to_le_bytes());
    data[0x76..0x78].copy_from_slice(&(items.len() as u16).to_le_bytes());
    data[0x78..0x7C].copy_from_slice(&(ITEM_OFFSET as u32).to_le_bytes());

    for (slot, reference) in items.iter().enumerate() {
        let mut record = vec![0xF0 | slot as u8; ITEM_STRIDE];
        record[..ITEM_REFERENCE_LEN]
            .copy_from_slice(&encode_fixed_string(reference, ITEM_REFERENCE_LEN).unwrap());
        data.extend_from_slice(&record);
    }

    for name in actors {
        let mut record = vec![0x11u8; ACTOR_STRIDE];
        record[..ACTOR_NAME_LEN].copy_from_slice(&encode_fixed_string(name, ACTOR_NAME_LEN).unwrap());
        data.extend_from_slice(&record);
    }

    for (name, first, count) in containers {
        let mut record = vec![0x22u8; CONTAINER_STRIDE];
        record[..CONTAINER_NAME_LEN]
            .copy_from_slice(&encode_fixed_string(name, CONTAINER_NAME_LEN).unwrap());
        record[0x40..0x44].copy_from_slice(&first.to_le_bytes());
        record[0x44..0x48].copy_from_slice(&count.to_le_bytes());
        data.extend_from_slice(&record);
    }

    data
}

pub fn archive_bytes(entries: &[ArchiveEntry]) -> Vec<u8> {
    let mut writer = ArchiveWriter::new(Vec::new()).unwrap();
    for entry in entries {
        writer.write_entry(entry).unwrap();
    }
    writer.finish().unwrap()
}

/// Three-entry archive whose middle entry is the area `AR0602`.
pub fn sample_archive(area: &[u8]) -> (Vec<ArchiveEntry>, Vec<u8>) {
    let entries = vec![
        ArchiveEntry::new("WORLDMAP", b"world map state").unwrap(),
        ArchiveEntry::new("AR0602", area).unwrap(),
        ArchiveEntry::new("BALDUR.gam", &[7u8; 300]).unwrap(),
    ];
    let bytes = archive_bytes(&entries);
    (entries, bytes)
}

/// Encodes one entry by hand, with whatever lengths the caller claims.
pub fn raw_entry(name: &[u8], uncompressed: u32, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(name.len() as u32).to_le_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(&uncompressed.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}
