//! Builds synthetic area buffers for unit tests.

use crate::area::{
    encode_fixed_string, ACTOR_NAME_LEN, ACTOR_STRIDE, CONTAINER_NAME_LEN, CONTAINER_STRIDE,
    ITEM_REFERENCE_LEN, ITEM_STRIDE,
};

const HEADER_LEN: usize = 0x0100;
pub(crate) const TRAILER: &[u8] = b"TRAILING-REGION";

#[derive(Default)]
pub(crate) struct AreaFixture {
    actors: Vec<String>,
    items: Vec<String>,
    containers: Vec<(String, u32, u32)>,
}

impl AreaFixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn actor(mut self, name: &str) -> Self {
        self.actors.push(name.to_string());
        self
    }

    pub(crate) fn items(mut self, refs: &[&str]) -> Self {
        self.items.extend(refs.iter().map(|r| r.to_string()));
        self
    }

    pub(crate) fn container(mut self, name: &str, first: u32, count: u32) -> Self {
        self.containers.push((name.to_string(), first, count));
        self
    }

    /// Offset of the item array in the built buffer.
    pub(crate) fn item_offset(&self) -> usize {
        HEADER_LEN + self.actors.len() * ACTOR_STRIDE
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let actor_offset = HEADER_LEN;
        let item_offset = self.item_offset();
        let container_offset = item_offset + self.items.len() * ITEM_STRIDE;

        let mut data = vec![0u8; HEADER_LEN];
        data[0..4].copy_from_slice(b"AREA");
        data[4..8].copy_from_slice(b"V1.0");
        data[0x54..0x56].copy_from_slice(&(actor_offset as u16).to_le_bytes());
        data[0x58..0x5A].copy_from_slice(&(self.actors.len() as u16).to_le_bytes());
        data[0x70..0x72].copy_from_slice(&(container_offset as u16).to_le_bytes());
        data[0x74..0x76].copy_from_slice(&(self.containers.len() as u16).to_le_bytes());
        data[0x76..0x78].copy_from_slice(&(self.items.len() as u16).to_le_bytes());
        data[0x78..0x7C].copy_from_slice(&(item_offset as u32).to_le_bytes());

        for name in &self.actors {
            let mut record = vec![0xA5u8; ACTOR_STRIDE];
            record[..ACTOR_NAME_LEN]
                .copy_from_slice(&encode_fixed_string(name, ACTOR_NAME_LEN).unwrap());
            data.extend_from_slice(&record);
        }

        // The tail of each item record carries its original slot so tests can
        // tell whole-record moves from reference-only moves.
        for (slot, reference) in self.items.iter().enumerate() {
            let mut record = vec![slot as u8; ITEM_STRIDE];
            record[..ITEM_REFERENCE_LEN]
                .copy_from_slice(&encode_fixed_string(reference, ITEM_REFERENCE_LEN).unwrap());
            data.extend_from_slice(&record);
        }

        for (name, first, count) in &self.containers {
            let mut record = vec![0x5Au8; CONTAINER_STRIDE];
            record[..CONTAINER_NAME_LEN]
                .copy_from_slice(&encode_fixed_string(name, CONTAINER_NAME_LEN).unwrap());
            record[0x40..0x44].copy_from_slice(&first.to_le_bytes());
            record[0x44..0x48].copy_from_slice(&count.to_le_bytes());
            data.extend_from_slice(&record);
        }

        data.extend_from_slice(TRAILER);
        data
    }
}
