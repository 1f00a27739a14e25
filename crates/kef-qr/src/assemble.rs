use crate::bbqr::{decode_payload, Encoding, FileType, Part};
use crate::error::TransportError;

/// Collects the frames of one transfer as the camera surfaces them, in any
/// order, and decodes the payload once every index has been seen.
#[derive(Debug, Default)]
pub struct Assembler {
    shape: Option<(Encoding, FileType, u16)>,
    slots: Vec<Option<String>>,
    received: usize,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one scanned frame. The first frame pins the transfer shape;
    /// later frames must agree on encoding, file type, and total.
    pub fn insert(&mut self, part: &Part<'_>) -> Result<(), TransportError> {
        let shape = (part.encoding, part.file_type, part.total);
        match self.shape {
            None => {
                self.shape = Some(shape);
                self.slots = vec![None; part.total as usize];
            }
            Some(existing) if existing != shape => return Err(TransportError::Inconsistent),
            Some(_) => {}
        }
        let slot = &mut self.slots[part.index as usize];
        if slot.is_some() {
            return Err(TransportError::DuplicateIndex(part.index));
        }
        // The payload is ASCII text straight off the QR decoder.
        *slot = Some(String::from_utf8_lossy(part.payload).into_owned());
        self.received += 1;
        Ok(())
    }

    /// Parse and add one scanned string.
    pub fn insert_str(&mut self, frame: &str) -> Result<(), TransportError> {
        self.insert(&Part::parse(frame.as_bytes())?)
    }

    pub fn total(&self) -> Option<u16> {
        self.shape.map(|(_, _, total)| total)
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_complete(&self) -> bool {
        self.shape.is_some() && self.received == self.slots.len()
    }

    /// Indices still outstanding, for scanner progress UIs.
    pub fn missing(&self) -> Vec<u16> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(index, _)| index as u16)
            .collect()
    }

    pub fn file_type(&self) -> Option<FileType> {
        self.shape.map(|(_, file_type, _)| file_type)
    }

    /// Concatenate the payloads in index order and decode the result.
    pub fn assemble(&self) -> Result<Vec<u8>, TransportError> {
        let (encoding, _, _) = self.shape.ok_or(TransportError::Incomplete)?;
        if !self.is_complete() {
            return Err(TransportError::Incomplete);
        }
        let mut joined = String::new();
        for slot in &self.slots {
            joined.push_str(slot.as_deref().unwrap_or_default());
        }
        decode_payload(encoding, joined.as_bytes())
    }
}
