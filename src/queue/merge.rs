//! Consumer-side accumulation of batch and stream results

use crate::extractor::{ExtractionTier, Identifier, SongRecord};
use crate::queue::events::StreamEvent;
use std::collections::HashMap;

/// Identifier-keyed record store where the last real write wins
#[derive(Debug, Clone, Default)]
pub struct MergedResults {
    records: HashMap<Identifier, SongRecord>,
}

impl MergedResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. A fallback record only fills an empty slot; any
    /// other record replaces what is there. Returns whether it was stored.
    pub fn apply(&mut self, record: SongRecord) -> bool {
        let is_fallback = record.tier == ExtractionTier::Fallback;
        match self.records.get(&record.id) {
            Some(_) if is_fallback => false,
            _ => {
                self.records.insert(record.id.clone(), record);
                true
            }
        }
    }

    pub fn apply_batch(&mut self, batch: HashMap<Identifier, SongRecord>) {
        for record in batch.into_values() {
            self.apply(record);
        }
    }

    /// Apply a stream event; terminal events carry no record
    pub fn apply_event(&mut self, event: &StreamEvent) -> bool {
        match event {
            StreamEvent::Song { record, .. } => self.apply(record.clone()),
            _ => false,
        }
    }

    pub fn get(&self, id: &Identifier) -> Option<&SongRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_map(self) -> HashMap<Identifier, SongRecord> {
        self.records
    }
}
