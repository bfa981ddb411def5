// pixconvert/src/session.rs
use crate::core::{Batch, Configuration, RawFile, Result};
use crate::processors::{BatchConverter, CancelToken};
use std::sync::Arc;

pub const DEFAULT_MAX_FILES: usize = 20;

/// Files queued by the user plus the most recent batch.
///
/// The session owns its files; removing a file or clearing the session drops
/// the buffers along with any results that referenced them.
#[derive(Debug)]
pub struct Session {
    files: Vec<RawFile>,
    max_files: usize,
    next_id: u64,
    last_batch: Option<Batch>,
}

impl Session {
    pub fn new(max_files: usize) -> Self {
        Self {
            files: Vec::new(),
            max_files,
            next_id: 1,
            last_batch: None,
        }
    }

    /// Queues a file and returns its id, or `None` when the session is full.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        media_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Option<String> {
        if self.is_full() {
            log::warn!("Session is full ({} files), ignoring upload", self.max_files);
            return None;
        }

        let id = format!("file-{}", self.next_id);
        self.next_id += 1;
        self.files.push(RawFile::new(id.clone(), name, media_type, data));
        Some(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<RawFile> {
        let index = self.files.iter().position(|f| f.id == id)?;
        Some(self.files.remove(index))
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.last_batch = None;
    }

    pub fn clear_results(&mut self) {
        self.last_batch = None;
    }

    pub fn files(&self) -> &[RawFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.files.len() >= self.max_files
    }

    pub fn remaining_capacity(&self) -> usize {
        self.max_files.saturating_sub(self.files.len())
    }

    /// Converts every queued file, replacing any previous batch.
    pub fn convert(&mut self, engine: &BatchConverter, config: &Configuration) -> Result<&Batch> {
        self.convert_cancellable(engine, config, &CancelToken::new())
    }

    pub fn convert_cancellable(
        &mut self,
        engine: &BatchConverter,
        config: &Configuration,
        cancel: &CancelToken,
    ) -> Result<&Batch> {
        self.last_batch = None;
        let batch = engine.convert_all_cancellable(&self.files, config, cancel)?;
        Ok(self.last_batch.insert(batch))
    }

    pub fn last_batch(&self) -> Option<&Batch> {
        self.last_batch.as_ref()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_file_cap() {
        let mut session = Session::new(2);
        assert!(session.add("a.jpg", "image/jpeg", vec![1u8]).is_some());
        assert!(session.add("b.jpg", "image/jpeg", vec![2u8]).is_some());
        assert!(session.add("c.jpg", "image/jpeg", vec![3u8]).is_none());
        assert_eq!(session.len(), 2);
        assert_eq!(session.remaining_capacity(), 0);
    }

    #[test]
    fn ids_are_unique_and_removable() {
        let mut session = Session::default();
        let a = session.add("a.jpg", "image/jpeg", vec![1u8]).unwrap();
        let b = session.add("a.jpg", "image/jpeg", vec![1u8]).unwrap();
        assert_ne!(a, b);

        let removed = session.remove(&a).unwrap();
        assert_eq!(removed.id, a);
        assert!(session.remove(&a).is_none());
        assert_eq!(session.files()[0].id, b);
    }

    #[test]
    fn clear_drops_files_and_results() {
        let engine = BatchConverter::new(Default::default()).unwrap();
        let mut session = Session::default();
        session.add("bad.jpg", "image/jpeg", vec![0u8, 1, 2]);
        let batch = session.convert(&engine, &Configuration::default()).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(session.last_batch().is_some());

        session.clear();
        assert!(session.is_empty());
        assert!(session.last_batch().is_none());
    }

    #[test]
    fn clear_results_keeps_queued_files() {
        let engine = BatchConverter::new(Default::default()).unwrap();
        let mut session = Session::new(3);
        session.add("bad.png", "image/png", vec![9u8; 4]);
        session.convert(&engine, &Configuration::default()).unwrap();
        assert_eq!(session.last_batch().map(Batch::len), Some(1));

        session.clear_results();
        assert!(session.last_batch().is_none());
        assert_eq!(session.len(), 1);
        assert_eq!(session.remaining_capacity(), 2);
    }
}
