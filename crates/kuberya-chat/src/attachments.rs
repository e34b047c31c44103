//! Attachment staging.
//!
//! Files picked or dropped by the user are held here until the next submit.
//! Their bytes live in a process-local [`BlobRegistry`] and are addressed by
//! an opaque [`BlobRef`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use kuberya_core::types::{Attachment, AttachmentKind, BlobRef};

/// A file handed over by the file picker or a drop target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFile {
    pub mime_type: String,
    pub display_name: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(
        mime_type: impl Into<String>,
        display_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            mime_type: mime_type.into(),
            display_name: display_name.into(),
            bytes,
        }
    }
}

// =============================================================================
// BlobRegistry
// =============================================================================

/// Process-local owner of attachment bytes.
///
/// Nothing is freed implicitly: a reference stays resolvable until
/// [`BlobRegistry::release`] is called or the process exits.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    blobs: Mutex<HashMap<BlobRef, Arc<[u8]>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` and return a fresh reference to them.
    pub fn register(&self, bytes: Vec<u8>) -> BlobRef {
        let blob_ref = BlobRef::new();
        self.lock().insert(blob_ref, Arc::from(bytes));
        blob_ref
    }

    /// Bytes behind `blob_ref`, if it has not been released.
    pub fn resolve(&self, blob_ref: &BlobRef) -> Option<Arc<[u8]>> {
        self.lock().get(blob_ref).cloned()
    }

    /// Invalidate `blob_ref`. Returns `false` if it was already released.
    pub fn release(&self, blob_ref: &BlobRef) -> bool {
        let released = self.lock().remove(blob_ref).is_some();
        if released {
            tracing::debug!(blob = %blob_ref, "Attachment blob released");
        }
        released
    }

    /// Number of references that are still resolvable.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<BlobRef, Arc<[u8]>>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// AttachmentStager
// =============================================================================

/// Attachments chosen but not yet sent.
#[derive(Debug)]
pub struct AttachmentStager {
    blobs: Arc<BlobRegistry>,
    pending: Vec<Attachment>,
}

impl AttachmentStager {
    pub fn new(blobs: Arc<BlobRegistry>) -> Self {
        Self {
            blobs,
            pending: Vec::new(),
        }
    }

    /// Classify and stage each file, preserving order. Returns how many were
    /// staged. There are no limits and no rejections.
    pub fn add(&mut self, files: Vec<RawFile>) -> usize {
        let count = files.len();
        for file in files {
            let kind = AttachmentKind::from_mime(&file.mime_type);
            let size_bytes = file.bytes.len();
            let location = self.blobs.register(file.bytes);
            self.pending.push(Attachment {
                kind,
                location,
                display_name: file.display_name,
                mime_type: file.mime_type,
                size_bytes,
            });
        }
        count
    }

    /// Unstage the attachment at `index`. Out of range is a no-op.
    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        if index < self.pending.len() {
            Some(self.pending.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Drain the staged attachments for a submit, leaving the stager empty.
    pub fn take(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[Attachment] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stager() -> AttachmentStager {
        AttachmentStager::new(Arc::new(BlobRegistry::new()))
    }

    fn png(name: &str) -> RawFile {
        RawFile::new("image/png", name, vec![0x89, b'P', b'N', b'G'])
    }

    fn pdf(name: &str) -> RawFile {
        RawFile::new("application/pdf", name, b"%PDF-1.7".to_vec())
    }

    #[test]
    fn test_add_empty_list_is_noop() {
        let mut s = stager();
        assert_eq!(s.add(vec![]), 0);
        assert!(s.is_empty());
    }

    #[test]
    fn test_add_classifies_and_preserves_order() {
        let mut s = stager();
        s.add(vec![png("photo.png"), pdf("notes.pdf")]);
        let kinds: Vec<AttachmentKind> = s.pending().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AttachmentKind::Image, AttachmentKind::File]);
        assert_eq!(s.pending()[0].display_name, "photo.png");
        assert_eq!(s.pending()[1].display_name, "notes.pdf");
        assert_eq!(s.pending()[1].size_bytes, 8);
    }

    #[test]
    fn test_duplicates_are_allowed() {
        let mut s = stager();
        s.add(vec![png("same.png"), png("same.png")]);
        assert_eq!(s.len(), 2);
        assert_ne!(s.pending()[0].location, s.pending()[1].location);
    }

    #[test]
    fn test_malformed_file_is_accepted_as_file() {
        let mut s = stager();
        s.add(vec![RawFile::new("", "", vec![])]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.pending()[0].kind, AttachmentKind::File);
    }

    #[test]
    fn test_remove_in_range() {
        let mut s = stager();
        s.add(vec![png("a.png"), pdf("b.pdf"), png("c.png")]);
        let removed = s.remove(1).unwrap();
        assert_eq!(removed.display_name, "b.pdf");
        let names: Vec<&str> = s.pending().iter().map(|a| a.display_name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "c.png"]);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut s = stager();
        s.add(vec![png("a.png")]);
        assert!(s.remove(1).is_none());
        assert!(s.remove(usize::MAX).is_none());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut s = stager();
        s.add(vec![png("a.png")]);
        s.clear();
        s.clear();
        assert!(s.is_empty());
    }

    #[test]
    fn test_take_drains() {
        let mut s = stager();
        s.add(vec![png("a.png"), pdf("b.pdf")]);
        let taken = s.take();
        assert_eq!(taken.len(), 2);
        assert!(s.is_empty());
    }

    #[test]
    fn test_blob_references_resolve_until_released() {
        let blobs = Arc::new(BlobRegistry::new());
        let mut s = AttachmentStager::new(Arc::clone(&blobs));
        s.add(vec![pdf("b.pdf")]);
        let location = s.pending()[0].location;

        assert_eq!(blobs.resolve(&location).as_deref(), Some(&b"%PDF-1.7"[..]));
        assert_eq!(blobs.live_count(), 1);

        // Sending or unstaging does not free the bytes.
        s.clear();
        assert!(blobs.resolve(&location).is_some());

        assert!(blobs.release(&location));
        assert!(blobs.resolve(&location).is_none());
        assert!(!blobs.release(&location));
        assert_eq!(blobs.live_count(), 0);
    }
}
