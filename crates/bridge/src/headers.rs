//! Ordered, capacity-bounded ledger of captured response headers.
//!
//! Insertion order is the HTTP emission order. Replace matches by
//! case-insensitive name equality and overwrites in place, so a replaced
//! header keeps its original position. Capacity overflow is a reported
//! condition, never an unchecked write.

use crate::context;

pub(crate) struct HeaderLedger {
    entries: Vec<(String, String)>,
    capacity: usize,
}

impl HeaderLedger {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Add or replace a header. Empty names are rejected. With `replace`, a
    /// case-insensitive name match overwrites the existing value in place;
    /// otherwise the pair is appended when capacity remains. Returns false
    /// without mutation when the ledger is full or the name is empty.
    pub(crate) fn add(&mut self, name: &str, value: &str, replace: bool) -> bool {
        if name.is_empty() {
            return false;
        }
        if replace {
            for entry in self.entries.iter_mut() {
                if entry.0.eq_ignore_ascii_case(name) {
                    entry.1 = value.to_string();
                    return true;
                }
            }
        }
        if self.entries.len() >= self.capacity {
            return false;
        }
        self.entries.push((name.to_string(), value.to_string()));
        true
    }

    pub(crate) fn count(&self) -> i32 {
        self.entries.len() as i32
    }

    pub(crate) fn get(&self, index: i32) -> Option<(&str, &str)> {
        if index < 0 {
            return None;
        }
        self.entries
            .get(index as usize)
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Serialize the ledger into the finish-callback wire format: each header
    /// contributes its name and value as consecutive NUL-terminated byte
    /// strings, in insertion order.
    pub(crate) fn finish_blob(&self) -> Vec<u8> {
        let mut blob = Vec::new();
        for (name, value) in &self.entries {
            blob.extend_from_slice(name.as_bytes());
            blob.push(0);
            blob.extend_from_slice(value.as_bytes());
            blob.push(0);
        }
        blob
    }
}

/// Add a response header to the current context's ledger.
///
/// Returns false with no live context, an empty name, or a full ledger.
pub fn add_header(name: &str, value: &str, replace: bool) -> bool {
    context::with_mut(|ctx| ctx.headers.add(name, value, replace)).unwrap_or(false)
}

/// Number of headers in the current ledger; 0 with no live context.
pub fn header_count() -> i32 {
    context::with(|ctx| ctx.headers.count()).unwrap_or(0)
}

/// Bounds-checked header lookup by insertion index. Values are cloned out of
/// the ledger; the ledger keeps ownership.
pub fn get_header(index: i32) -> Option<(String, String)> {
    context::with(|ctx| {
        ctx.headers
            .get(index)
            .map(|(name, value)| (name.to_string(), value.to_string()))
    })
    .flatten()
}

/// Drop all headers from the current ledger. No-op with no live context.
pub fn clear_headers() {
    context::with_mut(|ctx| ctx.headers.clear());
}

/// All headers in insertion order, cloned; empty with no live context.
pub fn headers_snapshot() -> Vec<(String, String)> {
    context::with(|ctx| ctx.headers.entries().to_vec()).unwrap_or_default()
}

/// Current ledger serialized in the finish-callback wire format; empty with
/// no live context.
pub fn header_blob() -> Vec<u8> {
    context::with(|ctx| ctx.headers.finish_blob()).unwrap_or_default()
}
