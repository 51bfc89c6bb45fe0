//! Opaque typed handles and the tables that back them

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;

/// Marker for what a handle refers to.
pub trait HandleKind {
    const NAME: &'static str;
}

/// Handle kinds
pub mod kind {
    use super::HandleKind;

    macro_rules! handle_kinds {
        ($($name:ident => $label:literal),* $(,)?) => {
            $(
                #[derive(Debug)]
                pub enum $name {}

                impl HandleKind for $name {
                    const NAME: &'static str = $label;
                }
            )*
        };
    }

    handle_kinds! {
        Document => "document",
        Page => "page",
        Outline => "outline",
        Links => "links",
        Pixmap => "pixmap",
        TextPage => "stext page",
        Stream => "stream",
    }
}

/// Opaque reference to a library object. Raw value `0` is the null handle.
pub struct Handle<K> {
    raw: u64,
    _kind: PhantomData<fn() -> K>,
}

pub type DocumentHandle = Handle<kind::Document>;
pub type PageHandle = Handle<kind::Page>;
pub type OutlineHandle = Handle<kind::Outline>;
pub type LinksHandle = Handle<kind::Links>;
pub type PixmapHandle = Handle<kind::Pixmap>;
pub type TextPageHandle = Handle<kind::TextPage>;
pub type StreamHandle = Handle<kind::Stream>;

impl<K> Handle<K> {
    pub const NULL: Self = Self::from_raw(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    pub const fn raw(self) -> u64 {
        self.raw
    }

    pub const fn is_null(self) -> bool {
        self.raw == 0
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K> Default for Handle<K> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", K::NAME, self.raw)
    }
}

/// Live objects of one kind, keyed by handle. Handles are never reused.
pub(crate) struct HandleTable<K, V> {
    next: u64,
    entries: HashMap<u64, Rc<V>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind, V> HandleTable<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            next: 1,
            entries: HashMap::new(),
            _kind: PhantomData,
        }
    }

    pub(crate) fn insert(&mut self, value: V) -> Handle<K> {
        let raw = self.next;
        self.next += 1;
        self.entries.insert(raw, Rc::new(value));
        tracing::trace!(kind = K::NAME, handle = raw, "handle issued");
        Handle::from_raw(raw)
    }

    pub(crate) fn get(&self, handle: Handle<K>) -> Result<Rc<V>> {
        self.entries
            .get(&handle.raw)
            .cloned()
            .ok_or(Error::InvalidHandle {
                kind: K::NAME,
                handle: handle.raw,
            })
    }

    pub(crate) fn remove(&mut self, handle: Handle<K>) -> Option<Rc<V>> {
        let removed = self.entries.remove(&handle.raw);
        if removed.is_some() {
            tracing::trace!(kind = K::NAME, handle = handle.raw, "handle released");
        }
        removed
    }

    /// Release every entry for which `keep` returns false.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&V) -> bool) {
        self.entries.retain(|_, v| keep(v));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
