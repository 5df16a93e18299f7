//! Directory children and the resumable listing protocol.
//!
//! A listing walks five states: nothing emitted yet, the self entry, the
//! parent entry, the real children, and exhaustion. Positions 0 and 1 are
//! the two pseudo-entries; every listed child takes the next position.
//! Only file children are listed, under their rendered sentence.
//!
//! The index remembers where the last listing stopped as a
//! `(position, child index)` marker. Resuming from the marker's position
//! continues at that exact child. Any other position is located again by
//! counting listed children from the start, which is exact because children
//! are only ever appended.

use crate::{NodeHandle, Result};
use smallvec::SmallVec;

/// Resume position of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirCookie(pub u64);

impl DirCookie {
    pub const START: DirCookie = DirCookie(0);
    const FIRST_CHILD: u64 = 2;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirEntryKind {
    /// `.`
    SelfRef,
    /// `..`
    Parent,
    File,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// `.`, `..`, or the child's rendered sentence.
    pub name: Vec<u8>,
    pub handle: NodeHandle,
    pub kind: DirEntryKind,
    pub position: u64,
    /// Cookie resuming the listing right after this entry.
    pub next: DirCookie,
}

impl DirEntry {
    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadDirBatch {
    pub entries: SmallVec<[DirEntry; 16]>,
    /// `None` once the listing is exhausted.
    pub next: Option<DirCookie>,
}

/// What a listing needs to know about the nodes behind child handles.
pub(crate) trait ChildSource {
    /// Whether the child shows up in listings (an existing file).
    fn is_listed(&self, child: NodeHandle) -> bool;

    /// The child's display name.
    fn render(&self, child: NodeHandle) -> Result<Vec<u8>>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Child {
    pub(crate) name: String,
    pub(crate) handle: NodeHandle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Marker {
    position: u64,
    child: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EnumState {
    NotStarted,
    EmittingSelf,
    EmittingParent,
    Walking(Marker),
    Exhausted,
}

#[derive(Debug)]
pub(crate) struct DirectoryIndex {
    this: NodeHandle,
    parent: NodeHandle,
    children: Vec<Child>,
    marker: Option<Marker>,
}

impl DirectoryIndex {
    pub(crate) fn new(this: NodeHandle, parent: NodeHandle) -> Self {
        Self {
            this,
            parent,
            children: Vec::new(),
            marker: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn children(&self) -> &[Child] {
        &self.children
    }

    pub(crate) fn find(&self, name: &str) -> Option<NodeHandle> {
        self.children
            .iter()
            .find(|child| child.name == name)
            .map(|child| child.handle)
    }

    /// Append a child; insertion order is listing order.
    pub(crate) fn push(&mut self, name: String, handle: NodeHandle) {
        self.children.push(Child { name, handle });
    }

    /// List up to `max` entries starting at `cookie`.
    ///
    /// On a render error the marker is left on the failing child and the
    /// whole call fails; entries gathered before it are dropped.
    pub(crate) fn read_dir(
        &mut self,
        cookie: DirCookie,
        max: usize,
        source: &dyn ChildSource,
    ) -> Result<ReadDirBatch> {
        let mut entries = SmallVec::new();
        let mut state = self.resume(cookie.0, source);

        while entries.len() < max {
            state = match state {
                EnumState::NotStarted => {
                    entries.push(self.pseudo_entry(DirEntryKind::SelfRef, 0));
                    EnumState::EmittingSelf
                }
                EnumState::EmittingSelf => {
                    entries.push(self.pseudo_entry(DirEntryKind::Parent, 1));
                    EnumState::EmittingParent
                }
                EnumState::EmittingParent => EnumState::Walking(Marker {
                    position: DirCookie::FIRST_CHILD,
                    child: 0,
                }),
                EnumState::Walking(mut marker) => {
                    marker.child = self.skip_unlisted(marker.child, source);
                    let Some(child) = self.children.get(marker.child) else {
                        self.marker = Some(marker);
                        break;
                    };
                    let handle = child.handle;
                    let name = match source.render(handle) {
                        Ok(name) => name,
                        Err(err) => {
                            tracing::warn!(
                                dir = %self.this,
                                child = %handle,
                                position = marker.position,
                                error = %err,
                                "rendering listing entry failed"
                            );
                            self.marker = Some(marker);
                            return Err(err);
                        }
                    };
                    entries.push(DirEntry {
                        name,
                        handle,
                        kind: DirEntryKind::File,
                        position: marker.position,
                        next: DirCookie(marker.position + 1),
                    });
                    marker.position += 1;
                    marker.child += 1;
                    self.marker = Some(marker);
                    EnumState::Walking(marker)
                }
                EnumState::Exhausted => break,
            };
        }

        let next = match state {
            EnumState::NotStarted => Some(DirCookie(0)),
            EnumState::EmittingSelf => Some(DirCookie(1)),
            EnumState::EmittingParent => Some(DirCookie(DirCookie::FIRST_CHILD)),
            EnumState::Walking(marker) => {
                let child = self.skip_unlisted(marker.child, source);
                (child < self.children.len()).then_some(DirCookie(marker.position))
            }
            EnumState::Exhausted => None,
        };
        tracing::debug!(
            dir = %self.this,
            from = cookie.0,
            emitted = entries.len(),
            ?next,
            "read_dir"
        );
        Ok(ReadDirBatch { entries, next })
    }

    fn resume(&self, position: u64, source: &dyn ChildSource) -> EnumState {
        match position {
            0 => EnumState::NotStarted,
            1 => EnumState::EmittingSelf,
            DirCookie::FIRST_CHILD => EnumState::EmittingParent,
            _ => match self.marker {
                Some(marker) if marker.position == position => EnumState::Walking(marker),
                _ => self.locate(position, source),
            },
        }
    }

    /// Find the child listed at `position` by counting from the start.
    fn locate(&self, position: u64, source: &dyn ChildSource) -> EnumState {
        let mut remaining = position - DirCookie::FIRST_CHILD;
        let mut child = 0;
        loop {
            child = self.skip_unlisted(child, source);
            if child >= self.children.len() {
                return EnumState::Exhausted;
            }
            if remaining == 0 {
                return EnumState::Walking(Marker { position, child });
            }
            remaining -= 1;
            child += 1;
        }
    }

    fn skip_unlisted(&self, mut child: usize, source: &dyn ChildSource) -> usize {
        while let Some(entry) = self.children.get(child) {
            if source.is_listed(entry.handle) {
                break;
            }
            child += 1;
        }
        child
    }

    fn pseudo_entry(&self, kind: DirEntryKind, position: u64) -> DirEntry {
        let (name, handle) = match kind {
            DirEntryKind::SelfRef => (&b"."[..], self.this),
            _ => (&b".."[..], self.parent),
        };
        DirEntry {
            name: name.to_vec(),
            handle,
            kind,
            position,
            next: DirCookie(position + 1),
        }
    }
}
