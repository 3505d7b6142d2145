use crate::backend::Backend;
use crate::entry::{EntryId, Segment, SegmentLinks};

// An intrusive, doubly-linked recency list. The nodes are the backend's
// entries; this struct only owns the head, tail and length. An entry belongs
// to this list iff its links carry this list's segment tag.
#[derive(Debug)]
pub(crate) struct SegmentList {
  segment: Segment,
  // Head is the most-recently-used entry.
  head: Option<EntryId>,
  // Tail is the least-recently-used entry.
  tail: Option<EntryId>,
  len: usize,
}

#[inline]
fn links_mut<K, V>(backend: &mut dyn Backend<K, V>, id: EntryId) -> Option<&mut SegmentLinks> {
  backend.entry_mut(id).and_then(|entry| entry.links.as_mut())
}

impl SegmentList {
  pub(crate) fn new(segment: Segment) -> Self {
    Self {
      segment,
      head: None,
      tail: None,
      len: 0,
    }
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool {
    self.len == 0
  }

  #[inline]
  pub(crate) fn head(&self) -> Option<EntryId> {
    self.head
  }

  #[inline]
  pub(crate) fn tail(&self) -> Option<EntryId> {
    self.tail
  }

  pub(crate) fn contains<K, V>(&self, backend: &dyn Backend<K, V>, id: EntryId) -> bool {
    backend
      .entry(id)
      .and_then(|entry| entry.segment())
      .is_some_and(|segment| segment == self.segment)
  }

  /// Links a detached entry in as the new head.
  pub(crate) fn push_front<K, V>(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId) {
    let old_head = self.head;
    let Some(entry) = backend.entry_mut(id) else {
      return;
    };
    debug_assert!(entry.links.is_none(), "entry is already linked");
    entry.links = Some(SegmentLinks {
      next: old_head,
      ..SegmentLinks::detached(self.segment)
    });

    if let Some(old_head) = old_head {
      if let Some(links) = links_mut(backend, old_head) {
        links.prev = Some(id);
      }
    }

    self.head = Some(id);
    if self.tail.is_none() {
      self.tail = Some(id);
    }
    self.len += 1;
  }

  /// Unlinks `id` and resets its links. Returns false if the entry is not in
  /// this list.
  pub(crate) fn unlink<K, V>(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId) -> bool {
    let links = match backend.entry(id).and_then(|entry| entry.links) {
      Some(links) if links.segment == self.segment => links,
      _ => return false,
    };

    // Update the 'next' pointer of the previous node.
    match links.prev {
      Some(prev) => {
        if let Some(prev_links) = links_mut(backend, prev) {
          prev_links.next = links.next;
        }
      }
      // We are unlinking the head of the list.
      None => self.head = links.next,
    }

    // Update the 'prev' pointer of the next node.
    match links.next {
      Some(next) => {
        if let Some(next_links) = links_mut(backend, next) {
          next_links.prev = links.prev;
        }
      }
      // We are unlinking the tail of the list.
      None => self.tail = links.prev,
    }

    if let Some(entry) = backend.entry_mut(id) {
      entry.links = None;
    }
    self.len -= 1;
    true
  }

  pub(crate) fn move_to_front<K, V>(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId) {
    if self.head == Some(id) {
      return;
    }
    if self.unlink(backend, id) {
      self.push_front(backend, id);
    }
  }

  pub(crate) fn pop_back<K, V>(&mut self, backend: &mut dyn Backend<K, V>) -> Option<EntryId> {
    let tail = self.tail?;
    self.unlink(backend, tail);
    Some(tail)
  }

  /// Forgets every member in O(1). The members' links are left as they are;
  /// the caller is responsible for dropping the entries themselves.
  pub(crate) fn clear(&mut self) {
    self.head = None;
    self.tail = None;
    self.len = 0;
  }

  /// Member handles from head (most recent) to tail.
  pub(crate) fn ids<K, V>(&self, backend: &dyn Backend<K, V>) -> Vec<EntryId> {
    let mut ids = Vec::with_capacity(self.len);
    let mut current = self.head;
    while let Some(id) = current {
      ids.push(id);
      current = backend.entry(id).and_then(|entry| entry.links).and_then(|links| links.next);
    }
    ids
  }
}
