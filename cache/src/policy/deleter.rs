use crate::entry::EntryId;
use crate::listener::EvictionReason;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// A removal a policy has asked the cache to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteRequest {
  pub id: EntryId,
  pub reason: EvictionReason,
}

/// The only channel through which a policy may remove an entry.
///
/// Requests are queued and drained by the cache right after the policy
/// hook that produced them returns. The cache then removes the entry from
/// the backend and runs `on_delete` on every policy, the requester included.
#[derive(Clone, Default)]
pub struct Deleter {
  queue: Arc<Mutex<VecDeque<DeleteRequest>>>,
}

impl Deleter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queues `id` for removal.
  pub fn delete(&self, id: EntryId, reason: EvictionReason) {
    self.queue.lock().push_back(DeleteRequest { id, reason });
  }

  /// Takes the oldest pending request.
  pub fn take(&self) -> Option<DeleteRequest> {
    self.queue.lock().pop_front()
  }

  /// Takes every pending request, oldest first.
  pub fn drain(&self) -> Vec<DeleteRequest> {
    self.queue.lock().drain(..).collect()
  }

  pub fn pending(&self) -> usize {
    self.queue.lock().len()
  }

  pub(crate) fn discard(&self) {
    self.queue.lock().clear();
  }
}

impl fmt::Debug for Deleter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Deleter")
      .field("pending", &self.pending())
      .finish()
  }
}
