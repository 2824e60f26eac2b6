//! Maildrop collaborator traits and the built-in in-memory store.
//!
//! The core never touches storage: it holds an `Arc<dyn Maildrop>`
//! bound at login and calls these operations. Message indices are
//! 1-based positions in the maildrop's current message sequence.
//! Delete marks hide a message from every read operation immediately;
//! they are undone by `rset` and made permanent by `remove_deleted`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::StoreError;

// ============================================================================
// Collaborator traits
// ============================================================================

/// A scan listing, as returned by LIST and UIDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// One line per live message.
    All(Vec<String>),
    /// The summary line for a single requested message.
    One(String),
    /// The requested message does not exist or is delete-marked.
    Missing,
}

/// One user's maildrop.
///
/// Implementations are shared behind an `Arc` and must be internally
/// synchronized; the session-registry exclusivity means at most one
/// session operates on a given user's maildrop at a time, but opens and
/// teardowns can race.
#[async_trait]
pub trait Maildrop: Send + Sync {
    /// Live message count and total live octets.
    async fn stat(&self) -> Result<(usize, usize), StoreError>;

    /// `index size` lines for every live message, or the single line
    /// for `index`.
    async fn list(&self, index: Option<usize>) -> Result<Listing, StoreError>;

    /// Same shape as [`list`](Maildrop::list) with a persistent unique
    /// id per message instead of its size.
    async fn uidl(&self, index: Option<usize>) -> Result<Listing, StoreError>;

    /// Full message payload, or `None` when no such live message.
    async fn retr(&self, index: usize) -> Result<Option<Vec<u8>>, StoreError>;

    /// Mark a message deleted. `false` when no such live message.
    async fn dele(&self, index: usize) -> Result<bool, StoreError>;

    /// Clear all delete marks.
    async fn rset(&self) -> Result<(), StoreError>;

    /// Permanently remove delete-marked messages. Runs during QUIT
    /// from the transaction stage, before the sign-off reply.
    async fn remove_deleted(&self) -> Result<(), StoreError>;
}

/// Opens maildrops for freshly authenticated users.
#[async_trait]
pub trait MaildropFactory: Send + Sync {
    /// Open the maildrop for `user`. `info` is the opaque identity
    /// payload from the credential verifier.
    async fn open(
        &self,
        user: &str,
        info: &serde_json::Value,
    ) -> Result<Arc<dyn Maildrop>, StoreError>;
}

// ============================================================================
// Built-in in-memory store
// ============================================================================

/// In-memory maildrop factory keeping one maildrop per user for the
/// lifetime of the process.
///
/// Every login of the same user gets the same maildrop, so purged
/// messages stay gone across reconnects. Delete marks are session
/// state: `open` clears any marks a torn-down session left behind.
#[derive(Debug, Default)]
pub struct MemoryStore {
    drops: DashMap<String, Arc<MemoryMaildrop>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append messages to a user's maildrop, creating it if needed.
    pub fn seed(&self, user: &str, messages: Vec<Vec<u8>>) {
        let drop = self.drop_for(user);
        let mut inner = drop.inner.lock();
        for body in messages {
            inner.push(body);
        }
    }

    /// Seed a user's maildrop from a directory, one message per file,
    /// in file-name order. Returns the number of messages loaded.
    pub fn seed_from_dir(&self, user: &str, dir: &Path) -> std::io::Result<usize> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut messages = Vec::with_capacity(paths.len());
        for path in &paths {
            messages.push(std::fs::read(path)?);
        }
        let count = messages.len();
        self.seed(user, messages);
        Ok(count)
    }

    fn drop_for(&self, user: &str) -> Arc<MemoryMaildrop> {
        self.drops
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(MemoryMaildrop::default()))
            .clone()
    }
}

#[async_trait]
impl MaildropFactory for MemoryStore {
    async fn open(
        &self,
        user: &str,
        _info: &serde_json::Value,
    ) -> Result<Arc<dyn Maildrop>, StoreError> {
        let drop = self.drop_for(user);
        // Marks left by an abandoned session do not carry into the next.
        drop.inner.lock().clear_marks();
        Ok(drop)
    }
}

/// One user's in-memory maildrop.
#[derive(Debug, Default)]
pub struct MemoryMaildrop {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    messages: Vec<StoredMessage>,
    next_uid: u64,
}

#[derive(Debug)]
struct StoredMessage {
    uid: String,
    body: Vec<u8>,
    deleted: bool,
}

impl Inner {
    fn push(&mut self, body: Vec<u8>) {
        self.next_uid += 1;
        self.messages.push(StoredMessage {
            uid: format!("msg-{}", self.next_uid),
            body,
            deleted: false,
        });
    }

    fn clear_marks(&mut self) {
        for message in &mut self.messages {
            message.deleted = false;
        }
    }

    /// The message at 1-based `index`, if live.
    fn live(&self, index: usize) -> Option<&StoredMessage> {
        index
            .checked_sub(1)
            .and_then(|i| self.messages.get(i))
            .filter(|message| !message.deleted)
    }

    fn scan<F>(&self, index: Option<usize>, line: F) -> Listing
    where
        F: Fn(usize, &StoredMessage) -> String,
    {
        match index {
            Some(index) => match self.live(index) {
                Some(message) => Listing::One(line(index, message)),
                None => Listing::Missing,
            },
            None => Listing::All(
                self.messages
                    .iter()
                    .enumerate()
                    .filter(|(_, message)| !message.deleted)
                    .map(|(i, message)| line(i + 1, message))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl Maildrop for MemoryMaildrop {
    async fn stat(&self) -> Result<(usize, usize), StoreError> {
        let inner = self.inner.lock();
        let live = inner.messages.iter().filter(|message| !message.deleted);
        let (count, octets) = live.fold((0, 0), |(count, octets), message| {
            (count + 1, octets + message.body.len())
        });
        Ok((count, octets))
    }

    async fn list(&self, index: Option<usize>) -> Result<Listing, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.scan(index, |i, message| format!("{i} {}", message.body.len())))
    }

    async fn uidl(&self, index: Option<usize>) -> Result<Listing, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.scan(index, |i, message| format!("{i} {}", message.uid)))
    }

    async fn retr(&self, index: usize) -> Result<Option<Vec<u8>>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.live(index).map(|message| message.body.clone()))
    }

    async fn dele(&self, index: usize) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let Some(i) = index.checked_sub(1) else {
            return Ok(false);
        };
        match inner.messages.get_mut(i) {
            Some(message) if !message.deleted => {
                message.deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn rset(&self) -> Result<(), StoreError> {
        self.inner.lock().clear_marks();
        Ok(())
    }

    async fn remove_deleted(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.messages.retain(|message| !message.deleted);
        Ok(())
    }
}
