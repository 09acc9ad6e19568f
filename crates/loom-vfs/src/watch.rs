//! Change notification for compile sessions.
//!
//! Hosts push [`WatchEvent`]s and the compile session drains them between compilation rounds,
//! turning each [`FileChange`] into a refresh of the VFS, the path caches and the producers.

use std::io;

use crossbeam_channel as channel;

use crate::change::FileChange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changes { changes: Vec<FileChange> },
    /// Events were dropped; every cache is rebuilt from scratch.
    Rescan,
}

/// Source of pending [`WatchEvent`]s.
pub trait FileWatcher: Send {
    /// Drains every pending event without blocking.
    fn poll(&mut self) -> io::Result<Vec<WatchEvent>>;
}

/// Watcher fed explicitly through a [`ManualFileWatcherHandle`].
#[derive(Debug)]
pub struct ManualFileWatcher {
    tx: channel::Sender<WatchEvent>,
    rx: channel::Receiver<WatchEvent>,
}

#[derive(Debug, Clone)]
pub struct ManualFileWatcherHandle {
    tx: channel::Sender<WatchEvent>,
}

impl ManualFileWatcherHandle {
    pub fn push(&self, event: WatchEvent) -> io::Result<()> {
        self.tx
            .send(event)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "watcher dropped"))
    }

    pub fn push_changes(&self, changes: Vec<FileChange>) -> io::Result<()> {
        self.push(WatchEvent::Changes { changes })
    }
}

impl Default for ManualFileWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualFileWatcher {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    pub fn handle(&self) -> ManualFileWatcherHandle {
        ManualFileWatcherHandle {
            tx: self.tx.clone(),
        }
    }
}

impl FileWatcher for ManualFileWatcher {
    /// Changes queued before a rescan are dropped; the rescan covers them.
    fn poll(&mut self) -> io::Result<Vec<WatchEvent>> {
        let mut out = Vec::new();
        for event in self.rx.try_iter() {
            match event {
                WatchEvent::Rescan => {
                    out.clear();
                    out.push(WatchEvent::Rescan);
                }
                WatchEvent::Changes { changes } if changes.is_empty() => {}
                other => out.push(other),
            }
        }
        Ok(out)
    }
}
