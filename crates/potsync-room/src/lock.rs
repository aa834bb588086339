//! Per-room mutual exclusion.
//!
//! Every read-modify-write of a room snapshot runs while holding that
//! room's [`RoomGuard`]. Rooms never share a lock, so unrelated tables
//! proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use potsync_protocol::RoomId;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = HashMap<RoomId, Arc<Mutex<()>>>;

/// A table of async mutexes keyed by room ID.
///
/// Entries are created on first use and removed when the last holder
/// releases the lock with nobody else waiting, so the table only tracks
/// rooms with work in flight.
#[derive(Default)]
pub struct RoomLocks {
    table: Arc<StdMutex<LockTable>>,
}

impl RoomLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `room_id`.
    ///
    /// Waiters are served in FIFO order (Tokio's mutex is fair).
    pub async fn lock(&self, room_id: &RoomId) -> RoomGuard {
        let cell = {
            let mut table = lock_table(&self.table);
            Arc::clone(table.entry(room_id.clone()).or_default())
        };
        let guard = cell.lock_owned().await;
        RoomGuard {
            room_id: room_id.clone(),
            table: Arc::clone(&self.table),
            guard: Some(guard),
        }
    }

    /// Number of rooms with a lock held or awaited.
    pub fn len(&self) -> usize {
        lock_table(&self.table).len()
    }

    /// Returns `true` when no room lock is held or awaited.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one room, released on drop.
pub struct RoomGuard {
    room_id: RoomId,
    table: Arc<StdMutex<LockTable>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl RoomGuard {
    /// The room this guard protects.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let mut table = lock_table(&self.table);
        // One reference in the table, one in our guard: nobody is queued.
        if Arc::strong_count(OwnedMutexGuard::mutex(&guard)) == 2 {
            table.remove(&self.room_id);
        }
        drop(guard);
    }
}

fn lock_table(table: &StdMutex<LockTable>) -> MutexGuard<'_, LockTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_guard_release_removes_idle_entry() {
        let locks = RoomLocks::new();
        let room = RoomId::from("r1");

        let guard = locks.lock(&room).await;
        assert_eq!(guard.room_id(), &room);
        assert_eq!(locks.len(), 1);

        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_rooms_do_not_block_each_other() {
        let locks = RoomLocks::new();

        let _a = locks.lock(&RoomId::from("a")).await;
        let b = tokio::time::timeout(
            Duration::from_secs(1),
            locks.lock(&RoomId::from("b")),
        )
        .await;

        assert!(b.is_ok(), "room b must not wait on room a");
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_room_is_exclusive() {
        let locks = Arc::new(RoomLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock(&RoomId::from("hot")).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_kept_while_another_task_waits() {
        let locks = Arc::new(RoomLocks::new());
        let room = RoomId::from("r1");

        let first = locks.lock(&room).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let room = room.clone();
            tokio::spawn(async move {
                let _second = locks.lock(&room).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.len(), 1, "queued waiter still needs the entry");

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
