//! Integration tests for the room repository on top of the memory store.

use std::time::Duration;

use potsync_protocol::{ConnectionId, ErrorKind, Player, PlayerId, RoomId};
use potsync_room::{RoomConfig, RoomError, RoomRepository, ledger};
use potsync_store::{MemoryStore, Store};

fn config_with_ttl(ttl: Duration) -> RoomConfig {
    RoomConfig {
        room_ttl: ttl,
        ..RoomConfig::default()
    }
}

fn repo() -> RoomRepository<MemoryStore> {
    RoomRepository::new(MemoryStore::new(), &RoomConfig::default())
}

fn seat(id: &str) -> Player {
    Player {
        id: PlayerId::from(id),
        name: id.to_string(),
        chips: 1000,
        connection_id: ConnectionId::new(1),
    }
}

#[tokio::test]
async fn test_get_unknown_room_is_absent() {
    let repo = repo();
    assert!(repo.get(&RoomId::from("nope")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_persists_empty_room() {
    let repo = repo();
    let id = RoomId::from("r1");

    let created = repo.create(&id, 6).await.unwrap();
    let loaded = repo.get(&id).await.unwrap().expect("room stored");

    assert_eq!(created, loaded);
    assert_eq!(loaded.max_players, 6);
    assert_eq!(loaded.pot, 0);
    assert!(loaded.players.is_empty());
}

#[tokio::test]
async fn test_create_twice_is_already_exists() {
    let repo = repo();
    let id = RoomId::from("r1");
    repo.create(&id, 6).await.unwrap();

    let err = repo.create(&id, 6).await.unwrap_err();

    assert!(matches!(err, RoomError::AlreadyExists(_)));
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[tokio::test]
async fn test_fetch_or_new_does_not_persist() {
    let repo = repo();
    let id = RoomId::from("r1");

    let room = repo.fetch_or_new(&id, 4).await.unwrap();

    assert_eq!(room.id, id);
    assert!(repo.get(&id).await.unwrap().is_none());
    assert!(repo.store().is_empty().await);
}

#[tokio::test]
async fn test_fetch_or_new_returns_stored_room() {
    let repo = repo();
    let id = RoomId::from("r1");
    let mut room = repo.fetch_or_new(&id, 4).await.unwrap();
    ledger::upsert_player(&mut room, seat("p1")).unwrap();
    repo.put(&room).await.unwrap();

    let again = repo.fetch_or_new(&id, 4).await.unwrap();

    assert_eq!(again, room);
}

#[tokio::test]
async fn test_put_then_delete_makes_room_absent() {
    let repo = repo();
    let id = RoomId::from("r1");
    let mut room = repo.fetch_or_new(&id, 4).await.unwrap();
    ledger::upsert_player(&mut room, seat("p1")).unwrap();
    repo.put(&room).await.unwrap();

    assert!(repo.delete(&id).await.unwrap());
    assert!(repo.get(&id).await.unwrap().is_none());
    assert!(!repo.delete(&id).await.unwrap());
}

#[tokio::test]
async fn test_snapshot_stored_under_prefixed_key() {
    let repo = repo();
    let id = RoomId::from("table-7");
    repo.create(&id, 2).await.unwrap();

    assert_eq!(repo.key(&id), "room:table-7");
    let raw = repo.store().get("room:table-7").await.unwrap();
    assert!(raw.is_some());
}

#[tokio::test]
async fn test_corrupt_snapshot_reports_store_unavailable() {
    let repo = repo();
    repo.store()
        .set("room:bad", b"{ not a room".to_vec(), Duration::from_secs(60))
        .await
        .unwrap();

    let err = repo.get(&RoomId::from("bad")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
}

#[tokio::test(start_paused = true)]
async fn test_idle_room_expires_after_ttl() {
    let repo = RoomRepository::new(
        MemoryStore::new(),
        &config_with_ttl(Duration::from_secs(60)),
    );
    let id = RoomId::from("r1");
    repo.create(&id, 2).await.unwrap();

    tokio::time::advance(Duration::from_secs(61)).await;

    assert!(repo.get(&id).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_put_refreshes_ttl_for_active_room() {
    let repo = RoomRepository::new(
        MemoryStore::new(),
        &config_with_ttl(Duration::from_secs(60)),
    );
    let id = RoomId::from("r1");
    let room = repo.create(&id, 2).await.unwrap();

    tokio::time::advance(Duration::from_secs(45)).await;
    repo.put(&room).await.unwrap();
    tokio::time::advance(Duration::from_secs(45)).await;

    assert!(repo.get(&id).await.unwrap().is_some());
}
