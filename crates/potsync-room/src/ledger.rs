//! Ledger rules: the only code that changes a room's membership, chip
//! balances, or pot.
//!
//! Everything here is synchronous and works on an in-memory [`Room`].
//! Callers load the snapshot, apply one of these functions, and persist
//! the result while holding the room's lock. On error the room is left
//! untouched.

use potsync_protocol::{Player, PlayerId, Room};

use crate::RoomError;

/// Outcome of [`upsert_player`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new seat was appended.
    Joined,
    /// An existing member was replaced in place.
    Rejoined,
}

/// Adds `player` to the room, or replaces the member with the same ID.
///
/// A rejoin overwrites name, chips, and connection (last write wins) and
/// keeps the member's position. Capacity only limits new members.
pub fn upsert_player(
    room: &mut Room,
    player: Player,
) -> Result<Upsert, RoomError> {
    if let Some(existing) = room.player_mut(&player.id) {
        *existing = player;
        return Ok(Upsert::Rejoined);
    }
    if room.is_full() {
        return Err(RoomError::RoomFull(room.id.clone()));
    }
    room.players.push(player);
    Ok(Upsert::Joined)
}

/// Removes the member with `player_id`, returning it.
pub fn remove_player(room: &mut Room, player_id: &PlayerId) -> Option<Player> {
    let index = room.players.iter().position(|p| &p.id == player_id)?;
    Some(room.players.remove(index))
}

/// Moves `amount` chips from the player into the pot. Returns the new pot.
///
/// Checks, in order: membership, `amount > 0`, `amount <= chips`.
pub fn deposit(
    room: &mut Room,
    player_id: &PlayerId,
    amount: i64,
) -> Result<u64, RoomError> {
    let player = room
        .players
        .iter_mut()
        .find(|p| &p.id == player_id)
        .ok_or_else(|| {
            RoomError::PlayerNotFound(player_id.clone(), room.id.clone())
        })?;

    let amount = u64::try_from(amount)
        .ok()
        .filter(|a| *a > 0)
        .ok_or(RoomError::InvalidAmount(amount))?;

    if amount > player.chips {
        return Err(RoomError::InsufficientFunds {
            requested: amount,
            available: player.chips,
        });
    }
    let pot = room
        .pot
        .checked_add(amount)
        .ok_or_else(|| RoomError::ChipOverflow(room.id.clone()))?;

    player.chips -= amount;
    room.pot = pot;
    Ok(pot)
}

/// Moves the whole pot to the player. Returns the amount taken.
pub fn take_pot(room: &mut Room, player_id: &PlayerId) -> Result<u64, RoomError> {
    let player = room
        .players
        .iter_mut()
        .find(|p| &p.id == player_id)
        .ok_or_else(|| {
            RoomError::PlayerNotFound(player_id.clone(), room.id.clone())
        })?;

    if room.pot == 0 {
        return Err(RoomError::EmptyPot(room.id.clone()));
    }
    player.chips = player
        .chips
        .checked_add(room.pot)
        .ok_or_else(|| RoomError::ChipOverflow(room.id.clone()))?;

    Ok(std::mem::take(&mut room.pot))
}

#[cfg(test)]
mod tests {
    use potsync_protocol::{ConnectionId, RoomId};

    use super::*;

    fn pid(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    fn seat(id: &str, chips: u64) -> Player {
        Player {
            id: pid(id),
            name: format!("{id}-name"),
            chips,
            connection_id: ConnectionId::new(1),
        }
    }

    fn room_with(players: &[(&str, u64)], max_players: usize) -> Room {
        let mut room = Room::new(RoomId::from("r1"), max_players);
        for (id, chips) in players {
            upsert_player(&mut room, seat(id, *chips)).unwrap();
        }
        room
    }

    // =====================================================================
    // upsert_player / remove_player
    // =====================================================================

    #[test]
    fn test_upsert_appends_in_join_order() {
        let room = room_with(&[("a", 1), ("b", 2), ("c", 3)], 10);
        let ids: Vec<&str> = room.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_upsert_existing_id_replaces_in_place() {
        let mut room = room_with(&[("a", 100), ("b", 200)], 10);
        let mut again = seat("a", 1000);
        again.name = "renamed".into();
        again.connection_id = ConnectionId::new(9);

        let outcome = upsert_player(&mut room, again).unwrap();

        assert_eq!(outcome, Upsert::Rejoined);
        assert_eq!(room.players.len(), 2);
        assert_eq!(room.players[0].name, "renamed");
        assert_eq!(room.players[0].chips, 1000);
        assert_eq!(room.players[0].connection_id, ConnectionId::new(9));
    }

    #[test]
    fn test_upsert_full_room_rejects_newcomer() {
        let mut room = room_with(&[("a", 1), ("b", 1)], 2);

        let result = upsert_player(&mut room, seat("c", 1));

        assert!(matches!(result, Err(RoomError::RoomFull(_))));
        assert_eq!(room.players.len(), 2);
    }

    #[test]
    fn test_upsert_full_room_allows_rejoin() {
        let mut room = room_with(&[("a", 1), ("b", 1)], 2);

        let outcome = upsert_player(&mut room, seat("b", 50)).unwrap();

        assert_eq!(outcome, Upsert::Rejoined);
        assert_eq!(room.player(&pid("b")).unwrap().chips, 50);
    }

    #[test]
    fn test_remove_player_returns_removed_member() {
        let mut room = room_with(&[("a", 1), ("b", 2)], 10);

        let removed = remove_player(&mut room, &pid("a")).unwrap();

        assert_eq!(removed.id, pid("a"));
        assert_eq!(room.players.len(), 1);
        assert!(remove_player(&mut room, &pid("a")).is_none());
    }

    // =====================================================================
    // deposit
    // =====================================================================

    #[test]
    fn test_deposit_moves_chips_into_pot() {
        let mut room = room_with(&[("p1", 1000)], 10);

        let pot = deposit(&mut room, &pid("p1"), 200).unwrap();

        assert_eq!(pot, 200);
        assert_eq!(room.player(&pid("p1")).unwrap().chips, 800);
        assert_eq!(room.total_chips(), 1000);
    }

    #[test]
    fn test_deposit_entire_balance_is_allowed() {
        let mut room = room_with(&[("p1", 50)], 10);

        deposit(&mut room, &pid("p1"), 50).unwrap();

        assert_eq!(room.player(&pid("p1")).unwrap().chips, 0);
        assert_eq!(room.pot, 50);
    }

    #[test]
    fn test_deposit_more_than_balance_is_insufficient_funds() {
        let mut room = room_with(&[("p1", 1000)], 10);
        let before = room.clone();

        let result = deposit(&mut room, &pid("p1"), 5000);

        assert!(matches!(
            result,
            Err(RoomError::InsufficientFunds {
                requested: 5000,
                available: 1000
            })
        ));
        assert_eq!(room, before);
    }

    #[test]
    fn test_deposit_zero_or_negative_is_invalid_amount() {
        let mut room = room_with(&[("p1", 1000)], 10);

        assert!(matches!(
            deposit(&mut room, &pid("p1"), 0),
            Err(RoomError::InvalidAmount(0))
        ));
        assert!(matches!(
            deposit(&mut room, &pid("p1"), -10),
            Err(RoomError::InvalidAmount(-10))
        ));
        assert_eq!(room.pot, 0);
    }

    #[test]
    fn test_deposit_unknown_player_is_player_not_found() {
        let mut room = room_with(&[("p1", 1000)], 10);

        let result = deposit(&mut room, &pid("ghost"), 10);

        assert!(matches!(result, Err(RoomError::PlayerNotFound(p, _)) if p == pid("ghost")));
    }

    // =====================================================================
    // take_pot
    // =====================================================================

    #[test]
    fn test_take_pot_moves_whole_pot_to_player() {
        let mut room = room_with(&[("p1", 1000), ("p2", 1000)], 10);
        deposit(&mut room, &pid("p1"), 200).unwrap();

        let won = take_pot(&mut room, &pid("p2")).unwrap();

        assert_eq!(won, 200);
        assert_eq!(room.pot, 0);
        assert_eq!(room.player(&pid("p2")).unwrap().chips, 1200);
        assert_eq!(room.total_chips(), 2000);
    }

    #[test]
    fn test_take_pot_empty_is_empty_pot() {
        let mut room = room_with(&[("p1", 1000)], 10);
        let before = room.clone();

        let result = take_pot(&mut room, &pid("p1"));

        assert!(matches!(result, Err(RoomError::EmptyPot(_))));
        assert_eq!(room, before);
    }

    #[test]
    fn test_take_pot_unknown_player_checked_before_empty_pot() {
        let mut room = room_with(&[("p1", 1000)], 10);

        let result = take_pot(&mut room, &pid("ghost"));

        assert!(matches!(result, Err(RoomError::PlayerNotFound(..))));
    }

    #[test]
    fn test_take_pot_overflow_leaves_room_unchanged() {
        let mut room = room_with(&[("rich", u64::MAX), ("p2", 10)], 10);
        deposit(&mut room, &pid("p2"), 10).unwrap();
        let before = room.clone();

        let result = take_pot(&mut room, &pid("rich"));

        assert!(matches!(result, Err(RoomError::ChipOverflow(_))));
        assert_eq!(room, before);
    }
}
