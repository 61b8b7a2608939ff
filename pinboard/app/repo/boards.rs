use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::{Board, NewBoard, NewBoardPin, Pin};
use crate::schema::{board_pins, boards, pins, users};

/// Creates the board with its initial pins in one transaction.
pub fn create(
    conn: &mut SqliteConnection,
    user_id: i32,
    title: &str,
    pin_ids: &[i32],
) -> QueryResult<i32> {
    conn.transaction(|conn| {
        let id = diesel::insert_into(boards::table)
            .values(&NewBoard {
                user_id,
                title,
                created_at: Utc::now().naive_utc(),
            })
            .returning(boards::id)
            .get_result::<i32>(conn)?;
        for &pin_id in pin_ids {
            add_pin(conn, id, pin_id)?;
        }
        Ok(id)
    })
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Board>> {
    boards::table.find(id).first(conn).optional()
}

pub fn find_owned(
    conn: &mut SqliteConnection,
    id: i32,
    user_id: i32,
) -> QueryResult<Option<Board>> {
    boards::table
        .find(id)
        .filter(boards::user_id.eq(user_id))
        .first(conn)
        .optional()
}

pub fn owner_name(conn: &mut SqliteConnection, board: &Board) -> QueryResult<String> {
    users::table
        .find(board.user_id)
        .select(users::username)
        .first(conn)
}

/// Adding a pin that is already on the board changes nothing.
pub fn add_pin(conn: &mut SqliteConnection, board_id: i32, pin_id: i32) -> QueryResult<()> {
    diesel::insert_or_ignore_into(board_pins::table)
        .values(&NewBoardPin { board_id, pin_id })
        .execute(conn)?;
    Ok(())
}

pub fn remove_pin(conn: &mut SqliteConnection, board_id: i32, pin_id: i32) -> QueryResult<bool> {
    let removed = diesel::delete(
        board_pins::table
            .filter(board_pins::board_id.eq(board_id))
            .filter(board_pins::pin_id.eq(pin_id)),
    )
    .execute(conn)?;
    Ok(removed > 0)
}

pub fn delete(conn: &mut SqliteConnection, id: i32) -> QueryResult<bool> {
    Ok(diesel::delete(boards::table.find(id)).execute(conn)? > 0)
}

/// The board's pins in the order they were added.
pub fn pins(conn: &mut SqliteConnection, board_id: i32) -> QueryResult<Vec<Pin>> {
    board_pins::table
        .inner_join(pins::table)
        .filter(board_pins::board_id.eq(board_id))
        .order(board_pins::id.asc())
        .select(pins::all_columns)
        .load(conn)
}

pub fn pin_counts(conn: &mut SqliteConnection, board_ids: &[i32]) -> QueryResult<HashMap<i32, usize>> {
    let mut counts = HashMap::new();
    for board_id in board_pins::table
        .filter(board_pins::board_id.eq_any(board_ids))
        .select(board_pins::board_id)
        .load::<i32>(conn)?
    {
        *counts.entry(board_id).or_insert(0) += 1;
    }
    Ok(counts)
}

pub fn list_by_user(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<Vec<Board>> {
    boards::table
        .filter(boards::user_id.eq(user_id))
        .order((boards::created_at.desc(), boards::id.desc()))
        .load(conn)
}

/// Every board not owned by `user_id`, newest first.
pub fn list_excluding_user(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<Vec<Board>> {
    boards::table
        .filter(boards::user_id.ne(user_id))
        .order((boards::created_at.desc(), boards::id.desc()))
        .load(conn)
}

/// Boards of any owner whose title contains `term`, newest first.
/// Filtering happens in Rust, see [`icontains`](super::icontains).
pub fn search(conn: &mut SqliteConnection, term: &str) -> QueryResult<Vec<Board>> {
    let candidates = boards::table
        .order((boards::created_at.desc(), boards::id.desc()))
        .load::<Board>(conn)?;
    Ok(candidates
        .into_iter()
        .filter(|b| super::icontains(&b.title, term))
        .collect())
}

/// Owner usernames keyed by board owner id.
pub fn owner_names(
    conn: &mut SqliteConnection,
    boards: &[Board],
) -> QueryResult<HashMap<i32, String>> {
    let user_ids: Vec<i32> = boards.iter().map(|b| b.user_id).collect();
    Ok(users::table
        .filter(users::id.eq_any(&user_ids))
        .select((users::id, users::username))
        .load::<(i32, String)>(conn)?
        .into_iter()
        .collect())
}
