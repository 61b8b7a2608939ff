use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::{NewUser, User};
use crate::schema::users;

pub fn create(
    conn: &mut SqliteConnection,
    username: &str,
    email: &str,
    password_hash: &str,
    token: &str,
) -> QueryResult<User> {
    let id = diesel::insert_into(users::table)
        .values(&NewUser {
            username,
            email,
            password_hash,
            token,
            created_at: Utc::now().naive_utc(),
        })
        .returning(users::id)
        .get_result::<i32>(conn)?;
    users::table.find(id).first(conn)
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<User>> {
    users::table.find(id).first(conn).optional()
}

pub fn find_by_username(conn: &mut SqliteConnection, username: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(users::username.eq(username))
        .first(conn)
        .optional()
}

pub fn username_taken(conn: &mut SqliteConnection, username: &str) -> QueryResult<bool> {
    Ok(find_by_username(conn, username)?.is_some())
}

pub fn set_token(conn: &mut SqliteConnection, id: i32, token: &str) -> QueryResult<()> {
    diesel::update(users::table.find(id))
        .set(users::token.eq(token))
        .execute(conn)?;
    Ok(())
}

/// Users other than `exclude` whose username contains `term`, in id order.
/// Filtering happens in Rust, see [`icontains`](super::icontains).
pub fn search(conn: &mut SqliteConnection, term: &str, exclude: i32) -> QueryResult<Vec<User>> {
    let candidates = users::table
        .filter(users::id.ne(exclude))
        .order(users::id.asc())
        .load::<User>(conn)?;
    Ok(candidates
        .into_iter()
        .filter(|u| super::icontains(&u.username, term))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::fixtures;

    #[test]
    fn test_create_and_find() {
        let mut conn = fixtures::conn();
        let anna = create(&mut conn, "anna", "anna@example.com", "hash", "t1").unwrap();
        assert_eq!(find(&mut conn, anna.id).unwrap().unwrap().username, "anna");
        assert!(username_taken(&mut conn, "anna").unwrap());
        assert!(!username_taken(&mut conn, "Anna2").unwrap());
        let duplicate = create(&mut conn, "anna", "other@example.com", "hash", "t2").unwrap_err();
        assert!(crate::repo::is_unique_violation(&duplicate));

        set_token(&mut conn, anna.id, "t3").unwrap();
        assert_eq!(find(&mut conn, anna.id).unwrap().unwrap().token, "t3");
    }

    #[test]
    fn test_search_excludes_requester() {
        let mut conn = fixtures::conn();
        let cathy = fixtures::user(&mut conn, "Cathy");
        fixtures::user(&mut conn, "bobcat");
        fixtures::user(&mut conn, "dave");
        let names: Vec<String> = search(&mut conn, "CAT", cathy.id)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["bobcat"]);
    }
}
