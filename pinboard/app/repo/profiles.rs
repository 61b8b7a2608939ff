use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::{NewProfile, Profile};
use crate::schema::profiles;

/// Creates the profile with `display_name`, or renames the existing one.
pub fn upsert_display_name(
    conn: &mut SqliteConnection,
    user_id: i32,
    display_name: &str,
) -> QueryResult<Profile> {
    diesel::insert_into(profiles::table)
        .values(&NewProfile {
            user_id,
            display_name,
            bio: "",
        })
        .on_conflict(profiles::user_id)
        .do_update()
        .set(profiles::display_name.eq(display_name))
        .execute(conn)?;
    get_or_create(conn, user_id)
}

pub fn get_or_create(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<Profile> {
    diesel::insert_or_ignore_into(profiles::table)
        .values(&NewProfile {
            user_id,
            display_name: "",
            bio: "",
        })
        .execute(conn)?;
    profiles::table
        .filter(profiles::user_id.eq(user_id))
        .first(conn)
}

/// Writes the profile fields, and the avatar when one is given, together.
/// Returns the avatar path that was replaced.
pub fn update(
    conn: &mut SqliteConnection,
    user_id: i32,
    display_name: &str,
    bio: &str,
    avatar: Option<&str>,
) -> QueryResult<Option<String>> {
    conn.transaction(|conn| {
        get_or_create(conn, user_id)?;
        diesel::update(profiles::table.filter(profiles::user_id.eq(user_id)))
            .set((
                profiles::display_name.eq(display_name),
                profiles::bio.eq(bio),
            ))
            .execute(conn)?;
        match avatar {
            Some(avatar) => set_avatar(conn, user_id, avatar),
            None => Ok(None),
        }
    })
}

/// Stores the new avatar path and returns the one it replaced.
pub fn set_avatar(
    conn: &mut SqliteConnection,
    user_id: i32,
    avatar: &str,
) -> QueryResult<Option<String>> {
    let previous = get_or_create(conn, user_id)?.avatar;
    diesel::update(profiles::table.filter(profiles::user_id.eq(user_id)))
        .set(profiles::avatar.eq(Some(avatar)))
        .execute(conn)?;
    Ok(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::fixtures;

    #[test]
    fn test_get_or_create_is_lazy_and_stable() {
        let mut conn = fixtures::conn();
        let anna = fixtures::user(&mut conn, "anna");
        let first = get_or_create(&mut conn, anna.id).unwrap();
        let second = get_or_create(&mut conn, anna.id).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.display_name, "");
        assert_eq!(first.avatar, None);
    }

    #[test]
    fn test_upsert_and_update() {
        let mut conn = fixtures::conn();
        let anna = fixtures::user(&mut conn, "anna");
        assert_eq!(
            upsert_display_name(&mut conn, anna.id, "Anna K").unwrap().display_name,
            "Anna K"
        );
        assert_eq!(
            upsert_display_name(&mut conn, anna.id, "Аня").unwrap().display_name,
            "Аня"
        );
        assert_eq!(update(&mut conn, anna.id, "", "likes cats", None).unwrap(), None);
        let profile = get_or_create(&mut conn, anna.id).unwrap();
        assert_eq!(profile.display_name, "");
        assert_eq!(profile.bio, "likes cats");
        assert_eq!(profile.avatar, None);

        assert_eq!(set_avatar(&mut conn, anna.id, "avatars/a.png").unwrap(), None);
        assert_eq!(
            set_avatar(&mut conn, anna.id, "avatars/b.png").unwrap().as_deref(),
            Some("avatars/a.png")
        );
        assert_eq!(
            update(&mut conn, anna.id, "Anna", "", Some("avatars/c.png"))
                .unwrap()
                .as_deref(),
            Some("avatars/b.png")
        );
        let profile = get_or_create(&mut conn, anna.id).unwrap();
        assert_eq!(profile.display_name, "Anna");
        assert_eq!(profile.avatar.as_deref(), Some("avatars/c.png"));
    }
}
