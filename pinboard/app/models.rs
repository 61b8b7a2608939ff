use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub token: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub token: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: i32,
    pub user_id: i32,
    pub display_name: String,
    pub bio: String,
    pub avatar: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile<'a> {
    pub user_id: i32,
    pub display_name: &'a str,
    pub bio: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = pins)]
pub struct Pin {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = pins)]
pub struct NewPin<'a> {
    pub user_id: i32,
    pub title: &'a str,
    pub description: &'a str,
    pub image: Option<&'a str>,
    pub video: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

/// Full replacement of a pin's editable columns.
#[derive(AsChangeset)]
#[diesel(table_name = pins, treat_none_as_null = true)]
pub struct PinChanges<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub image: Option<&'a str>,
    pub video: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = pin_tags)]
pub struct PinTag {
    pub id: i32,
    pub pin_id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Insertable)]
#[diesel(table_name = pin_tags)]
pub struct NewPinTag<'a> {
    pub pin_id: i32,
    pub name: &'a str,
    pub slug: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = boards)]
pub struct Board {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = boards)]
pub struct NewBoard<'a> {
    pub user_id: i32,
    pub title: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = board_pins)]
pub struct NewBoardPin {
    pub board_id: i32,
    pub pin_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = forbidden_tags)]
pub struct ForbiddenTag {
    pub id: i32,
    pub tag: String,
}

#[derive(Insertable)]
#[diesel(table_name = forbidden_tags)]
pub struct NewForbiddenTag<'a> {
    pub tag: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = search_history)]
pub struct SearchEntry {
    pub id: i32,
    pub user_id: i32,
    pub query: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = search_history)]
pub struct NewSearchEntry<'a> {
    pub user_id: i32,
    pub query: &'a str,
    pub created_at: NaiveDateTime,
}

/// A pin together with what every listing shows next to it.
#[derive(Debug, Clone)]
pub struct PinDetails {
    pub pin: Pin,
    pub author: String,
    pub tags: Vec<PinTag>,
}

impl PinDetails {
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }
}
