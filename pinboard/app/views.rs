//! JSON shapes of the pages.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::media::MediaStore;
use crate::models::{Board, PinDetails, Profile, User};

#[derive(Debug, Serialize)]
pub struct PinView {
    pub id: i32,
    pub author: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub tags: Vec<String>,
    pub created_at: NaiveDateTime,
}

impl PinView {
    pub fn new(media: &MediaStore, details: &PinDetails) -> Self {
        let pin = &details.pin;
        Self {
            id: pin.id,
            author: details.author.clone(),
            title: pin.title.clone(),
            description: pin.description.clone(),
            image: pin.image.as_deref().map(|p| media.url(p)),
            video: pin.video.as_deref().map(|p| media.url(p)),
            tags: details.tag_names(),
            created_at: pin.created_at,
        }
    }

    pub fn list(media: &MediaStore, pins: &[PinDetails]) -> Vec<Self> {
        pins.iter().map(|p| Self::new(media, p)).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct BoardSummary {
    pub id: i32,
    pub owner: String,
    pub title: String,
    pub pin_count: usize,
    pub created_at: NaiveDateTime,
}

impl BoardSummary {
    pub fn list(
        boards: &[Board],
        owners: &HashMap<i32, String>,
        counts: &HashMap<i32, usize>,
    ) -> Vec<Self> {
        boards
            .iter()
            .map(|b| Self {
                id: b.id,
                owner: owners.get(&b.user_id).cloned().unwrap_or_default(),
                title: b.title.clone(),
                pin_count: counts.get(&b.id).copied().unwrap_or(0),
                created_at: b.created_at,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct BoardDetail {
    pub id: i32,
    pub owner: String,
    pub title: String,
    pub created_at: NaiveDateTime,
    pub is_owner: bool,
    pub pins: Vec<PinView>,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i32,
    pub username: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub avatar: Option<String>,
    pub is_own_profile: bool,
    pub pins: Vec<PinView>,
    pub boards: Vec<BoardSummary>,
}

impl ProfileView {
    /// Name shown for the user: the display name, or the username if blank.
    pub fn shown_name(profile: &Profile, user: &User) -> String {
        if profile.display_name.is_empty() {
            user.username.clone()
        } else {
            profile.display_name.clone()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HomeView {
    pub query: Option<String>,
    pub pins: Vec<PinView>,
    pub boards: Vec<BoardSummary>,
    pub users: Vec<UserView>,
}

#[derive(Debug, Serialize)]
pub struct PinEditView {
    pub pin: PinView,
    /// The tags as they would be typed back into the form.
    pub tags_input: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pin, PinTag};
    use chrono::NaiveDate;

    #[test]
    fn test_pin_view_exposes_media_urls() {
        let media = MediaStore::new("/srv/media", "/media/");
        let created_at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        let details = PinDetails {
            pin: Pin {
                id: 7,
                user_id: 1,
                title: String::from("Sunset"),
                description: String::new(),
                image: Some(String::from("pins/images/sun_x.png")),
                video: None,
                created_at,
            },
            author: String::from("anna"),
            tags: vec![PinTag {
                id: 1,
                pin_id: 7,
                name: String::from("Autumn"),
                slug: String::from("autumn"),
            }],
        };
        let json = serde_json::to_value(PinView::new(&media, &details)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "author": "anna",
                "title": "Sunset",
                "description": "",
                "image": "/media/pins/images/sun_x.png",
                "video": null,
                "tags": ["Autumn"],
                "created_at": "2024-05-01T12:00:00",
            })
        );
    }
}
