//! Request bodies of the form-like endpoints and their validation.
//!
//! Each `*Form` deserializes leniently (missing fields become empty) and
//! `clean`s into a value the handler can act on, or into [`FormErrors`]
//! keyed by field name.

use serde::Deserialize;

use crate::media::{DecodedUpload, MediaKind, Upload};
use crate::tags::parse_tags;
use crate::web::error::{FormErrors, NON_FIELD_ERRORS};

pub const REQUIRED: &str = "This field is required.";
pub const USERNAME_MAX: usize = 150;
pub const DISPLAY_NAME_MAX: usize = 100;
pub const TITLE_MAX: usize = 200;
pub const BOARD_MIN_PINS: usize = 2;

fn max_length(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
    }
}

fn required<'a>(errors: &mut FormErrors, field: &str, value: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    }
    value
}

pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || "_.@+-".contains(c))
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.rsplitn(2, '@');
    let (domain, local) = match (parts.next(), parts.next()) {
        (Some(domain), Some(local)) => (domain, local),
        _ => return false,
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
        && domain.contains('.')
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub password: String,
}

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

impl RegisterForm {
    /// The error for a username claimed by someone else in the meantime.
    pub fn username_taken() -> FormErrors {
        FormErrors::single("username", USERNAME_TAKEN)
    }

    /// Passwords are taken verbatim; only the other fields are trimmed.
    pub fn clean(&self, username_taken: bool) -> Result<Registration, FormErrors> {
        let mut errors = FormErrors::new();

        let username = required(&mut errors, "username", &self.username);
        if !username.is_empty() {
            max_length(&mut errors, "username", username, USERNAME_MAX);
            if !is_valid_username(username) {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            } else if username_taken {
                errors.add("username", USERNAME_TAKEN);
            }
        }

        let display_name = required(&mut errors, "display_name", &self.display_name);
        max_length(&mut errors, "display_name", display_name, DISPLAY_NAME_MAX);

        let email = required(&mut errors, "email", &self.email);
        if !email.is_empty() && !is_valid_email(email) {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if !self.password1.is_empty() && self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.into_result(Registration {
            username: username.to_owned(),
            display_name: display_name.to_owned(),
            email: email.to_owned(),
            password: self.password1.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

impl LoginForm {
    pub fn clean(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let username = required(&mut errors, "username", &self.username);
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result((username.to_owned(), self.password.clone()))
    }

    pub fn invalid_credentials() -> FormErrors {
        FormErrors::single(NON_FIELD_ERRORS, INVALID_LOGIN)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PinForm {
    pub title: String,
    pub description: String,
    pub image: Option<Upload>,
    pub video: Option<Upload>,
    pub tags: String,
}

/// A pin submission whose uploads are decoded but not yet stored.
#[derive(Debug, Clone)]
pub struct PinSubmission {
    pub title: String,
    pub description: String,
    pub image: Option<DecodedUpload>,
    pub video: Option<DecodedUpload>,
    pub tags: Vec<String>,
}

impl PinForm {
    pub fn clean(&self) -> Result<PinSubmission, FormErrors> {
        let mut errors = FormErrors::new();
        let title = required(&mut errors, "title", &self.title);
        max_length(&mut errors, "title", title, TITLE_MAX);

        let image = decode_optional(&mut errors, "image", self.image.as_ref(), MediaKind::PinImage);
        let video = decode_optional(&mut errors, "video", self.video.as_ref(), MediaKind::PinVideo);

        let tags = parse_tags(&self.tags);
        if tags.is_empty() {
            errors.add("tags", REQUIRED);
        }

        errors.into_result(PinSubmission {
            title: title.to_owned(),
            description: self.description.trim().to_owned(),
            image,
            video,
            tags,
        })
    }
}

fn decode_optional(
    errors: &mut FormErrors,
    field: &str,
    upload: Option<&Upload>,
    kind: MediaKind,
) -> Option<DecodedUpload> {
    match upload.map(|u| u.decode(kind)) {
        Some(Ok(decoded)) => Some(decoded),
        Some(Err(message)) => {
            errors.add(field, message);
            None
        }
        None => None,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoardForm {
    pub title: String,
    pub pins: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBoardRequest {
    pub title: String,
    pub pin_ids: Vec<i32>,
}

impl BoardForm {
    /// The submitted pin ids without repetitions, in submission order.
    pub fn pin_ids(&self) -> Vec<i32> {
        let mut ids = Vec::with_capacity(self.pins.len());
        for &id in &self.pins {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// `existing` lists which of [`BoardForm::pin_ids`] name a stored pin.
    pub fn clean(&self, existing: &[i32]) -> Result<NewBoardRequest, FormErrors> {
        let mut errors = FormErrors::new();
        let title = required(&mut errors, "title", &self.title);
        max_length(&mut errors, "title", title, TITLE_MAX);

        let pin_ids = self.pin_ids();
        if pin_ids.is_empty() {
            errors.add("pins", REQUIRED);
        } else if let Some(missing) = pin_ids.iter().find(|id| !existing.contains(id)) {
            errors.add(
                "pins",
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    missing
                ),
            );
        } else if pin_ids.len() < BOARD_MIN_PINS {
            errors.add(
                NON_FIELD_ERRORS,
                format!("A board must contain at least {} pins.", BOARD_MIN_PINS),
            );
        }

        errors.into_result(NewBoardRequest {
            title: title.to_owned(),
            pin_ids,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub display_name: String,
    pub bio: String,
    pub avatar: Option<Upload>,
}

#[derive(Debug, Clone)]
pub struct ProfileChanges {
    pub display_name: String,
    pub bio: String,
    pub avatar: Option<DecodedUpload>,
}

impl ProfileForm {
    pub fn clean(&self) -> Result<ProfileChanges, FormErrors> {
        let mut errors = FormErrors::new();
        let display_name = self.display_name.trim();
        max_length(&mut errors, "display_name", display_name, DISPLAY_NAME_MAX);
        let avatar = decode_optional(&mut errors, "avatar", self.avatar.as_ref(), MediaKind::Avatar);
        errors.into_result(ProfileChanges {
            display_name: display_name.to_owned(),
            bio: self.bio.trim().to_owned(),
            avatar,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AvatarForm {
    pub avatar: Option<Upload>,
}

impl AvatarForm {
    pub fn clean(&self) -> Result<DecodedUpload, FormErrors> {
        let mut errors = FormErrors::new();
        let avatar = decode_optional(&mut errors, "avatar", self.avatar.as_ref(), MediaKind::Avatar);
        match avatar {
            Some(avatar) if errors.is_empty() => Ok(avatar),
            _ => {
                if errors.is_empty() {
                    errors.add("avatar", REQUIRED);
                }
                Err(errors)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddToBoardForm {
    pub board: Option<i32>,
}

impl AddToBoardForm {
    pub fn clean(&self) -> Result<i32, FormErrors> {
        self.board.ok_or_else(|| FormErrors::single("board", REQUIRED))
    }
}
