//! The home page: recommendations, or search results when a query is given.

use diesel::sqlite::SqliteConnection;

use crate::models::{Board, PinDetails, User};
use crate::repo::{boards, icontains, pins, search_history, users};
use crate::tags::slugify;
use crate::web::error::AppError;

/// Something a user has shown interest in through past searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interest {
    /// Slug of a searched `#tag`.
    Tag(String),
    /// Any other search term; matched against author usernames.
    Text(String),
}

pub fn interests(history: &[String]) -> Vec<Interest> {
    let mut interests = Vec::new();
    for entry in history {
        let interest = match SearchQuery::parse(entry) {
            Some(SearchQuery::Tag(tag)) => Interest::Tag(slugify(&tag)),
            Some(SearchQuery::Text(text)) => Interest::Text(text),
            None => continue,
        };
        if !interests.contains(&interest) {
            interests.push(interest);
        }
    }
    interests
}

pub fn is_relevant(pin: &PinDetails, interests: &[Interest]) -> bool {
    interests.iter().any(|interest| match interest {
        Interest::Tag(slug) => !slug.is_empty() && pin.tags.iter().any(|t| t.slug == *slug),
        Interest::Text(text) => icontains(&pin.author, text),
    })
}

/// Moves relevant pins to the front, keeping the order within each group.
pub fn rank(pins: Vec<PinDetails>, interests: &[Interest]) -> Vec<PinDetails> {
    let (mut relevant, other): (Vec<_>, Vec<_>) =
        pins.into_iter().partition(|pin| is_relevant(pin, interests));
    relevant.extend(other);
    relevant
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// `#term`: tags only.
    Tag(String),
    Text(String),
}

impl SearchQuery {
    /// Blank input is no query at all.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.strip_prefix('#').map(str::trim) {
            Some(tag) if !tag.is_empty() => Some(SearchQuery::Tag(tag.to_owned())),
            _ => Some(SearchQuery::Text(raw.to_owned())),
        }
    }

    pub fn term(&self) -> &str {
        match self {
            SearchQuery::Tag(term) | SearchQuery::Text(term) => term,
        }
    }

    pub fn matches(&self, pin: &PinDetails) -> bool {
        let tag_matches = |term: &str| pin.tags.iter().any(|t| icontains(&t.name, term));
        match self {
            SearchQuery::Tag(term) => tag_matches(term),
            SearchQuery::Text(term) => {
                icontains(&pin.pin.title, term)
                    || icontains(&pin.pin.description, term)
                    || tag_matches(term)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Feed {
    /// The trimmed query, if one was given.
    pub query: Option<String>,
    pub pins: Vec<PinDetails>,
    pub boards: Vec<Board>,
    pub users: Vec<User>,
}

/// Builds the home page of `user_id`, recording `q` in the search history.
/// Matching runs over the loaded pins rather than in SQL, so that case
/// folding covers all of Unicode.
pub fn build(conn: &mut SqliteConnection, user_id: i32, q: Option<&str>) -> Result<Feed, AppError> {
    let raw = q.map(str::trim).unwrap_or("");
    let query = match SearchQuery::parse(raw) {
        Some(query) => query,
        None => {
            let interests = interests(&search_history::recent(conn, user_id)?);
            let candidates = pins::list_excluding_user(conn, user_id)?;
            return Ok(Feed {
                query: None,
                pins: rank(pins::with_details(conn, candidates)?, &interests),
                boards: boards::list_excluding_user(conn, user_id)?,
                users: Vec::new(),
            });
        }
    };

    search_history::record(conn, user_id, raw)?;
    let candidates = pins::list_excluding_user(conn, user_id)?;
    let pins = pins::with_details(conn, candidates)?
        .into_iter()
        .filter(|pin| query.matches(pin))
        .collect();
    Ok(Feed {
        query: Some(raw.to_owned()),
        pins,
        boards: boards::search(conn, query.term())?,
        users: users::search(conn, query.term(), user_id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pin, PinTag};
    use crate::repo::fixtures;
    use chrono::NaiveDate;
    use test_case::test_case;

    fn details(id: i32, author: &str, title: &str, tags: &[&str]) -> PinDetails {
        PinDetails {
            pin: Pin {
                id,
                user_id: 1,
                title: title.to_owned(),
                description: String::new(),
                image: None,
                video: None,
                created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .unwrap(),
            },
            author: author.to_owned(),
            tags: tags
                .iter()
                .map(|name| PinTag {
                    id: 0,
                    pin_id: id,
                    name: name.to_string(),
                    slug: slugify(name),
                })
                .collect(),
        }
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test_case("", None)]
    #[test_case("   ", None)]
    #[test_case(" cat ", Some(SearchQuery::Text(String::from("cat"))))]
    #[test_case("#Black Cat", Some(SearchQuery::Tag(String::from("Black Cat"))))]
    #[test_case("#", Some(SearchQuery::Text(String::from("#"))))]
    fn test_parse_query(raw: &str, expected: Option<SearchQuery>) {
        assert_eq!(SearchQuery::parse(raw), expected);
    }

    #[test]
    fn test_interests() {
        let history = strings(&["#Black Cat", "anna", "#black-cat", "  "]);
        assert_eq!(
            interests(&history),
            vec![
                Interest::Tag(String::from("black-cat")),
                Interest::Text(String::from("anna")),
            ]
        );
    }

    #[test]
    fn test_rank_is_stable() {
        let pins = vec![
            details(5, "bob", "a", &["dogs"]),
            details(4, "Joanna", "b", &[]),
            details(3, "bob", "c", &["Black Cat"]),
            details(2, "carl", "d", &[]),
        ];
        let interests = interests(&strings(&["#black cat", "ANNA"]));
        let ids: Vec<i32> = rank(pins, &interests).iter().map(|p| p.pin.id).collect();
        assert_eq!(ids, vec![4, 3, 5, 2]);
    }

    #[test]
    fn test_matches() {
        let pin = details(1, "bob", "Sleepy", &["Catnap"]);
        assert!(SearchQuery::Text(String::from("CAT")).matches(&pin));
        assert!(SearchQuery::Tag(String::from("cat")).matches(&pin));
        assert!(!SearchQuery::Tag(String::from("sleep")).matches(&pin));
        assert!(SearchQuery::Text(String::from("sleep")).matches(&pin));
    }

    #[test]
    fn test_build_search_and_history() {
        let mut conn = fixtures::conn();
        let anna = fixtures::user(&mut conn, "anna");
        let cathy = fixtures::user(&mut conn, "catherine");
        fixtures::pin(&mut conn, &anna, "My cat", "pets");
        let by_tag = fixtures::pin(&mut conn, &cathy, "Sleepy", "Cat");
        let by_title = fixtures::pin(&mut conn, &cathy, "Concatenate", "code");
        fixtures::pin(&mut conn, &cathy, "Dog", "pets");
        boards::create(&mut conn, anna.id, "cats", &[]).unwrap();

        let feed = build(&mut conn, anna.id, Some(" cat ")).unwrap();
        assert_eq!(feed.query.as_deref(), Some("cat"));
        let ids: Vec<i32> = feed.pins.iter().map(|p| p.pin.id).collect();
        assert_eq!(ids, vec![by_title, by_tag]);
        assert_eq!(feed.boards.len(), 1);
        assert_eq!(feed.users.len(), 1);
        assert_eq!(feed.users[0].id, cathy.id);
        assert_eq!(search_history::recent(&mut conn, anna.id).unwrap(), vec!["cat"]);

        build(&mut conn, anna.id, Some("  ")).unwrap();
        assert_eq!(search_history::recent(&mut conn, anna.id).unwrap().len(), 1);
    }

    #[test]
    fn test_build_recommendations() {
        let mut conn = fixtures::conn();
        let anna = fixtures::user(&mut conn, "anna");
        let bob = fixtures::user(&mut conn, "bob");
        fixtures::pin(&mut conn, &anna, "Mine", "autumn");
        let liked = fixtures::pin(&mut conn, &bob, "Leaves", "Autumn");
        let newest = fixtures::pin(&mut conn, &bob, "Car", "cars");
        search_history::record(&mut conn, anna.id, "#autumn").unwrap();

        let feed = build(&mut conn, anna.id, None).unwrap();
        assert!(feed.query.is_none());
        let ids: Vec<i32> = feed.pins.iter().map(|p| p.pin.id).collect();
        assert_eq!(ids, vec![liked, newest]);
        assert_eq!(search_history::recent(&mut conn, anna.id).unwrap().len(), 1);
    }
}
