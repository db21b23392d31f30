//! Operator commands over an open store.
//!
//! Read commands take one graph snapshot and project it into summaries that
//! are safe to print (no password hashes). Write commands go through the
//! store's transactional mutations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use foodstagram_core::{Post, SocialGraph, User, UserId};
use foodstagram_store::{SqliteStore, Table};

use crate::error::{AdminError, Result};

/// A user as printed by `users`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub bio: String,
    pub followers: usize,
    pub following: usize,
    pub posts: usize,
    pub favourite_category: Option<String>,
}

impl UserSummary {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            bio: user.bio.clone(),
            followers: user.followers.len(),
            following: user.following.len(),
            posts: user.posts.len(),
            favourite_category: user.favourite_category().map(str::to_string),
        }
    }
}

/// A post as printed by `posts` and `feed`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PostSummary {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub category: String,
    pub posted_time: DateTime<Utc>,
    pub likes: usize,
    pub comments: usize,
}

impl PostSummary {
    fn from_post(graph: &SocialGraph, post: &Post) -> Self {
        Self {
            id: post.id.to_string(),
            owner: graph
                .owner_of(post)
                .map(|u| u.username.clone())
                .unwrap_or_default(),
            title: post.recipe.title.clone(),
            category: post.category.clone(),
            posted_time: post.posted_time,
            likes: post.num_likes(),
            comments: post.comments.len(),
        }
    }
}

/// Row counts per table, printed by `init`.
#[derive(Debug, Clone, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub rows: i64,
}

// ── Read Commands ────────────────────────────────────────────────

pub fn table_counts(store: &SqliteStore) -> Result<Vec<TableCount>> {
    Table::ALL
        .iter()
        .map(|table| {
            Ok(TableCount {
                table: table.name(),
                rows: store.count_rows(*table)?,
            })
        })
        .collect()
}

pub fn list_users(store: &SqliteStore) -> Result<Vec<UserSummary>> {
    let graph = store.load_graph()?;
    let mut users: Vec<UserSummary> = graph.users().map(UserSummary::from_user).collect();
    users.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(users)
}

/// All posts, oldest first.
pub fn list_posts(store: &SqliteStore) -> Result<Vec<PostSummary>> {
    let graph = store.load_graph()?;
    let mut posts: Vec<&Post> = graph.posts().collect();
    posts.sort_by(|a, b| a.posted_time.cmp(&b.posted_time).then(a.id.cmp(&b.id)));
    Ok(posts
        .into_iter()
        .map(|p| PostSummary::from_post(&graph, p))
        .collect())
}

/// Posts by the accounts `username` follows, newest first.
pub fn feed(store: &SqliteStore, username: &str) -> Result<Vec<PostSummary>> {
    let graph = store.load_graph()?;
    let user = graph
        .user_by_username(username)
        .ok_or_else(|| AdminError::UnknownUser(username.to_string()))?;
    Ok(graph
        .feed_for(&user.id)
        .into_iter()
        .map(|p| PostSummary::from_post(&graph, p))
        .collect())
}

// ── Write Commands ───────────────────────────────────────────────

pub fn create_user(
    store: &mut SqliteStore,
    username: &str,
    password: &str,
    bio: &str,
) -> Result<UserId> {
    let user = User::new(UserId::new(), username, password, bio);
    if !store.insert_user(&user)? {
        return Err(AdminError::UsernameTaken(username.to_string()));
    }
    tracing::info!(user_id = %user.id, username, "Created user");
    Ok(user.id)
}

/// Delete a user and everything that references them.
pub fn delete_user(store: &mut SqliteStore, username: &str) -> Result<UserId> {
    let user = store
        .find_user_by_username(username)?
        .ok_or_else(|| AdminError::UnknownUser(username.to_string()))?;
    if !store.delete_user(&user.id)? {
        return Err(AdminError::UnknownUser(username.to_string()));
    }
    Ok(user.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use foodstagram_core::Recipe;

    fn seeded() -> (SqliteStore, UserId, UserId) {
        let mut store = SqliteStore::in_memory().unwrap();
        let alice = create_user(&mut store, "alice", "pw", "Bakes bread").unwrap();
        let bob = create_user(&mut store, "bob", "pw", "").unwrap();
        let now = Utc::now();
        store
            .create_post(alice, Recipe::new("Sourdough"), "bread", now - Duration::hours(2))
            .unwrap();
        store
            .create_post(alice, Recipe::new("Focaccia"), "bread", now)
            .unwrap();
        store.follow(&alice, &bob).unwrap();
        (store, alice, bob)
    }

    #[test]
    fn test_list_users_sorted_without_passwords() {
        let (store, _, _) = seeded();
        let users = list_users(&store).unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(users[0].posts, 2);
        assert_eq!(users[0].followers, 1);
        assert_eq!(users[1].following, 1);

        let json = serde_json::to_string(&users).unwrap();
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_list_posts_oldest_first() {
        let (store, _, _) = seeded();
        let titles: Vec<String> = list_posts(&store)
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["Sourdough", "Focaccia"]);
    }

    #[test]
    fn test_feed_is_newest_first() {
        let (store, _, _) = seeded();
        let posts = feed(&store, "bob").unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "Focaccia");
        assert_eq!(posts[0].owner, "alice");
        assert!(feed(&store, "alice").unwrap().is_empty());
    }

    #[test]
    fn test_feed_for_unknown_user() {
        let (store, _, _) = seeded();
        assert!(matches!(
            feed(&store, "carol"),
            Err(AdminError::UnknownUser(name)) if name == "carol"
        ));
    }

    #[test]
    fn test_create_user_rejects_taken_name() {
        let (mut store, _, _) = seeded();
        assert!(matches!(
            create_user(&mut store, "alice", "pw", ""),
            Err(AdminError::UsernameTaken(_))
        ));
    }

    #[test]
    fn test_delete_user_removes_posts() {
        let (mut store, alice, _) = seeded();
        assert_eq!(delete_user(&mut store, "alice").unwrap(), alice);
        assert!(list_posts(&store).unwrap().is_empty());

        let counts = table_counts(&store).unwrap();
        let rows = |name: &str| counts.iter().find(|c| c.table == name).unwrap().rows;
        assert_eq!(rows("user_info"), 1);
        assert_eq!(rows("follows"), 0);
        assert_eq!(rows("recipes"), 0);

        assert!(matches!(
            delete_user(&mut store, "alice"),
            Err(AdminError::UnknownUser(_))
        ));
    }

    #[test]
    fn test_delete_user_reports_row_the_store_did_not_remove() {
        let mut store = SqliteStore::in_memory().unwrap();
        // The lookup parses this id, but the cascade binds the canonical
        // lowercase form and matches no row.
        let id = UserId::new();
        store
            .connection()
            .execute(
                "INSERT INTO user_info (user_id, username, password, bio) VALUES (?1, 'erin', 'pw', '')",
                [id.to_string().to_uppercase()],
            )
            .unwrap();

        assert!(matches!(
            delete_user(&mut store, "erin"),
            Err(AdminError::UnknownUser(name)) if name == "erin"
        ));
    }
}
