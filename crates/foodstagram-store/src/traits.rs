//! The [`SocialStore`] trait: the boundary the app shell calls into.
//!
//! The shell only needs whole-graph reads and single logical writes; this
//! trait names exactly those, so a shell can be driven against a test double
//! without a database.

use chrono::{DateTime, Utc};

use foodstagram_core::{Post, PostId, Recipe, SocialGraph, User, UserId};

use crate::client::{SqliteStore, StoreError};

pub trait SocialStore {
    /// Load every user and post as one consistent snapshot.
    fn load_graph(&self) -> Result<SocialGraph, StoreError>;

    fn load_all_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.load_graph()?.into_users())
    }

    fn load_all_posts(&self) -> Result<Vec<Post>, StoreError> {
        Ok(self.load_graph()?.into_posts())
    }

    /// Returns false if the username is taken.
    fn create_user(&mut self, username: &str, password: &str) -> Result<bool, StoreError>;

    fn create_post(
        &mut self,
        owner: UserId,
        recipe: Recipe,
        category: &str,
        posted_time: DateTime<Utc>,
    ) -> Result<PostId, StoreError>;

    /// Returns false if the post does not exist.
    fn edit_post(&mut self, post: &Post) -> Result<bool, StoreError>;

    /// Returns whether a post was removed.
    fn delete_post(&mut self, post_id: &PostId) -> Result<bool, StoreError>;

    /// Removes the user and every row derived from them.
    fn delete_user(&mut self, user_id: &UserId) -> Result<bool, StoreError>;

    /// Updates the user keyed by `user.id`.
    fn edit_user(&mut self, user: &User) -> Result<bool, StoreError>;
}

impl SocialStore for SqliteStore {
    fn load_graph(&self) -> Result<SocialGraph, StoreError> {
        SqliteStore::load_graph(self)
    }

    fn create_user(&mut self, username: &str, password: &str) -> Result<bool, StoreError> {
        SqliteStore::create_user(self, username, password)
    }

    fn create_post(
        &mut self,
        owner: UserId,
        recipe: Recipe,
        category: &str,
        posted_time: DateTime<Utc>,
    ) -> Result<PostId, StoreError> {
        SqliteStore::create_post(self, owner, recipe, category, posted_time)
    }

    fn edit_post(&mut self, post: &Post) -> Result<bool, StoreError> {
        SqliteStore::edit_post(self, post)
    }

    fn delete_post(&mut self, post_id: &PostId) -> Result<bool, StoreError> {
        SqliteStore::delete_post(self, post_id)
    }

    fn delete_user(&mut self, user_id: &UserId) -> Result<bool, StoreError> {
        SqliteStore::delete_user(self, user_id)
    }

    fn edit_user(&mut self, user: &User) -> Result<bool, StoreError> {
        SqliteStore::edit_user(self, user)
    }
}
