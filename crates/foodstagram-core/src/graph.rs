//! The in-memory social graph.
//!
//! [`SocialGraph`] is an arena of users and posts keyed by stable id. The
//! storage layer fills it pass by pass (users, category likes, follows,
//! posts, post likes and comments); every method that links two entities
//! checks both ends first and refuses with an [`IntegrityError`] instead of
//! producing a dangling or one-sided edge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::IntegrityError;
use crate::types::{Comment, Post, PostId, User, UserId};

/// A consistent snapshot of users and posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialGraph {
    users: BTreeMap<UserId, User>,
    posts: BTreeMap<PostId, Post>,
}

impl SocialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Assembly ─────────────────────────────────────────────────

    /// Add a user. Relationship fields are reset; they are rebuilt by the
    /// linking passes.
    pub fn insert_user(&mut self, mut user: User) {
        user.like_history.clear();
        user.followers.clear();
        user.following.clear();
        user.posts.clear();
        self.users.insert(user.id, user);
    }

    /// Count one like given by `user_id` in `category`.
    pub fn record_category_like(
        &mut self,
        user_id: &UserId,
        post_id: &PostId,
        category: &str,
    ) -> Result<(), IntegrityError> {
        let user = self.users.get_mut(user_id).ok_or_else(|| {
            IntegrityError::new(
                "likes",
                format!("user_id={user_id}, post_id={post_id}, category={category}"),
                "user_id",
                user_id,
            )
        })?;
        user.record_like(category);
        Ok(())
    }

    /// Apply a follow edge in both directions: `follower_id` follows `user_id`.
    ///
    /// Returns false if the edge was already present.
    pub fn link_follow(
        &mut self,
        user_id: &UserId,
        follower_id: &UserId,
    ) -> Result<bool, IntegrityError> {
        let row = || format!("user_id={user_id}, follower_id={follower_id}");
        if !self.users.contains_key(user_id) {
            return Err(IntegrityError::new("follows", row(), "user_id", user_id));
        }
        if !self.users.contains_key(follower_id) {
            return Err(IntegrityError::new(
                "follows",
                row(),
                "follower_id",
                follower_id,
            ));
        }

        let added = self
            .users
            .get_mut(user_id)
            .map(|u| u.followers.insert(*follower_id))
            .unwrap_or(false);
        if let Some(follower) = self.users.get_mut(follower_id) {
            follower.following.insert(*user_id);
        }
        if !added {
            tracing::trace!(%user_id, %follower_id, "Duplicate follow edge ignored");
        }
        Ok(added)
    }

    /// Add a post and append it to its owner's post list.
    ///
    /// Likes and comments carried by `post` are kept as-is; use
    /// [`attach_like`](Self::attach_like) and
    /// [`attach_comment`](Self::attach_comment) to add checked ones.
    pub fn attach_post(&mut self, post: Post) -> Result<(), IntegrityError> {
        let owner = self.users.get_mut(&post.owner).ok_or_else(|| {
            IntegrityError::new(
                "posts",
                format!("post_id={}, user_id={}", post.id, post.owner),
                "user_id",
                post.owner,
            )
        })?;
        if !owner.posts.contains(&post.id) {
            owner.posts.push(post.id);
        }
        self.posts.insert(post.id, post);
        Ok(())
    }

    /// Record that `user_id` liked `post_id`. Returns false on a re-like.
    pub fn attach_like(
        &mut self,
        user_id: &UserId,
        post_id: &PostId,
    ) -> Result<bool, IntegrityError> {
        let row = || format!("user_id={user_id}, post_id={post_id}");
        if !self.users.contains_key(user_id) {
            return Err(IntegrityError::new("likes", row(), "user_id", user_id));
        }
        let post = self
            .posts
            .get_mut(post_id)
            .ok_or_else(|| IntegrityError::new("likes", row(), "post_id", post_id))?;
        Ok(post.add_like(*user_id))
    }

    /// Append a comment to a post, checking the author exists.
    pub fn attach_comment(
        &mut self,
        post_id: &PostId,
        comment: Comment,
    ) -> Result<(), IntegrityError> {
        let row = format!(
            "comment_id={}, user_id={}, post_id={post_id}",
            comment.id, comment.author_id
        );
        if !self.users.contains_key(&comment.author_id) {
            return Err(IntegrityError::new(
                "comments",
                row,
                "user_id",
                comment.author_id,
            ));
        }
        let post = self
            .posts
            .get_mut(post_id)
            .ok_or_else(|| IntegrityError::new("comments", row, "post_id", post_id))?;
        post.add_comment(comment);
        Ok(())
    }

    // ── Lookups ──────────────────────────────────────────────────

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn post(&self, id: &PostId) -> Option<&Post> {
        self.posts.get(id)
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.values().find(|u| u.username == username)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.values()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// The owner of a post, resolved through the arena.
    pub fn owner_of(&self, post: &Post) -> Option<&User> {
        self.users.get(&post.owner)
    }

    /// Posts owned by `user_id`, oldest first.
    pub fn posts_of(&self, user_id: &UserId) -> Vec<&Post> {
        self.users
            .get(user_id)
            .map(|u| u.posts.iter().filter_map(|id| self.posts.get(id)).collect())
            .unwrap_or_default()
    }

    /// Posts by everyone `user_id` follows, newest first.
    pub fn feed_for(&self, user_id: &UserId) -> Vec<&Post> {
        let Some(user) = self.users.get(user_id) else {
            return Vec::new();
        };
        let mut feed: Vec<&Post> = user
            .following
            .iter()
            .flat_map(|followed| self.posts_of(followed))
            .collect();
        feed.sort_by(|a, b| b.posted_time.cmp(&a.posted_time).then(a.id.cmp(&b.id)));
        feed
    }

    // ── Projections ──────────────────────────────────────────────

    pub fn into_users(self) -> Vec<User> {
        self.users.into_values().collect()
    }

    /// All posts, oldest first.
    pub fn into_posts(self) -> Vec<Post> {
        let mut posts: Vec<Post> = self.posts.into_values().collect();
        posts.sort_by(|a, b| a.posted_time.cmp(&b.posted_time).then(a.id.cmp(&b.id)));
        posts
    }
}
