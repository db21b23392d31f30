//! Core domain types for the Foodstagram social graph.
//!
//! Entities refer to each other by id only. Resolving an id to an entity
//! goes through [`crate::SocialGraph`], so a snapshot never contains
//! reference cycles between users and posts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Identity ──────────────────────────────────────────────────────

/// Stable identifier of a user. Never changes, unlike the username.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecipeId(pub Uuid);

impl RecipeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecipeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Users ─────────────────────────────────────────────────────────

/// A registered member of the app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Opaque credential; this crate never inspects it.
    pub password: String,
    pub bio: String,
    /// Recipe category -> number of posts in that category this user liked.
    pub like_history: BTreeMap<String, u32>,
    pub followers: BTreeSet<UserId>,
    pub following: BTreeSet<UserId>,
    /// Posts owned by this user, oldest first.
    pub posts: Vec<PostId>,
}

impl User {
    /// A user with no likes, follows, or posts.
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        password: impl Into<String>,
        bio: impl Into<String>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            password: password.into(),
            bio: bio.into(),
            like_history: BTreeMap::new(),
            followers: BTreeSet::new(),
            following: BTreeSet::new(),
            posts: Vec::new(),
        }
    }

    /// Bump the like count for a category.
    pub fn record_like(&mut self, category: &str) {
        *self.like_history.entry(category.to_string()).or_insert(0) += 1;
    }

    /// Number of likes this user has given in `category`.
    pub fn likes_in(&self, category: &str) -> u32 {
        self.like_history.get(category).copied().unwrap_or(0)
    }

    /// The category this user likes most, ties broken alphabetically.
    pub fn favourite_category(&self) -> Option<&str> {
        self.like_history
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(category, _)| category.as_str())
    }
}

// ── Posts ─────────────────────────────────────────────────────────

/// A recipe shared by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub owner: UserId,
    pub recipe: Recipe,
    pub category: String,
    pub posted_time: DateTime<Utc>,
    pub liked_users: BTreeSet<UserId>,
    /// Append-only; insertion order is display order.
    pub comments: Vec<Comment>,
}

impl Post {
    /// A fresh post with a new id and no likes or comments.
    pub fn new(
        owner: UserId,
        recipe: Recipe,
        category: impl Into<String>,
        posted_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PostId::new(),
            owner,
            recipe,
            category: category.into(),
            posted_time,
            liked_users: BTreeSet::new(),
            comments: Vec::new(),
        }
    }

    /// Returns false if the user had already liked this post.
    pub fn add_like(&mut self, user: UserId) -> bool {
        self.liked_users.insert(user)
    }

    pub fn add_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    pub fn num_likes(&self) -> usize {
        self.liked_users.len()
    }
}

/// A comment left on a post. The author need not own the post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub author_id: UserId,
    pub created_time: DateTime<Utc>,
    pub text: String,
}

impl Comment {
    pub fn new(author_id: UserId, text: impl Into<String>, created_time: DateTime<Utc>) -> Self {
        Self {
            id: CommentId::new(),
            author_id,
            created_time,
            text: text.into(),
        }
    }
}

// ── Recipes ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    /// Steps in the order they are performed.
    pub steps: Vec<String>,
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: RecipeId::new(),
            title: title.into(),
            steps: Vec::new(),
            ingredients: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Adds an ingredient unless one with the same name is already listed.
    pub fn with_ingredient(mut self, ingredient: Ingredient) -> Self {
        if !self.ingredients.iter().any(|i| i.name() == ingredient.name()) {
            self.ingredients.push(ingredient);
        }
        self
    }
}

/// An ingredient is either counted ("3 eggs") or measured ("200 g flour").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ingredient {
    Countable { name: String, count: f64 },
    Measurable { name: String, amount: f64, unit: String },
}

impl Ingredient {
    pub fn countable(name: impl Into<String>, count: f64) -> Self {
        Self::Countable {
            name: name.into(),
            count,
        }
    }

    pub fn measurable(name: impl Into<String>, amount: f64, unit: impl Into<String>) -> Self {
        Self::Measurable {
            name: name.into(),
            amount,
            unit: unit.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Ingredient::Countable { name, .. } => name,
            Ingredient::Measurable { name, .. } => name,
        }
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ingredient::Countable { name, count } => write!(f, "{count} {name}"),
            Ingredient::Measurable { name, amount, unit } => write!(f, "{amount} {unit} {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingredient_serializes_with_kind_tag() {
        let json = serde_json::to_value(Ingredient::measurable("flour", 200.0, "g")).unwrap();
        assert_eq!(json["kind"], "measurable");
        assert_eq!(json["unit"], "g");

        let json = serde_json::to_value(Ingredient::countable("egg", 3.0)).unwrap();
        assert_eq!(json["kind"], "countable");
        assert_eq!(json["count"], 3.0);
    }

    #[test]
    fn relike_is_a_noop() {
        let mut post = Post::new(UserId::new(), Recipe::new("Toast"), "breakfast", Utc::now());
        let liker = UserId::new();

        assert!(post.add_like(liker));
        assert!(!post.add_like(liker));
        assert_eq!(post.num_likes(), 1);
    }

    #[test]
    fn comments_keep_insertion_order() {
        let mut post = Post::new(UserId::new(), Recipe::new("Soup"), "dinner", Utc::now());
        let author = UserId::new();
        post.add_comment(Comment::new(author, "first", Utc::now()));
        post.add_comment(Comment::new(author, "second", Utc::now()));

        let texts: Vec<_> = post.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn like_history_counts_per_category() {
        let mut user = User::new(UserId::new(), "alice", "pw", "");
        user.record_like("dessert");
        user.record_like("dessert");
        user.record_like("vegan");

        assert_eq!(user.likes_in("dessert"), 2);
        assert_eq!(user.likes_in("vegan"), 1);
        assert_eq!(user.likes_in("bbq"), 0);
        assert_eq!(user.favourite_category(), Some("dessert"));
    }

    #[test]
    fn favourite_category_breaks_ties_alphabetically() {
        let mut user = User::new(UserId::new(), "bob", "pw", "");
        user.record_like("vegan");
        user.record_like("asian");
        assert_eq!(user.favourite_category(), Some("asian"));
    }

    #[test]
    fn recipe_ignores_duplicate_ingredient_names() {
        let recipe = Recipe::new("Omelette")
            .with_ingredient(Ingredient::countable("egg", 2.0))
            .with_ingredient(Ingredient::countable("egg", 3.0))
            .with_ingredient(Ingredient::measurable("milk", 50.0, "ml"));

        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[0], Ingredient::countable("egg", 2.0));
    }
}
