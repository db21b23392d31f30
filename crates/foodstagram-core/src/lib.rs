//! foodstagram-core: Entity model and social graph arena for Foodstagram.
//!
//! This crate provides the types shared by the storage layer and its callers:
//! - Entities (User, Post, Comment, Recipe, Ingredient)
//! - The [`SocialGraph`] arena that resolves relationships by id
//! - Integrity errors raised while assembling a graph from rows

pub mod error;
pub mod graph;
pub mod types;

pub use error::IntegrityError;
pub use graph::SocialGraph;
pub use types::{Comment, CommentId, Ingredient, Post, PostId, Recipe, RecipeId, User, UserId};
