//! Write operations for the social graph.
//!
//! Every public method runs in its own write transaction. Rows are written
//! parent-first and deleted child-first; a failure at any step drops the
//! transaction, which rolls back everything the call wrote.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use foodstagram_core::{
    Comment, CommentId, IntegrityError, Ingredient, Post, PostId, Recipe, User, UserId,
};

use crate::client::{SqliteStore, StoreError};
use crate::queries::parse_uuid;

impl SqliteStore {
    // ── Users ────────────────────────────────────────────────────

    /// Register a new user with an empty bio.
    ///
    /// Returns false if the username is already taken.
    pub fn create_user(&mut self, username: &str, password: &str) -> Result<bool, StoreError> {
        self.insert_user(&User::new(UserId::new(), username, password, ""))
    }

    /// Insert the `user_info` row for `user`, keeping its id.
    ///
    /// Relationship fields of `user` are ignored. Returns false if the
    /// username is already taken; reusing an existing id is `Invalid`.
    pub fn insert_user(&mut self, user: &User) -> Result<bool, StoreError> {
        let tx = self.write_txn()?;
        if user_exists(&tx, &user.id)? {
            return Err(StoreError::Invalid(format!(
                "user id {} is already in use",
                user.id
            )));
        }
        if username_taken(&tx, &user.username)? {
            tracing::debug!(username = %user.username, "Username already taken");
            return Ok(false);
        }

        let inserted = tx.execute(
            "INSERT INTO user_info (user_id, username, password, bio) VALUES (?1, ?2, ?3, ?4)",
            params![user.id.to_string(), user.username, user.password, user.bio],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_username_conflict(&e) => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        tracing::debug!(user_id = %user.id, username = %user.username, "Created user");
        Ok(true)
    }

    /// Update username, password and bio of the user with `user.id`.
    ///
    /// Returns false if no such user exists or the new username belongs to
    /// someone else.
    pub fn edit_user(&mut self, user: &User) -> Result<bool, StoreError> {
        let tx = self.write_txn()?;
        let updated = tx.execute(
            "UPDATE user_info SET username = ?2, password = ?3, bio = ?4 WHERE user_id = ?1",
            params![user.id.to_string(), user.username, user.password, user.bio],
        );
        let changed = match updated {
            Ok(n) => n,
            Err(e) if is_username_conflict(&e) => {
                tracing::debug!(user_id = %user.id, username = %user.username, "Username already taken");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit()?;
        Ok(changed > 0)
    }

    /// Remove a user and every row that refers to them or to their posts.
    ///
    /// Returns false if the user did not exist.
    pub fn delete_user(&mut self, user_id: &UserId) -> Result<bool, StoreError> {
        let tx = self.write_txn()?;
        if !user_exists(&tx, user_id)? {
            return Ok(false);
        }
        let id = user_id.to_string();

        let post_ids = {
            let mut stmt = tx.prepare_cached("SELECT post_id FROM posts WHERE user_id = ?1")?;
            let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(PostId(parse_uuid("posts", "post_id", &row?)?));
            }
            ids
        };
        for post_id in &post_ids {
            delete_post_rows(&tx, post_id)?;
        }

        let comments = tx.execute("DELETE FROM comments WHERE user_id = ?1", params![id])?;
        let follows = tx.execute(
            "DELETE FROM follows WHERE user_id = ?1 OR follower_id = ?1",
            params![id],
        )?;
        let likes = tx.execute("DELETE FROM likes WHERE user_id = ?1", params![id])?;
        tx.execute("DELETE FROM user_info WHERE user_id = ?1", params![id])?;
        tx.commit()?;

        tracing::info!(
            %user_id,
            posts = post_ids.len(),
            comments,
            follows,
            likes,
            "Deleted user and dependent rows"
        );
        Ok(true)
    }

    // ── Posts ────────────────────────────────────────────────────

    /// Publish a new recipe post and return its id.
    pub fn create_post(
        &mut self,
        owner: UserId,
        recipe: Recipe,
        category: &str,
        posted_time: DateTime<Utc>,
    ) -> Result<PostId, StoreError> {
        let post = Post::new(owner, recipe, category, posted_time);
        self.save_post(&post)?;
        Ok(post.id)
    }

    /// Write `post` with its recipe, likes and comments, replacing any
    /// stored state for the same post id.
    ///
    /// The owner, every liking user and every comment author must exist.
    pub fn save_post(&mut self, post: &Post) -> Result<(), StoreError> {
        let tx = self.write_txn()?;
        let replaced = delete_post_rows(&tx, &post.id)?;
        insert_post_rows(&tx, post)?;
        tx.commit()?;

        tracing::debug!(post_id = %post.id, replaced, "Saved post");
        Ok(())
    }

    /// Overwrite an existing post with the given state.
    ///
    /// Returns false, writing nothing, if the post does not exist.
    pub fn edit_post(&mut self, post: &Post) -> Result<bool, StoreError> {
        let tx = self.write_txn()?;
        if !delete_post_rows(&tx, &post.id)? {
            return Ok(false);
        }
        insert_post_rows(&tx, post)?;
        tx.commit()?;

        tracing::debug!(post_id = %post.id, "Edited post");
        Ok(true)
    }

    /// Delete a post with its recipe and every like and comment on it.
    ///
    /// Returns whether a post was removed; deleting a missing id is a no-op.
    pub fn delete_post(&mut self, post_id: &PostId) -> Result<bool, StoreError> {
        let tx = self.write_txn()?;
        let removed = delete_post_rows(&tx, post_id)?;
        tx.commit()?;

        tracing::debug!(%post_id, removed, "Deleted post");
        Ok(removed)
    }

    // ── Likes, Comments, Follows ─────────────────────────────────

    /// Record that `user_id` likes `post_id`. Returns false on a re-like.
    pub fn like_post(&mut self, user_id: &UserId, post_id: &PostId) -> Result<bool, StoreError> {
        let tx = self.write_txn()?;
        let row = || format!("user_id={user_id}, post_id={post_id}");
        if !user_exists(&tx, user_id)? {
            return Err(IntegrityError::new("likes", row(), "user_id", user_id).into());
        }
        let category: String = tx
            .query_row(
                "SELECT category FROM posts WHERE post_id = ?1",
                params![post_id.to_string()],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| IntegrityError::new("likes", row(), "post_id", post_id))?;

        let added = tx.execute(
            "INSERT OR IGNORE INTO likes (user_id, post_id, category) VALUES (?1, ?2, ?3)",
            params![user_id.to_string(), post_id.to_string(), category],
        )?;
        tx.commit()?;
        Ok(added > 0)
    }

    /// Withdraw a like. Returns false if there was none.
    pub fn unlike_post(&mut self, user_id: &UserId, post_id: &PostId) -> Result<bool, StoreError> {
        let tx = self.write_txn()?;
        let removed = tx.execute(
            "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
            params![user_id.to_string(), post_id.to_string()],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Append a comment to a post and return the comment's id.
    pub fn add_comment(
        &mut self,
        post_id: &PostId,
        author_id: &UserId,
        text: &str,
        created_time: DateTime<Utc>,
    ) -> Result<CommentId, StoreError> {
        let comment = Comment::new(*author_id, text, created_time);
        let tx = self.write_txn()?;
        insert_comment(&tx, post_id, &comment)?;
        tx.commit()?;
        Ok(comment.id)
    }

    /// Make `follower_id` follow `user_id`. Returns false if it already did.
    pub fn follow(&mut self, user_id: &UserId, follower_id: &UserId) -> Result<bool, StoreError> {
        if user_id == follower_id {
            return Err(StoreError::Invalid(format!(
                "user {user_id} cannot follow themselves"
            )));
        }
        let tx = self.write_txn()?;
        let row = || format!("user_id={user_id}, follower_id={follower_id}");
        if !user_exists(&tx, user_id)? {
            return Err(IntegrityError::new("follows", row(), "user_id", user_id).into());
        }
        if !user_exists(&tx, follower_id)? {
            return Err(IntegrityError::new("follows", row(), "follower_id", follower_id).into());
        }

        let added = tx.execute(
            "INSERT OR IGNORE INTO follows (user_id, follower_id) VALUES (?1, ?2)",
            params![user_id.to_string(), follower_id.to_string()],
        )?;
        tx.commit()?;
        Ok(added > 0)
    }

    /// Remove a follow edge. Returns false if there was none.
    pub fn unfollow(&mut self, user_id: &UserId, follower_id: &UserId) -> Result<bool, StoreError> {
        let tx = self.write_txn()?;
        let removed = tx.execute(
            "DELETE FROM follows WHERE user_id = ?1 AND follower_id = ?2",
            params![user_id.to_string(), follower_id.to_string()],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }
}

// ── Row Writers ──────────────────────────────────────────────────

/// Insert the post row, its recipe, ingredients, steps, likes and comments.
fn insert_post_rows(conn: &Connection, post: &Post) -> Result<(), StoreError> {
    check_recipe(&post.recipe)?;
    if !user_exists(conn, &post.owner)? {
        return Err(IntegrityError::new(
            "posts",
            format!("post_id={}, user_id={}", post.id, post.owner),
            "user_id",
            post.owner,
        )
        .into());
    }

    let recipe = &post.recipe;
    let recipe_id = recipe.id.to_string();
    conn.execute(
        "INSERT INTO recipes (recipe_id, title) VALUES (?1, ?2)",
        params![recipe_id, recipe.title],
    )?;

    {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_name, ingredient_count,
                                             ingredient_amount, ingredient_measurement)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for ingredient in &recipe.ingredients {
            match ingredient {
                Ingredient::Countable { name, count } => {
                    stmt.execute(params![recipe_id, name, count, None::<f64>, None::<String>])?;
                }
                Ingredient::Measurable { name, amount, unit } => {
                    stmt.execute(params![recipe_id, name, None::<f64>, amount, unit])?;
                }
            }
        }
    }

    {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO recipes_steps (recipe_id, step_number, step_text) VALUES (?1, ?2, ?3)",
        )?;
        for (i, step) in recipe.steps.iter().enumerate() {
            stmt.execute(params![recipe_id, (i + 1) as i64, step])?;
        }
    }

    conn.execute(
        "INSERT INTO posts (post_id, user_id, recipe_id, category, posted_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            post.id.to_string(),
            post.owner.to_string(),
            recipe_id,
            post.category,
            post.posted_time,
        ],
    )?;

    {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO likes (user_id, post_id, category) VALUES (?1, ?2, ?3)",
        )?;
        for user_id in &post.liked_users {
            if !user_exists(conn, user_id)? {
                return Err(IntegrityError::new(
                    "likes",
                    format!("user_id={user_id}, post_id={}", post.id),
                    "user_id",
                    user_id,
                )
                .into());
            }
            stmt.execute(params![
                user_id.to_string(),
                post.id.to_string(),
                post.category
            ])?;
        }
    }

    for comment in &post.comments {
        insert_comment(conn, &post.id, comment)?;
    }
    Ok(())
}

fn insert_comment(conn: &Connection, post_id: &PostId, comment: &Comment) -> Result<(), StoreError> {
    let row = || {
        format!(
            "comment_id={}, user_id={}, post_id={post_id}",
            comment.id, comment.author_id
        )
    };
    if !user_exists(conn, &comment.author_id)? {
        return Err(IntegrityError::new("comments", row(), "user_id", comment.author_id).into());
    }
    if !post_exists(conn, post_id)? {
        return Err(IntegrityError::new("comments", row(), "post_id", post_id).into());
    }

    conn.execute(
        "INSERT INTO comments (comment_id, user_id, post_id, comment_time, comment_text)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            comment.id.to_string(),
            comment.author_id.to_string(),
            post_id.to_string(),
            comment.created_time,
            comment.text,
        ],
    )?;
    Ok(())
}

/// Delete a post and everything keyed by it: likes and comments from any
/// user, then the recipe with its ingredients and steps, then the post row.
///
/// Returns false if there was no such post.
fn delete_post_rows(conn: &Connection, post_id: &PostId) -> Result<bool, StoreError> {
    let id = post_id.to_string();
    let recipe_id: Option<String> = conn
        .query_row(
            "SELECT recipe_id FROM posts WHERE post_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(recipe_id) = recipe_id else {
        return Ok(false);
    };

    conn.execute("DELETE FROM likes WHERE post_id = ?1", params![id])?;
    conn.execute("DELETE FROM comments WHERE post_id = ?1", params![id])?;
    conn.execute(
        "DELETE FROM recipe_ingredients WHERE recipe_id = ?1",
        params![recipe_id],
    )?;
    conn.execute(
        "DELETE FROM recipes_steps WHERE recipe_id = ?1",
        params![recipe_id],
    )?;
    conn.execute("DELETE FROM recipes WHERE recipe_id = ?1", params![recipe_id])?;
    conn.execute("DELETE FROM posts WHERE post_id = ?1", params![id])?;
    Ok(true)
}

// ── Helpers ──────────────────────────────────────────────────────

/// Reject recipes whose ingredients would not survive a reload.
///
/// SQLite stores a NaN REAL as NULL, so a non-finite quantity would read
/// back as an ingredient with no quantity at all. Ingredient names are the
/// row key within a recipe.
fn check_recipe(recipe: &Recipe) -> Result<(), StoreError> {
    let mut names = HashSet::new();
    for ingredient in &recipe.ingredients {
        let quantity = match ingredient {
            Ingredient::Countable { count, .. } => *count,
            Ingredient::Measurable { amount, .. } => *amount,
        };
        if !quantity.is_finite() {
            return Err(StoreError::Invalid(format!(
                "ingredient {:?} of recipe {} has non-finite quantity {quantity}",
                ingredient.name(),
                recipe.id
            )));
        }
        if !names.insert(ingredient.name()) {
            return Err(StoreError::Invalid(format!(
                "ingredient {:?} appears twice in recipe {}",
                ingredient.name(),
                recipe.id
            )));
        }
    }
    Ok(())
}

fn user_exists(conn: &Connection, user_id: &UserId) -> Result<bool, StoreError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM user_info WHERE user_id = ?1)",
        params![user_id.to_string()],
        |row| row.get(0),
    )?)
}

fn post_exists(conn: &Connection, post_id: &PostId) -> Result<bool, StoreError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE post_id = ?1)",
        params![post_id.to_string()],
        |row| row.get(0),
    )?)
}

fn username_taken(conn: &Connection, username: &str) -> Result<bool, StoreError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM user_info WHERE username = ?1)",
        params![username],
        |row| row.get(0),
    )?)
}

/// A UNIQUE failure on `user_info.username`. Other constraint failures
/// are real errors.
fn is_username_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == ErrorCode::ConstraintViolation && msg.contains("user_info.username")
    )
}
