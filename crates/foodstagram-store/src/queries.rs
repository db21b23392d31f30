//! Read operations: rebuilding the social graph from relational rows.
//!
//! A load runs a fixed sequence of passes inside one read transaction:
//! users, category likes, follows, posts with their recipes, then post likes
//! and comments. Each pass only dereferences entities created by an earlier
//! one, and any reference that does not resolve aborts the load with an
//! [`IntegrityError`](foodstagram_core::IntegrityError).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use foodstagram_core::{
    Comment, CommentId, IntegrityError, Ingredient, Post, PostId, Recipe, RecipeId, SocialGraph,
    User, UserId,
};

use crate::client::{SqliteStore, StoreError};

/// A `likes` row. Read once per load and used by two passes.
struct LikeRow {
    user_id: UserId,
    post_id: PostId,
    category: String,
}

impl SqliteStore {
    // ── Snapshot Loads ───────────────────────────────────────────

    /// Load every user and post as one consistent snapshot.
    pub fn load_graph(&self) -> Result<SocialGraph, StoreError> {
        let tx = self.read_txn()?;
        let mut graph = SocialGraph::new();

        load_users(&tx, &mut graph)?;
        let likes = read_likes(&tx)?;
        for like in &likes {
            graph.record_category_like(&like.user_id, &like.post_id, &like.category)?;
        }
        load_follows(&tx, &mut graph)?;
        load_posts(&tx, &mut graph)?;
        for like in &likes {
            graph.attach_like(&like.user_id, &like.post_id)?;
        }
        load_comments(&tx, &mut graph)?;

        tx.commit()?;
        tracing::debug!(
            users = graph.user_count(),
            posts = graph.post_count(),
            likes = likes.len(),
            "Loaded social graph"
        );
        Ok(graph)
    }

    /// All users, with followers, following, like history and post ids.
    pub fn load_all_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.load_graph()?.into_users())
    }

    /// All posts with recipes, likes and comments, oldest first.
    pub fn load_all_posts(&self) -> Result<Vec<Post>, StoreError> {
        Ok(self.load_graph()?.into_posts())
    }

    // ── Single Lookups ───────────────────────────────────────────

    /// Look up a user row by username (the login lookup).
    ///
    /// Only the `user_info` columns are filled in; relationship fields are
    /// empty. Use [`load_graph`](Self::load_graph) for the linked view.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = self
            .connection()
            .query_row(
                "SELECT user_id, username, password, bio FROM user_info WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, username, password, bio)) => {
                let id = UserId(parse_uuid("user_info", "user_id", &id)?);
                Ok(Some(User::new(id, username, password, bio)))
            }
            None => Ok(None),
        }
    }

    /// Count rows in one of the schema tables.
    pub fn count_rows(&self, table: Table) -> Result<i64, StoreError> {
        let sql = format!("SELECT count(*) FROM {}", table.name());
        Ok(self.connection().query_row(&sql, [], |row| row.get(0))?)
    }
}

/// The tables of the Foodstagram schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    UserInfo,
    Likes,
    Follows,
    Posts,
    Recipes,
    RecipeIngredients,
    RecipeSteps,
    Comments,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::UserInfo,
        Table::Likes,
        Table::Follows,
        Table::Posts,
        Table::Recipes,
        Table::RecipeIngredients,
        Table::RecipeSteps,
        Table::Comments,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::UserInfo => "user_info",
            Table::Likes => "likes",
            Table::Follows => "follows",
            Table::Posts => "posts",
            Table::Recipes => "recipes",
            Table::RecipeIngredients => "recipe_ingredients",
            Table::RecipeSteps => "recipes_steps",
            Table::Comments => "comments",
        }
    }
}

// ── Passes ───────────────────────────────────────────────────────

fn load_users(conn: &Connection, graph: &mut SocialGraph) -> Result<(), StoreError> {
    let mut stmt = conn.prepare_cached("SELECT user_id, username, password, bio FROM user_info")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;
    for row in rows {
        let (id, username, password, bio) = row?;
        let id = UserId(parse_uuid("user_info", "user_id", &id)?);
        graph.insert_user(User::new(id, username, password, bio));
    }
    Ok(())
}

fn read_likes(conn: &Connection) -> Result<Vec<LikeRow>, StoreError> {
    let mut stmt = conn.prepare_cached("SELECT user_id, post_id, category FROM likes")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    let mut likes = Vec::new();
    for row in rows {
        let (user_id, post_id, category) = row?;
        likes.push(LikeRow {
            user_id: UserId(parse_uuid("likes", "user_id", &user_id)?),
            post_id: PostId(parse_uuid("likes", "post_id", &post_id)?),
            category,
        });
    }
    Ok(likes)
}

fn load_follows(conn: &Connection, graph: &mut SocialGraph) -> Result<(), StoreError> {
    let mut stmt = conn.prepare_cached("SELECT user_id, follower_id FROM follows")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (user_id, follower_id) = row?;
        let user_id = UserId(parse_uuid("follows", "user_id", &user_id)?);
        let follower_id = UserId(parse_uuid("follows", "follower_id", &follower_id)?);
        graph.link_follow(&user_id, &follower_id)?;
    }
    Ok(())
}

fn load_posts(conn: &Connection, graph: &mut SocialGraph) -> Result<(), StoreError> {
    let mut ingredients = read_ingredients(conn)?;
    let mut steps = read_steps(conn)?;

    let mut stmt = conn.prepare_cached(
        "SELECT p.post_id, p.user_id, p.recipe_id, p.category, p.posted_time, r.title
         FROM posts p
         LEFT JOIN recipes r ON r.recipe_id = p.recipe_id
         ORDER BY p.posted_time, p.post_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, DateTime<Utc>>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    for row in rows {
        let (post_id, user_id, recipe_id, category, posted_time, title) = row?;
        let post_id = PostId(parse_uuid("posts", "post_id", &post_id)?);
        let owner = UserId(parse_uuid("posts", "user_id", &user_id)?);
        let recipe_id = RecipeId(parse_uuid("posts", "recipe_id", &recipe_id)?);

        let Some(title) = title else {
            return Err(IntegrityError::new(
                "posts",
                format!("post_id={post_id}, recipe_id={recipe_id}"),
                "recipe_id",
                recipe_id,
            )
            .into());
        };

        let recipe = Recipe {
            id: recipe_id,
            title,
            steps: steps.remove(&recipe_id).unwrap_or_default(),
            ingredients: ingredients.remove(&recipe_id).unwrap_or_default(),
        };
        let mut post = Post::new(owner, recipe, category, posted_time);
        post.id = post_id;
        graph.attach_post(post)?;
    }

    let orphans = ingredients.len() + steps.len();
    if orphans > 0 {
        tracing::warn!(
            recipes = orphans,
            "Ignoring ingredient or step rows of recipes no post refers to"
        );
    }
    Ok(())
}

fn read_ingredients(conn: &Connection) -> Result<HashMap<RecipeId, Vec<Ingredient>>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT recipe_id, ingredient_name, ingredient_count, ingredient_amount,
                ingredient_measurement
         FROM recipe_ingredients
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<f64>>(2)?,
            row.get::<_, Option<f64>>(3)?,
            row.get::<_, Option<String>>(4)?,
        ))
    })?;

    let mut by_recipe: HashMap<RecipeId, Vec<Ingredient>> = HashMap::new();
    for row in rows {
        let (recipe_id, name, count, amount, unit) = row?;
        let recipe_id = RecipeId(parse_uuid("recipe_ingredients", "recipe_id", &recipe_id)?);
        let ingredient = match (count, amount, unit) {
            (Some(count), None, None) => Ingredient::Countable { name, count },
            (None, Some(amount), Some(unit)) => Ingredient::Measurable { name, amount, unit },
            _ => {
                return Err(StoreError::Corrupt {
                    table: "recipe_ingredients",
                    reason: format!(
                        "ingredient {name:?} of recipe {recipe_id} is neither countable nor measurable"
                    ),
                })
            }
        };
        by_recipe.entry(recipe_id).or_default().push(ingredient);
    }
    Ok(by_recipe)
}

fn read_steps(conn: &Connection) -> Result<HashMap<RecipeId, Vec<String>>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT recipe_id, step_text FROM recipes_steps ORDER BY recipe_id, step_number",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut by_recipe: HashMap<RecipeId, Vec<String>> = HashMap::new();
    for row in rows {
        let (recipe_id, text) = row?;
        let recipe_id = RecipeId(parse_uuid("recipes_steps", "recipe_id", &recipe_id)?);
        by_recipe.entry(recipe_id).or_default().push(text);
    }
    Ok(by_recipe)
}

fn load_comments(conn: &Connection, graph: &mut SocialGraph) -> Result<(), StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT comment_id, user_id, post_id, comment_time, comment_text
         FROM comments
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, DateTime<Utc>>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;
    for row in rows {
        let (comment_id, user_id, post_id, created_time, text) = row?;
        let comment = Comment {
            id: CommentId(parse_uuid("comments", "comment_id", &comment_id)?),
            author_id: UserId(parse_uuid("comments", "user_id", &user_id)?),
            created_time,
            text,
        };
        let post_id = PostId(parse_uuid("comments", "post_id", &post_id)?);
        graph.attach_comment(&post_id, comment)?;
    }
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────

pub(crate) fn parse_uuid(table: &'static str, column: &str, raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt {
        table,
        reason: format!("{column} {raw:?} is not a valid id: {e}"),
    })
}
