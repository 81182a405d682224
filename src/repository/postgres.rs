use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, query_builder::QueryBuilder};

use super::{
    BookmarkRepository, DEFAULT_COLLECTION_PAGE_SIZE, DEFAULT_PAGE_SIZE, FollowRepository,
    GroupMemberRepository, GroupRepository, JoinRequestRepository, LikeRepository,
    ListFollowerRepository, ListMemberRepository, ListRepository, PageOptions, PostRepository,
    UserRepository,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Bookmark, Follow, Group, GroupChanges, GroupJoinRequest, GroupMember, Like, List,
    ListChanges, ListFollower, ListMember, NewGroup, NewList, NewPost, NewUser, Post, User,
    UserChanges,
};

/// PostgresRepository
///
/// Every gateway, backed by one shared `PgPool`. The pool is built and closed by
/// `main`; this type only borrows connections from it.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends `ORDER BY .. LIMIT .. OFFSET ..` for `options`. `alias` prefixes
/// the column names (`"g."`) when the query joins or correlates tables.
fn push_page(
    builder: &mut QueryBuilder<'_, Postgres>,
    options: &PageOptions,
    default_size: u32,
    alias: &str,
) {
    let direction = options.order_by.as_sql();
    builder.push(format!(
        " ORDER BY {alias}{} {direction}, {alias}id {direction}",
        options.order_by_field.column()
    ));
    builder.push(" LIMIT ");
    builder.push_bind(options.limit(default_size));
    builder.push(" OFFSET ");
    builder.push_bind(options.offset(default_size));
}

/// Restricts the query to `options.ids` when an id lookup was requested.
fn push_ids(builder: &mut QueryBuilder<'_, Postgres>, options: &PageOptions, alias: &str) {
    if let Some(ids) = &options.ids {
        builder.push(format!(" AND {alias}id = ANY("));
        builder.push_bind(ids.clone());
        builder.push(")");
    }
}

/// Maps a unique violation to `BadRequest("<what> already exists")`.
fn conflict(err: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::bad_request(format!("{what} already exists"));
        }
    }
    AppError::Database(err)
}

#[derive(Clone, Copy)]
enum PostScope {
    Author,
    Group,
}

impl PostScope {
    fn column(self) -> &'static str {
        match self {
            PostScope::Author => "author_id",
            PostScope::Group => "group_id",
        }
    }
}

/// Soft-deletes every live post in `scope`, handing the removed replies back
/// to their parents' `comments_count`.
async fn soft_delete_posts(conn: &mut PgConnection, scope: PostScope, id: i32) -> AppResult<u64> {
    let column = scope.column();

    sqlx::query(&format!(
        r#"
        UPDATE posts p
        SET comments_count = GREATEST(p.comments_count - c.removed, 0)
        FROM (
            SELECT parent_post_id, COUNT(*)::INT AS removed
            FROM posts
            WHERE {column} = $1 AND deleted_at IS NULL AND parent_post_id IS NOT NULL
            GROUP BY parent_post_id
        ) c
        WHERE p.id = c.parent_post_id
        "#
    ))
    .bind(id)
    .execute(&mut *conn)
    .await?;

    let result = sqlx::query(&format!(
        "UPDATE posts SET deleted_at = NOW() WHERE {column} = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

// --- Users ---

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, user_tag, password, user_name, biography)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user.email)
        .bind(user.user_tag)
        .bind(user.password_hash)
        .bind(user.user_name)
        .bind(user.biography)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict(e, "User"))
    }

    /// Uses `COALESCE` so that only the `Some` fields of `changes` are written.
    /// A new password bumps the token version in the same statement.
    async fn update(&self, id: i32, changes: UserChanges) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                user_tag = COALESCE($3, user_tag),
                user_name = COALESCE($4, user_name),
                biography = COALESCE($5, biography),
                avatar = COALESCE($6, avatar),
                password = COALESCE($7, password),
                token_version = CASE WHEN $7::TEXT IS NULL THEN token_version ELSE token_version + 1 END,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.email)
        .bind(changes.user_tag)
        .bind(changes.user_name)
        .bind(changes.biography)
        .bind(changes.avatar)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict(e, "User"))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = NOW(), token_version = token_version + 1
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_all(&self, options: &PageOptions) -> AppResult<Vec<User>> {
        let mut builder = QueryBuilder::new("SELECT * FROM users WHERE deleted_at IS NULL");
        push_ids(&mut builder, options, "");
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<User>().fetch_all(&self.pool).await?)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>(
                "SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL",
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?,
        )
    }

    async fn find_by_user_tag(&self, user_tag: &str) -> AppResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>(
                "SELECT * FROM users WHERE user_tag = $1 AND deleted_at IS NULL",
            )
            .bind(user_tag)
            .fetch_optional(&self.pool)
            .await?,
        )
    }

    async fn increment_token_version(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET token_version = token_version + 1, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- Posts ---

#[async_trait]
impl PostRepository for PostgresRepository {
    async fn create(&self, post: NewPost) -> AppResult<Post> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (content, author_id, parent_post_id, original_post_id, is_repost, group_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(post.content)
        .bind(post.author_id)
        .bind(post.parent_post_id)
        .bind(post.original_post_id)
        .bind(post.is_repost)
        .bind(post.group_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(parent_id) = created.parent_post_id {
            sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
                .bind(parent_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, id: i32, content: String) -> AppResult<Option<Post>> {
        Ok(sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET content = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted: Option<Option<i32>> = sqlx::query_scalar(
            r#"
            UPDATE posts SET deleted_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING parent_post_id
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(parent) = deleted else {
            return Ok(false);
        };

        if let Some(parent_id) = parent {
            sqlx::query(
                "UPDATE posts SET comments_count = GREATEST(comments_count - 1, 0) WHERE id = $1",
            )
            .bind(parent_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_all_of_user(&self, user_id: i32) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;
        let removed = soft_delete_posts(&mut *tx, PostScope::Author, user_id).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn delete_all_of_group(&self, group_id: i32) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;
        let removed = soft_delete_posts(&mut *tx, PostScope::Group, group_id).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<Post>> {
        Ok(
            sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_all(&self, options: &PageOptions) -> AppResult<Vec<Post>> {
        let mut builder = QueryBuilder::new("SELECT * FROM posts WHERE deleted_at IS NULL");
        if options.ids.is_some() {
            push_ids(&mut builder, options, "");
        } else {
            builder.push(" AND group_id IS NULL");
        }
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<Post>().fetch_all(&self.pool).await?)
    }

    async fn find_all_of_user(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Post>> {
        let mut builder = QueryBuilder::new(
            "SELECT * FROM posts WHERE deleted_at IS NULL AND group_id IS NULL AND author_id = ",
        );
        builder.push_bind(user_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<Post>().fetch_all(&self.pool).await?)
    }

    async fn find_all_of_group(
        &self,
        group_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Post>> {
        let mut builder =
            QueryBuilder::new("SELECT * FROM posts WHERE deleted_at IS NULL AND group_id = ");
        builder.push_bind(group_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<Post>().fetch_all(&self.pool).await?)
    }

    async fn find_children_of_post(
        &self,
        post_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Post>> {
        let mut builder =
            QueryBuilder::new("SELECT * FROM posts WHERE deleted_at IS NULL AND parent_post_id = ");
        builder.push_bind(post_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<Post>().fetch_all(&self.pool).await?)
    }
}

// --- Likes ---

#[async_trait]
impl LikeRepository for PostgresRepository {
    async fn create(&self, user_id: i32, post_id: i32) -> AppResult<Like> {
        let mut tx = self.pool.begin().await?;

        let like = sqlx::query_as::<_, Like>(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict(e, "Like"))?;

        sqlx::query("UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(like)
    }

    async fn delete(&self, user_id: i32, post_id: i32) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE posts SET likes_count = GREATEST(likes_count - 1, 0) WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn find_by_user_and_post(&self, user_id: i32, post_id: i32) -> AppResult<Option<Like>> {
        Ok(
            sqlx::query_as::<_, Like>("SELECT * FROM likes WHERE user_id = $1 AND post_id = $2")
                .bind(user_id)
                .bind(post_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_all_of_user(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Like>> {
        let mut builder = QueryBuilder::new("SELECT * FROM likes WHERE user_id = ");
        builder.push_bind(user_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<Like>().fetch_all(&self.pool).await?)
    }

    async fn find_all_of_post(&self, post_id: i32, options: &PageOptions) -> AppResult<Vec<Like>> {
        let mut builder = QueryBuilder::new("SELECT * FROM likes WHERE post_id = ");
        builder.push_bind(post_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<Like>().fetch_all(&self.pool).await?)
    }
}

// --- Bookmarks ---

#[async_trait]
impl BookmarkRepository for PostgresRepository {
    async fn create(&self, user_id: i32, post_id: i32) -> AppResult<Bookmark> {
        sqlx::query_as::<_, Bookmark>(
            "INSERT INTO bookmarks (user_id, post_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict(e, "Bookmark"))
    }

    async fn delete(&self, user_id: i32, post_id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_user_and_post(
        &self,
        user_id: i32,
        post_id: i32,
    ) -> AppResult<Option<Bookmark>> {
        Ok(sqlx::query_as::<_, Bookmark>(
            "SELECT * FROM bookmarks WHERE user_id = $1 AND post_id = $2",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_all_of_user(
        &self,
        user_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Bookmark>> {
        let mut builder = QueryBuilder::new("SELECT * FROM bookmarks WHERE user_id = ");
        builder.push_bind(user_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<Bookmark>().fetch_all(&self.pool).await?)
    }
}

// --- Follows ---

#[async_trait]
impl FollowRepository for PostgresRepository {
    async fn create(&self, follower_id: i32, following_id: i32) -> AppResult<Follow> {
        sqlx::query_as::<_, Follow>(
            "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict(e, "Follow"))
    }

    async fn delete(&self, follower_id: i32, following_id: i32) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower_id)
                .bind(following_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_pair(&self, follower_id: i32, following_id: i32) -> AppResult<Option<Follow>> {
        Ok(sqlx::query_as::<_, Follow>(
            "SELECT * FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_followers(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Follow>> {
        let mut builder = QueryBuilder::new("SELECT * FROM follows WHERE following_id = ");
        builder.push_bind(user_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<Follow>().fetch_all(&self.pool).await?)
    }

    async fn find_following(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Follow>> {
        let mut builder = QueryBuilder::new("SELECT * FROM follows WHERE follower_id = ");
        builder.push_bind(user_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<Follow>().fetch_all(&self.pool).await?)
    }
}

// --- Groups ---

#[async_trait]
impl GroupRepository for PostgresRepository {
    async fn create(&self, group: NewGroup) -> AppResult<Group> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (name, description, is_private, creator_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(group.name)
        .bind(group.description)
        .bind(group.is_private)
        .bind(group.creator_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO group_members (group_id, user_id, created_by_id) VALUES ($1, $2, $2)",
        )
        .bind(created.id)
        .bind(created.creator_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, id: i32, changes: GroupChanges) -> AppResult<Option<Group>> {
        Ok(sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                is_private = COALESCE($4, is_private),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.is_private)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM group_members WHERE group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM group_join_requests WHERE group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        soft_delete_posts(&mut *tx, PostScope::Group, id).await?;

        let result = sqlx::query(
            "UPDATE groups SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls the cascade back.
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<Group>> {
        Ok(
            sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Visibility is decided in SQL so that pages stay full.
    async fn find_visible(
        &self,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Group>> {
        let mut builder = QueryBuilder::new(
            r#"
            SELECT g.* FROM groups g
            WHERE g.deleted_at IS NULL
              AND (g.is_private = FALSE OR EXISTS (
                    SELECT 1 FROM group_members m WHERE m.group_id = g.id AND m.user_id = "#,
        );
        builder.push_bind(requester_id);
        builder.push("))");
        push_ids(&mut builder, options, "g.");
        push_page(&mut builder, options, DEFAULT_COLLECTION_PAGE_SIZE, "g.");
        Ok(builder.build_query_as::<Group>().fetch_all(&self.pool).await?)
    }

    async fn find_by_member(
        &self,
        user_id: i32,
        viewer_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Group>> {
        let mut builder = QueryBuilder::new(
            r#"
            SELECT g.* FROM groups g
            JOIN group_members m ON m.group_id = g.id
            WHERE g.deleted_at IS NULL AND m.user_id = "#,
        );
        builder.push_bind(user_id);
        builder.push(
            r#"
              AND (g.is_private = FALSE OR EXISTS (
                    SELECT 1 FROM group_members v WHERE v.group_id = g.id AND v.user_id = "#,
        );
        builder.push_bind(viewer_id);
        builder.push("))");
        push_page(&mut builder, options, DEFAULT_COLLECTION_PAGE_SIZE, "g.");
        Ok(builder.build_query_as::<Group>().fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl GroupMemberRepository for PostgresRepository {
    async fn delete(&self, user_id: i32, group_id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM group_members WHERE user_id = $1 AND group_id = $2")
            .bind(user_id)
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_user_and_group(
        &self,
        user_id: i32,
        group_id: i32,
    ) -> AppResult<Option<GroupMember>> {
        Ok(sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM group_members WHERE user_id = $1 AND group_id = $2",
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_all(&self, group_id: i32, options: &PageOptions) -> AppResult<Vec<GroupMember>> {
        let mut builder = QueryBuilder::new("SELECT * FROM group_members WHERE group_id = ");
        builder.push_bind(group_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<GroupMember>().fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl JoinRequestRepository for PostgresRepository {
    async fn create(&self, user_id: i32, group_id: i32) -> AppResult<GroupJoinRequest> {
        sqlx::query_as::<_, GroupJoinRequest>(
            "INSERT INTO group_join_requests (user_id, group_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict(e, "Join request"))
    }

    async fn delete(&self, user_id: i32, group_id: i32) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM group_join_requests WHERE user_id = $1 AND group_id = $2")
                .bind(user_id)
                .bind(group_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_user_and_group(
        &self,
        user_id: i32,
        group_id: i32,
    ) -> AppResult<Option<GroupJoinRequest>> {
        Ok(sqlx::query_as::<_, GroupJoinRequest>(
            "SELECT * FROM group_join_requests WHERE user_id = $1 AND group_id = $2",
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_all(
        &self,
        group_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<GroupJoinRequest>> {
        let mut builder = QueryBuilder::new("SELECT * FROM group_join_requests WHERE group_id = ");
        builder.push_bind(group_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<GroupJoinRequest>().fetch_all(&self.pool).await?)
    }

    async fn find_all_by_user(
        &self,
        user_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<GroupJoinRequest>> {
        let mut builder = QueryBuilder::new("SELECT * FROM group_join_requests WHERE user_id = ");
        builder.push_bind(user_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<GroupJoinRequest>().fetch_all(&self.pool).await?)
    }

    async fn accept(
        &self,
        user_id: i32,
        group_id: i32,
        accepted_by: i32,
    ) -> AppResult<GroupMember> {
        let mut tx = self.pool.begin().await?;

        let removed =
            sqlx::query("DELETE FROM group_join_requests WHERE user_id = $1 AND group_id = $2")
                .bind(user_id)
                .bind(group_id)
                .execute(&mut *tx)
                .await?;

        if removed.rows_affected() == 0 {
            return Err(AppError::not_found("Join request not found"));
        }

        let member = sqlx::query_as::<_, GroupMember>(
            r#"
            INSERT INTO group_members (group_id, user_id, created_by_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(accepted_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict(e, "Group member"))?;

        tx.commit().await?;
        Ok(member)
    }
}

// --- Lists ---

#[async_trait]
impl ListRepository for PostgresRepository {
    async fn create(&self, list: NewList) -> AppResult<List> {
        Ok(sqlx::query_as::<_, List>(
            r#"
            INSERT INTO lists (name, description, is_private, creator_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(list.name)
        .bind(list.description)
        .bind(list.is_private)
        .bind(list.creator_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update(&self, id: i32, changes: ListChanges) -> AppResult<Option<List>> {
        Ok(sqlx::query_as::<_, List>(
            r#"
            UPDATE lists
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                is_private = COALESCE($4, is_private),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.is_private)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM list_members WHERE list_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM list_followers WHERE list_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM lists WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<List>> {
        Ok(sqlx::query_as::<_, List>("SELECT * FROM lists WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_visible(&self, requester_id: i32, options: &PageOptions) -> AppResult<Vec<List>> {
        let mut builder =
            QueryBuilder::new("SELECT * FROM lists WHERE (is_private = FALSE OR creator_id = ");
        builder.push_bind(requester_id);
        builder.push(")");
        push_ids(&mut builder, options, "");
        push_page(&mut builder, options, DEFAULT_COLLECTION_PAGE_SIZE, "");
        Ok(builder.build_query_as::<List>().fetch_all(&self.pool).await?)
    }

    async fn find_by_creator(
        &self,
        creator_id: i32,
        viewer_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<List>> {
        let mut builder = QueryBuilder::new("SELECT * FROM lists WHERE creator_id = ");
        builder.push_bind(creator_id);
        builder.push(" AND (is_private = FALSE OR creator_id = ");
        builder.push_bind(viewer_id);
        builder.push(")");
        push_page(&mut builder, options, DEFAULT_COLLECTION_PAGE_SIZE, "");
        Ok(builder.build_query_as::<List>().fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl ListMemberRepository for PostgresRepository {
    async fn create(&self, user_id: i32, list_id: i32) -> AppResult<ListMember> {
        sqlx::query_as::<_, ListMember>(
            "INSERT INTO list_members (user_id, list_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(list_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict(e, "List member"))
    }

    async fn delete(&self, user_id: i32, list_id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM list_members WHERE user_id = $1 AND list_id = $2")
            .bind(user_id)
            .bind(list_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_user_and_list(
        &self,
        user_id: i32,
        list_id: i32,
    ) -> AppResult<Option<ListMember>> {
        Ok(sqlx::query_as::<_, ListMember>(
            "SELECT * FROM list_members WHERE user_id = $1 AND list_id = $2",
        )
        .bind(user_id)
        .bind(list_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_all(&self, list_id: i32, options: &PageOptions) -> AppResult<Vec<ListMember>> {
        let mut builder = QueryBuilder::new("SELECT * FROM list_members WHERE list_id = ");
        builder.push_bind(list_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<ListMember>().fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl ListFollowerRepository for PostgresRepository {
    async fn create(&self, user_id: i32, list_id: i32) -> AppResult<ListFollower> {
        sqlx::query_as::<_, ListFollower>(
            "INSERT INTO list_followers (user_id, list_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(list_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict(e, "List follower"))
    }

    async fn delete(&self, user_id: i32, list_id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM list_followers WHERE user_id = $1 AND list_id = $2")
            .bind(user_id)
            .bind(list_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_user_and_list(
        &self,
        user_id: i32,
        list_id: i32,
    ) -> AppResult<Option<ListFollower>> {
        Ok(sqlx::query_as::<_, ListFollower>(
            "SELECT * FROM list_followers WHERE user_id = $1 AND list_id = $2",
        )
        .bind(user_id)
        .bind(list_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_all(&self, list_id: i32, options: &PageOptions) -> AppResult<Vec<ListFollower>> {
        let mut builder = QueryBuilder::new("SELECT * FROM list_followers WHERE list_id = ");
        builder.push_bind(list_id);
        push_page(&mut builder, options, DEFAULT_PAGE_SIZE, "");
        Ok(builder.build_query_as::<ListFollower>().fetch_all(&self.pool).await?)
    }
}
