use crate::record::{
    AuthenticationRecord, CommentRecord, FollowRecord, GroupRecord, PostImageRecord, PostRecord,
    UserRecord,
};
use sqlx::{
    PgPool, Postgres, Transaction, migrate::MigrateError, postgres::PgPoolOptions, query, query_as,
    query_scalar,
};
use thiserror::Error;
use tracing::debug;
use yatube_common::{
    model::{
        Id, ModelValidationError,
        auth::{AuthTokenHash, Authentication},
        comment::{Comment, CommentMarker, CreateComment},
        follow::Follow,
        group::{CreateGroup, Group, GroupMarker},
        image::Image,
        post::{CreatePost, Post, PostFilter, PostMarker, UpdatePost},
        text::Text,
        user::{CreateUser, User, UserMarker, Username},
    },
    pagination::LimitOffset,
};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Unique constraint {} was violated", .0.as_deref().unwrap_or("<unknown>"))]
    UniqueViolation(Option<String>),
    #[error("Foreign key constraint {} was violated", .0.as_deref().unwrap_or("<unknown>"))]
    ForeignKeyViolation(Option<String>),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(database_error) = &value {
            let constraint = database_error.constraint().map(ToOwned::to_owned);
            if database_error.is_unique_violation() {
                return Self::UniqueViolation(constraint);
            }
            if database_error.is_foreign_key_violation() {
                return Self::ForeignKeyViolation(constraint);
            }
        }

        Self::Sqlx(value)
    }
}

/// Escapes `LIKE` wildcards so a search term only ever matches literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        debug!("Database migrations are up to date");

        Ok(())
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_id,
                users.username
            FROM
                users.users
            WHERE
                users.user_id = $1
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_id,
                users.username
            FROM
                users.users
            WHERE
                users.username = $1
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn begin(&self) -> Result<DbTransaction> {
        let transaction = self.pool.begin().await?;

        Ok(DbTransaction { transaction })
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                tokens.user_id,
                tokens.token_hash,
                tokens.created_at,
                tokens.expires_after_seconds
            FROM
                auth.tokens
            WHERE
                tokens.token_hash = $1
            ",
        )
        .bind(token_hash.as_bytes())
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    pub async fn fetch_groups(&self) -> Result<Vec<Group>> {
        let records = query_as::<_, GroupRecord>(
            "
            SELECT
                groups.group_id,
                groups.title,
                groups.slug,
                groups.description
            FROM
                posts.groups
            ORDER BY
                groups.group_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Group::from).collect())
    }

    pub async fn fetch_group(&self, group_id: Id<GroupMarker>) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "
            SELECT
                groups.group_id,
                groups.title,
                groups.slug,
                groups.description
            FROM
                posts.groups
            WHERE
                groups.group_id = $1
            ",
        )
        .bind(group_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Group::from))
    }

    /// Groups are managed out of band; the API only reads them.
    pub async fn create_group(&self, group: &CreateGroup) -> Result<Group> {
        let record = query_as::<_, GroupRecord>(
            "
            INSERT INTO posts.groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING group_id, title, slug, description
            ",
        )
        .bind(&group.title)
        .bind(&group.slug)
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    pub async fn count_posts(&self, filter: &PostFilter) -> Result<u64> {
        let count = query_scalar::<_, i64>(
            "
            SELECT
                COUNT(*)
            FROM
                posts.posts
            WHERE
                ($1::BIGINT IS NULL OR posts.group_id = $1)
                AND ($2::BIGINT IS NULL OR posts.user_id = $2)
            ",
        )
        .bind(filter.group.map(Id::get))
        .bind(filter.author.map(Id::get))
        .fetch_one(&self.pool)
        .await?;

        Ok(count.cast_unsigned())
    }

    /// Newest first. Without a window every matching post is returned.
    pub async fn fetch_posts(
        &self,
        filter: &PostFilter,
        window: Option<LimitOffset>,
    ) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_id,
                posts.user_id,
                users.username,
                posts.text,
                posts.pub_date,
                posts.image IS NOT NULL AS has_image,
                posts.group_id
            FROM
                posts.posts JOIN users.users USING (user_id)
            WHERE
                ($1::BIGINT IS NULL OR posts.group_id = $1)
                AND ($2::BIGINT IS NULL OR posts.user_id = $2)
            ORDER BY
                posts.pub_date DESC,
                posts.post_id DESC
            LIMIT $3
            OFFSET $4
            ",
        )
        .bind(filter.group.map(Id::get))
        .bind(filter.author.map(Id::get))
        .bind(window.map(|window| i64::from(window.limit)))
        .bind(window.map(|window| i64::from(window.offset)))
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_id,
                posts.user_id,
                users.username,
                posts.text,
                posts.pub_date,
                posts.image IS NOT NULL AS has_image,
                posts.group_id
            FROM
                posts.posts JOIN users.users USING (user_id)
            WHERE
                posts.post_id = $1
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// `None` both for unknown posts and for posts without an image.
    pub async fn fetch_post_image(&self, post_id: Id<PostMarker>) -> Result<Option<Image>> {
        let record = query_as::<_, PostImageRecord>(
            "
            SELECT
                posts.image,
                posts.image_content_type
            FROM
                posts.posts
            WHERE
                posts.post_id = $1
                AND posts.image IS NOT NULL
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Image::from))
    }

    /// Fails with [`DbError::ForeignKeyViolation`] if the group vanished in the meantime.
    pub async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let post_id = query_scalar::<_, i64>(
            "
            INSERT INTO posts.posts (user_id, text, image, image_content_type, group_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING post_id
            ",
        )
        .bind(post.author.get())
        .bind(post.text.get())
        .bind(post.image.as_ref().map(|image| image.bytes.as_slice()))
        .bind(post.image.as_ref().map(|image| image.content_type.as_str()))
        .bind(post.group.map(Id::get))
        .fetch_one(&self.pool)
        .await?;

        Ok(post_id.into())
    }

    pub async fn update_post(&self, post_id: Id<PostMarker>, update: &UpdatePost) -> Result<()> {
        let new_image = update.image.as_ref().map(Option::as_ref);

        query(
            "
            UPDATE posts.posts
            SET
                text = COALESCE($2, text),
                group_id = CASE WHEN $3 THEN $4 ELSE group_id END,
                image = CASE WHEN $5 THEN $6 ELSE image END,
                image_content_type = CASE WHEN $5 THEN $7 ELSE image_content_type END
            WHERE
                post_id = $1
            ",
        )
        .bind(post_id.get())
        .bind(update.text.as_ref().map(Text::get))
        .bind(update.group.is_some())
        .bind(update.group.flatten().map(Id::get))
        .bind(new_image.is_some())
        .bind(new_image.flatten().map(|image| image.bytes.as_slice()))
        .bind(new_image.flatten().map(|image| image.content_type.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()> {
        query("DELETE FROM posts.posts WHERE post_id = $1")
            .bind(post_id.get())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Oldest first.
    pub async fn fetch_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_id,
                comments.post_id,
                comments.user_id,
                users.username,
                comments.text,
                comments.created
            FROM
                posts.comments JOIN users.users USING (user_id)
            WHERE
                comments.post_id = $1
            ORDER BY
                comments.created,
                comments.comment_id
            ",
        )
        .bind(post_id.get())
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    pub async fn fetch_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_id,
                comments.post_id,
                comments.user_id,
                users.username,
                comments.text,
                comments.created
            FROM
                posts.comments JOIN users.users USING (user_id)
            WHERE
                comments.post_id = $1
                AND comments.comment_id = $2
            ",
        )
        .bind(post_id.get())
        .bind(comment_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    pub async fn create_comment(&self, comment: &CreateComment) -> Result<Id<CommentMarker>> {
        let comment_id = query_scalar::<_, i64>(
            "
            INSERT INTO posts.comments (post_id, user_id, text)
            VALUES ($1, $2, $3)
            RETURNING comment_id
            ",
        )
        .bind(comment.post.get())
        .bind(comment.author.get())
        .bind(comment.text.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(comment_id.into())
    }

    pub async fn update_comment(&self, comment_id: Id<CommentMarker>, text: &Text) -> Result<()> {
        query("UPDATE posts.comments SET text = $2 WHERE comment_id = $1")
            .bind(comment_id.get())
            .bind(text.get())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<()> {
        query("DELETE FROM posts.comments WHERE comment_id = $1")
            .bind(comment_id.get())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Follows of `user` whose followed username contains every one of `search_terms`,
    /// ignoring case.
    pub async fn fetch_follows(
        &self,
        user_id: Id<UserMarker>,
        search_terms: &[String],
    ) -> Result<Vec<Follow>> {
        let patterns: Vec<String> = search_terms
            .iter()
            .map(|term| contains_pattern(term))
            .collect();

        let records = query_as::<_, FollowRecord>(
            "
            SELECT
                users.username,
                following.username AS following_username
            FROM
                users.follows
                JOIN users.users ON users.user_id = follows.user_id
                JOIN users.users AS following ON following.user_id = follows.following_id
            WHERE
                follows.user_id = $1
                AND following.username ILIKE ALL($2)
            ORDER BY
                follows.follow_id
            ",
        )
        .bind(user_id.get())
        .bind(patterns)
        .fetch_all(&self.pool)
        .await?;

        let follows = records
            .into_iter()
            .map(Follow::try_from)
            .collect::<Result<_, _>>()?;
        Ok(follows)
    }

    pub async fn follow_exists(
        &self,
        user_id: Id<UserMarker>,
        following_id: Id<UserMarker>,
    ) -> Result<bool> {
        let exists = query_scalar::<_, bool>(
            "
            SELECT EXISTS (
                SELECT 1 FROM users.follows WHERE user_id = $1 AND following_id = $2
            )
            ",
        )
        .bind(user_id.get())
        .bind(following_id.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Fails with [`DbError::UniqueViolation`] if the pair already exists.
    pub async fn create_follow(
        &self,
        user_id: Id<UserMarker>,
        following_id: Id<UserMarker>,
    ) -> Result<()> {
        query("INSERT INTO users.follows (user_id, following_id) VALUES ($1, $2)")
            .bind(user_id.get())
            .bind(following_id.get())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Registration writes that only make sense together. Dropping the transaction without calling
/// [`DbTransaction::commit`] rolls all of them back.
pub struct DbTransaction {
    transaction: Transaction<'static, Postgres>,
}

impl DbTransaction {
    /// Fails with [`DbError::UniqueViolation`] if the username is taken.
    pub async fn create_user(&mut self, user: &CreateUser) -> Result<User> {
        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (username)
            VALUES ($1)
            RETURNING user_id, username
            ",
        )
        .bind(user.username.get())
        .fetch_one(&mut *self.transaction)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn create_auth(&mut self, authentication: &Authentication) -> Result<()> {
        query(
            "
            INSERT INTO auth.tokens (token_hash, user_id, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(authentication.token_hash.as_bytes())
        .bind(authentication.user.get())
        .bind(authentication.created_at)
        .bind(
            authentication
                .expires_after
                .map(|lifetime| lifetime.whole_seconds()),
        )
        .execute(&mut *self.transaction)
        .await?;

        Ok(())
    }

    pub async fn commit(self) -> Result<()> {
        self.transaction.commit().await?;

        Ok(())
    }
}
