use crate::api::Page;
use crate::auth::Identity;
use crate::db::Database;
use crate::error::{Entity, ServiceError};
use crate::model::{CreateSnippet, Snippet, SyncUser, User};

pub struct Snippets<'a> {
    db: &'a Database,
}

impl<'a> Snippets<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Inserts the user unless one with the same external id exists.
    /// Returns whether a row was written.
    pub async fn sync_user(&self, input: SyncUser) -> Result<bool, ServiceError> {
        let query = r#"
            INSERT INTO users (user_id, email, name)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO NOTHING
        "#;

        let inserted = self
            .db
            .connection()
            .execute(query, libsql::params![input.user_id, input.email, input.name])
            .await?;

        Ok(inserted > 0)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, ServiceError> {
        let query = r#"
            SELECT id, user_id, email, name, created_at
            FROM users WHERE user_id = ?
        "#;

        let mut rows = self.db.connection().query(query, libsql::params![user_id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(User {
                id: row.get(0)?,
                user_id: row.get(1)?,
                email: row.get(2)?,
                name: row.get(3)?,
                created_at: row.get(4)?,
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn require_user(&self, identity: &Identity) -> Result<User, ServiceError> {
        self.get_user(&identity.subject)
            .await?
            .ok_or(ServiceError::NotFound(Entity::User))
    }

    pub async fn create_snippet(&self, identity: &Identity, input: CreateSnippet) -> Result<i64, ServiceError> {
        let user = self.require_user(identity).await?;

        let query = r#"
            INSERT INTO snippets (user_id, user_name, title, language, code)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
        "#;

        let mut rows = self
            .db
            .connection()
            .query(
                query,
                libsql::params![user.user_id, user.name, input.title, input.language, input.code],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Err(anyhow::anyhow!("insert into snippets returned no id").into()),
        }
    }

    pub async fn get_snippet(&self, id: i64) -> Result<Option<Snippet>, ServiceError> {
        let query = r#"
            SELECT id, user_id, user_name, title, language, code, created_at
            FROM snippets WHERE id = ?
        "#;

        let mut rows = self.db.connection().query(query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_snippet(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn get_snippet_by_id(&self, id: i64) -> Result<Snippet, ServiceError> {
        self.get_snippet(id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Snippet))
    }

    /// Most recently inserted first.
    pub async fn list_snippets(&self, page: Page) -> Result<Vec<Snippet>, ServiceError> {
        let query = r#"
            SELECT id, user_id, user_name, title, language, code, created_at
            FROM snippets
            ORDER BY id DESC
            LIMIT ? OFFSET ?
        "#;

        let mut rows = self
            .db
            .connection()
            .query(query, libsql::params![page.limit as i64, page.offset as i64])
            .await?;
        let mut snippets = Vec::new();

        while let Some(row) = rows.next().await? {
            snippets.push(Self::row_to_snippet(&row)?);
        }

        Ok(snippets)
    }

    pub async fn delete_snippet(&self, identity: &Identity, id: i64) -> Result<(), ServiceError> {
        let snippet = self.get_snippet_by_id(id).await?;

        if snippet.user_id != identity.subject {
            return Err(ServiceError::Unauthorized(
                "only the owner can delete this snippet".to_string(),
            ));
        }

        let conn = self.db.connection();
        let _guard = self.db.begin().await?;

        let result = async {
            let comments = conn
                .execute("DELETE FROM snippet_comments WHERE snippet_id = ?", libsql::params![id])
                .await?;
            let stars = conn
                .execute("DELETE FROM stars WHERE snippet_id = ?", libsql::params![id])
                .await?;
            conn.execute("DELETE FROM snippets WHERE id = ?", libsql::params![id])
                .await?;
            tracing::debug!(snippet_id = id, comments, stars, "cascaded snippet delete");
            Ok::<(), ServiceError>(())
        }
        .await;

        self.db.finish(result).await
    }

    pub async fn star_count(&self, snippet_id: i64) -> Result<i64, ServiceError> {
        self.count("SELECT COUNT(*) FROM stars WHERE snippet_id = ?", snippet_id)
            .await
    }

    pub async fn comment_count(&self, snippet_id: i64) -> Result<i64, ServiceError> {
        self.count("SELECT COUNT(*) FROM snippet_comments WHERE snippet_id = ?", snippet_id)
            .await
    }

    async fn count(&self, query: &str, snippet_id: i64) -> Result<i64, ServiceError> {
        let mut rows = self
            .db
            .connection()
            .query(query, libsql::params![snippet_id])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    fn row_to_snippet(row: &libsql::Row) -> Result<Snippet, ServiceError> {
        Ok(Snippet {
            id: row.get(0)?,
            user_id: row.get(1)?,
            user_name: row.get(2)?,
            title: row.get(3)?,
            language: row.get(4)?,
            code: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}
