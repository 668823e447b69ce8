use crate::api::Page;
use crate::auth::Identity;
use crate::db::Database;
use crate::error::{Entity, ServiceError};
use crate::model::Comment;

use super::Snippets;

/// Stars and comments on snippets.
pub struct Engagement<'a> {
    db: &'a Database,
    snippets: Snippets<'a>,
}

impl<'a> Engagement<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            snippets: Snippets::new(db),
        }
    }

    /// Call with the transaction open so a concurrent delete cannot slip in
    /// between the check and the write.
    async fn require_snippet(&self, snippet_id: i64) -> Result<(), ServiceError> {
        let mut rows = self
            .db
            .connection()
            .query("SELECT 1 FROM snippets WHERE id = ?", libsql::params![snippet_id])
            .await?;

        match rows.next().await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(Entity::Snippet)),
        }
    }

    /// Flips the caller's star on a snippet and returns the new state.
    pub async fn toggle_star(&self, identity: &Identity, snippet_id: i64) -> Result<bool, ServiceError> {
        self.snippets.require_user(identity).await?;

        let conn = self.db.connection();
        let _guard = self.db.begin().await?;

        let result: Result<bool, ServiceError> = async {
            self.require_snippet(snippet_id).await?;

            let removed = conn
                .execute(
                    "DELETE FROM stars WHERE user_id = ? AND snippet_id = ?",
                    libsql::params![identity.subject.as_str(), snippet_id],
                )
                .await?;
            if removed > 0 {
                return Ok(false);
            }

            conn.execute(
                "INSERT OR IGNORE INTO stars (user_id, snippet_id) VALUES (?, ?)",
                libsql::params![identity.subject.as_str(), snippet_id],
            )
            .await?;
            Ok(true)
        }
        .await;

        self.db.finish(result).await
    }

    /// Anonymous callers never have stars.
    pub async fn is_starred(&self, identity: Option<&Identity>, snippet_id: i64) -> Result<bool, ServiceError> {
        let Some(identity) = identity else {
            return Ok(false);
        };

        let mut rows = self
            .db
            .connection()
            .query(
                "SELECT 1 FROM stars WHERE user_id = ? AND snippet_id = ? LIMIT 1",
                libsql::params![identity.subject.as_str(), snippet_id],
            )
            .await?;

        Ok(rows.next().await?.is_some())
    }

    pub async fn add_comment(&self, identity: &Identity, snippet_id: i64, content: &str) -> Result<i64, ServiceError> {
        let user = self.snippets.require_user(identity).await?;

        if content.trim().is_empty() {
            return Err(ServiceError::BadRequest("comment content is empty".to_string()));
        }

        let query = r#"
            INSERT INTO snippet_comments (snippet_id, user_id, user_name, content)
            VALUES (?, ?, ?, ?)
            RETURNING id
        "#;

        let conn = self.db.connection();
        let _guard = self.db.begin().await?;

        let result: Result<i64, ServiceError> = async {
            self.require_snippet(snippet_id).await?;

            let mut rows = conn
                .query(query, libsql::params![snippet_id, user.user_id.as_str(), user.name.as_str(), content])
                .await?;

            match rows.next().await? {
                Some(row) => Ok(row.get(0)?),
                None => Err(anyhow::anyhow!("insert into snippet_comments returned no id").into()),
            }
        }
        .await;

        self.db.finish(result).await
    }

    pub async fn get_comment(&self, id: i64) -> Result<Option<Comment>, ServiceError> {
        let query = r#"
            SELECT id, snippet_id, user_id, user_name, content, created_at
            FROM snippet_comments WHERE id = ?
        "#;

        let mut rows = self.db.connection().query(query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_comment(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn delete_comment(&self, identity: &Identity, id: i64) -> Result<(), ServiceError> {
        let comment = self
            .get_comment(id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Comment))?;

        if comment.user_id != identity.subject {
            return Err(ServiceError::Unauthorized(
                "only the author can delete this comment".to_string(),
            ));
        }

        self.db
            .connection()
            .execute("DELETE FROM snippet_comments WHERE id = ?", libsql::params![id])
            .await?;
        Ok(())
    }

    /// Most recently inserted first.
    pub async fn list_comments(&self, snippet_id: i64, page: Page) -> Result<Vec<Comment>, ServiceError> {
        let query = r#"
            SELECT id, snippet_id, user_id, user_name, content, created_at
            FROM snippet_comments
            WHERE snippet_id = ?
            ORDER BY id DESC
            LIMIT ? OFFSET ?
        "#;

        let mut rows = self
            .db
            .connection()
            .query(
                query,
                libsql::params![snippet_id, page.limit as i64, page.offset as i64],
            )
            .await?;
        let mut comments = Vec::new();

        while let Some(row) = rows.next().await? {
            comments.push(Self::row_to_comment(&row)?);
        }

        Ok(comments)
    }

    fn row_to_comment(row: &libsql::Row) -> Result<Comment, ServiceError> {
        Ok(Comment {
            id: row.get(0)?,
            snippet_id: row.get(1)?,
            user_id: row.get(2)?,
            user_name: row.get(3)?,
            content: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snippets::store::tests::{setup, snippet};

    #[tokio::test]
    async fn test_toggle_star_twice_restores_state() {
        let db = setup().await;
        let alice = Identity::new("user_alice");
        let bob = Identity::new("user_bob");
        let id = Snippets::new(&db).create_snippet(&alice, snippet("s")).await.unwrap();
        let engagement = Engagement::new(&db);

        assert!(!engagement.is_starred(Some(&bob), id).await.unwrap());
        assert!(engagement.toggle_star(&bob, id).await.unwrap());
        assert!(engagement.is_starred(Some(&bob), id).await.unwrap());
        assert!(!engagement.toggle_star(&bob, id).await.unwrap());
        assert!(!engagement.is_starred(Some(&bob), id).await.unwrap());
    }

    #[tokio::test]
    async fn test_stars_are_unique_per_user() {
        let db = setup().await;
        let alice = Identity::new("user_alice");
        let bob = Identity::new("user_bob");
        let store = Snippets::new(&db);
        let id = store.create_snippet(&alice, snippet("s")).await.unwrap();
        let engagement = Engagement::new(&db);

        engagement.toggle_star(&alice, id).await.unwrap();
        engagement.toggle_star(&bob, id).await.unwrap();
        assert_eq!(store.star_count(id).await.unwrap(), 2);

        let dup = db
            .connection()
            .execute(
                "INSERT INTO stars (user_id, snippet_id) VALUES (?, ?)",
                libsql::params!["user_bob", id],
            )
            .await;
        assert!(dup.is_err());
        assert_eq!(store.star_count(id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_is_starred_anonymous_is_false() {
        let db = setup().await;
        let alice = Identity::new("user_alice");
        let id = Snippets::new(&db).create_snippet(&alice, snippet("s")).await.unwrap();
        let engagement = Engagement::new(&db);
        engagement.toggle_star(&alice, id).await.unwrap();

        assert!(!engagement.is_starred(None, id).await.unwrap());
        assert!(!engagement.is_starred(None, 9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_star_on_missing_snippet() {
        let db = setup().await;
        let err = Engagement::new(&db)
            .toggle_star(&Identity::new("user_alice"), 55)
            .await
            .unwrap_err();
        assert!(err.is_not_found(Entity::Snippet));
    }

    #[tokio::test]
    async fn test_toggle_star_requires_known_user() {
        let db = setup().await;
        let store = Snippets::new(&db);
        let id = store.create_snippet(&Identity::new("user_alice"), snippet("s")).await.unwrap();

        let err = Engagement::new(&db)
            .toggle_star(&Identity::new("user_ghost"), id)
            .await
            .unwrap_err();
        assert!(err.is_not_found(Entity::User));
        assert_eq!(store.star_count(id).await.unwrap(), 0);
    }

    // Deletes the snippet inside a transaction that is already open when the
    // engagement write starts.
    async fn delete_while_locked(db: &Database, id: i64) {
        let _guard = db.begin().await.unwrap();
        tokio::task::yield_now().await;
        let result = async {
            db.connection()
                .execute("DELETE FROM snippets WHERE id = ?", libsql::params![id])
                .await?;
            Ok::<(), ServiceError>(())
        }
        .await;
        db.finish(result).await.unwrap();
    }

    #[tokio::test]
    async fn test_comment_racing_delete_leaves_no_orphan() {
        let db = setup().await;
        let store = Snippets::new(&db);
        let id = store.create_snippet(&Identity::new("user_alice"), snippet("s")).await.unwrap();
        let engagement = Engagement::new(&db);
        let bob = Identity::new("user_bob");

        let (_, commented) = tokio::join!(delete_while_locked(&db, id), engagement.add_comment(&bob, id, "late"));
        assert!(commented.unwrap_err().is_not_found(Entity::Snippet));
        assert_eq!(store.comment_count(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_star_racing_delete_leaves_no_orphan() {
        let db = setup().await;
        let store = Snippets::new(&db);
        let id = store.create_snippet(&Identity::new("user_alice"), snippet("s")).await.unwrap();
        let engagement = Engagement::new(&db);
        let bob = Identity::new("user_bob");

        let (_, starred) = tokio::join!(delete_while_locked(&db, id), engagement.toggle_star(&bob, id));
        assert!(starred.unwrap_err().is_not_found(Entity::Snippet));
        assert_eq!(store.star_count(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_comment_on_missing_snippet_is_not_found() {
        let db = setup().await;
        let err = Engagement::new(&db)
            .add_comment(&Identity::new("user_alice"), 12, "hello")
            .await
            .unwrap_err();
        assert!(err.is_not_found(Entity::Snippet));
    }

    #[tokio::test]
    async fn test_comment_requires_known_user() {
        let db = setup().await;
        let id = Snippets::new(&db)
            .create_snippet(&Identity::new("user_alice"), snippet("s"))
            .await
            .unwrap();
        let err = Engagement::new(&db)
            .add_comment(&Identity::new("user_ghost"), id, "boo")
            .await
            .unwrap_err();
        assert!(err.is_not_found(Entity::User));
    }

    #[tokio::test]
    async fn test_comments_listed_newest_first() {
        let db = setup().await;
        let alice = Identity::new("user_alice");
        let bob = Identity::new("user_bob");
        let id = Snippets::new(&db).create_snippet(&alice, snippet("s")).await.unwrap();
        let engagement = Engagement::new(&db);

        assert!(engagement.list_comments(id, Page::default()).await.unwrap().is_empty());

        engagement.add_comment(&bob, id, "first").await.unwrap();
        engagement.add_comment(&alice, id, "second").await.unwrap();

        let comments = engagement.list_comments(id, Page::default()).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "second");
        assert_eq!(comments[0].user_name, "Alice Smith");
        assert_eq!(comments[1].content, "first");
        assert_eq!(comments[1].user_name, "Bob Jones");
    }

    #[tokio::test]
    async fn test_empty_comment_is_rejected() {
        let db = setup().await;
        let alice = Identity::new("user_alice");
        let id = Snippets::new(&db).create_snippet(&alice, snippet("s")).await.unwrap();
        let err = Engagement::new(&db).add_comment(&alice, id, "   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_only_author_deletes_comment() {
        let db = setup().await;
        let alice = Identity::new("user_alice");
        let bob = Identity::new("user_bob");
        let id = Snippets::new(&db).create_snippet(&alice, snippet("s")).await.unwrap();
        let engagement = Engagement::new(&db);
        let comment_id = engagement.add_comment(&bob, id, "mine").await.unwrap();

        let err = engagement.delete_comment(&alice, comment_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert!(engagement.get_comment(comment_id).await.unwrap().is_some());

        engagement.delete_comment(&bob, comment_id).await.unwrap();
        assert!(engagement.get_comment(comment_id).await.unwrap().is_none());

        let err = engagement.delete_comment(&bob, comment_id).await.unwrap_err();
        assert!(err.is_not_found(Entity::Comment));
    }
}
