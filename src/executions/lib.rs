use crate::auth::Identity;
use crate::db::Database;
use crate::error::ServiceError;
use crate::model::RecordExecution;
use crate::snippets::Snippets;

pub struct ExecutionLog<'a> {
    db: &'a Database,
}

impl<'a> ExecutionLog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn record(&self, identity: &Identity, input: RecordExecution) -> Result<(), ServiceError> {
        Snippets::new(self.db).require_user(identity).await?;

        let query = r#"
            INSERT INTO code_executions (user_id, language, code, output, error)
            VALUES (?, ?, ?, ?, ?)
        "#;

        self.db
            .connection()
            .execute(
                query,
                libsql::params![
                    identity.subject.as_str(),
                    input.language,
                    input.code,
                    input.output,
                    input.error
                ],
            )
            .await?;

        Ok(())
    }
}
