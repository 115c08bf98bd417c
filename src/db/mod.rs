use sqlx::postgres::PgPoolOptions;
use sqlx::{Encode, PgPool, Postgres, QueryBuilder, Type};

pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the migrations embedded from ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres error codes the API reports as client errors.
pub mod codes {
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const CHECK_VIOLATION: &str = "23514";
}

/// Builds `UPDATE <table> SET ...` from whichever values are present.
///
/// Columns are only ever static identifiers from the service layer; values
/// are always bound.
pub struct UpdateBuilder<'a> {
    qb: QueryBuilder<'a, Postgres>,
    fields: usize,
}

impl<'a> UpdateBuilder<'a> {
    pub fn new(table: &str) -> Self {
        Self {
            qb: QueryBuilder::new(format!("UPDATE {table} SET ")),
            fields: 0,
        }
    }

    pub fn set<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        if let Some(value) = value {
            if self.fields > 0 {
                self.qb.push(", ");
            }
            self.qb.push(column).push(" = ").push_bind(value);
            self.fields += 1;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields == 0
    }

    /// Appends the `WHERE id = ...` filter and `RETURNING` list. Returns `None`
    /// when no field was set so callers can reject the request untouched.
    pub fn finish(
        mut self,
        touch_updated_at: bool,
        id: i64,
        returning: &str,
    ) -> Option<QueryBuilder<'a, Postgres>> {
        if self.is_empty() {
            return None;
        }
        if touch_updated_at {
            self.qb.push(", updated_at = NOW()");
        }
        self.qb.push(" WHERE id = ").push_bind(id);
        self.qb.push(" RETURNING ").push(returning);
        Some(self.qb)
    }
}
