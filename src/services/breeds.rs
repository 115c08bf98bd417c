use sqlx::PgConnection;

/// Get-or-create a breed by name (case-insensitive). Blank names mean "no breed".
///
/// The insert and lookup run as one statement against the unique index on
/// `lower(name)`, so concurrent callers converge on a single row. When a
/// concurrent insert commits after this statement's snapshot was taken the
/// statement sees neither row, and a second lookup picks it up.
pub async fn get_or_create(conn: &mut PgConnection, name: &str) -> anyhow::Result<Option<i64>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }

    let id: Option<i64> = sqlx::query_scalar(
        "WITH inserted AS (
             INSERT INTO breeds (name) VALUES ($1)
             ON CONFLICT ((lower(name))) DO NOTHING
             RETURNING id
         )
         SELECT id FROM inserted
         UNION ALL
         SELECT id FROM breeds WHERE lower(name) = lower($1)
         LIMIT 1",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = id {
        return Ok(Some(id));
    }

    let id: i64 = sqlx::query_scalar("SELECT id FROM breeds WHERE lower(name) = lower($1)")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(Some(id))
}
