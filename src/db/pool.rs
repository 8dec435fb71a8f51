use sqlx::postgres::PgPool;

pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    let _result = sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await?;

    Ok(())
}
