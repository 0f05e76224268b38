mod converter;
mod entity;

pub(crate) use converter::new_warning;
pub use entity::{device, error_report, measurement, warning};

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema, Statement};
use tracing::info;

/// 创建数据表（已存在则跳过）
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table(db, &schema, device::Entity).await?;
    create_table(db, &schema, measurement::Entity).await?;
    create_table(db, &schema, error_report::Entity).await?;
    create_table(db, &schema, warning::Entity).await?;

    for sql in [
        "CREATE INDEX IF NOT EXISTS idx_measurements_device_ts ON measurements (device_id, timestamp)",
        "CREATE INDEX IF NOT EXISTS idx_errors_device_ts ON errors (device_id, timestamp)",
        "CREATE INDEX IF NOT EXISTS idx_warnings_device_ts ON warnings (device_id, timestamp)",
    ] {
        db.execute(Statement::from_string(backend, sql.to_string()))
            .await?;
    }

    info!("Database schema ready");
    Ok(())
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr> {
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(db.get_database_backend().build(&stmt)).await?;
    Ok(())
}
