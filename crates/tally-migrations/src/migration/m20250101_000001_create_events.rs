use sea_orm_migration::prelude::*;

/// Creates the append-only events table read by the analytics engine.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("events"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("session_id")).string().not_null())
                    .col(ColumnDef::new(Alias::new("user_id")).string().null())
                    .col(ColumnDef::new(Alias::new("event_type")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("occurred_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("utm_source")).string().null())
                    .col(ColumnDef::new(Alias::new("utm_medium")).string().null())
                    .col(ColumnDef::new(Alias::new("utm_campaign")).string().null())
                    .col(ColumnDef::new(Alias::new("utm_term")).string().null())
                    .col(ColumnDef::new(Alias::new("utm_content")).string().null())
                    .col(ColumnDef::new(Alias::new("page_url")).text().null())
                    .col(ColumnDef::new(Alias::new("properties")).json().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Every funnel step query filters on type and time range
        manager
            .create_index(
                Index::create()
                    .name("idx_events_event_type_occurred_at")
                    .table(Alias::new("events"))
                    .col(Alias::new("event_type"))
                    .col(Alias::new("occurred_at"))
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_events_session_id")
                    .table(Alias::new("events"))
                    .col(Alias::new("session_id"))
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new("events"))
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}
