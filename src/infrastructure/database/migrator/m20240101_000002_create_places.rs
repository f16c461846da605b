//! Create places table migration

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Places::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Places::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Places::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Places::Description).text().not_null())
                    .col(ColumnDef::new(Places::Address).string().not_null())
                    .col(ColumnDef::new(Places::Lat).double().not_null())
                    .col(ColumnDef::new(Places::Lng).double().not_null())
                    .col(ColumnDef::new(Places::ImageUrl).string().null())
                    .col(ColumnDef::new(Places::ImageKey).string().null())
                    .col(ColumnDef::new(Places::CreatorId).string().not_null())
                    .col(
                        ColumnDef::new(Places::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Places::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_places_creator_id")
                            .from(Places::Table, Places::CreatorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_places_creator_id")
                    .table(Places::Table)
                    .col(Places::CreatorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Places::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Places {
    Table,
    Id,
    Title,
    Description,
    Address,
    Lat,
    Lng,
    ImageUrl,
    ImageKey,
    CreatorId,
    CreatedAt,
    UpdatedAt,
}
