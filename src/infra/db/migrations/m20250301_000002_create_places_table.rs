//! Migration: geotagged places.

use sea_orm_migration::prelude::*;

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
                    .col(ColumnDef::new(Places::Id).text().not_null().primary_key())
                    .col(ColumnDef::new(Places::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Places::Description).text().null())
                    .col(ColumnDef::new(Places::Latitude).double().not_null())
                    .col(ColumnDef::new(Places::Longitude).double().not_null())
                    .col(ColumnDef::new(Places::Address).string_len(200).null())
                    .col(ColumnDef::new(Places::City).string_len(100).null())
                    .col(ColumnDef::new(Places::Country).string_len(100).null())
                    .col(ColumnDef::new(Places::Category).string_len(16).not_null())
                    .col(ColumnDef::new(Places::Tags).json_binary().not_null())
                    .col(ColumnDef::new(Places::OpeningHours).json_binary().not_null())
                    .col(ColumnDef::new(Places::Contact).json_binary().not_null())
                    .col(
                        ColumnDef::new(Places::Rating)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Places::ReviewsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Places::CreatedBy).text().not_null())
                    .col(
                        ColumnDef::new(Places::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Places::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
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
                    .col(
                        ColumnDef::new(Places::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_places_category", Places::Category),
            ("idx_places_city", Places::City),
            ("idx_places_created_by", Places::CreatedBy),
            ("idx_places_deleted_at", Places::DeletedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Places::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Places::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Places {
    Table,
    Id,
    Name,
    Description,
    Latitude,
    Longitude,
    Address,
    City,
    Country,
    Category,
    Tags,
    OpeningHours,
    Contact,
    Rating,
    ReviewsCount,
    CreatedBy,
    IsVerified,
    IsActive,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
