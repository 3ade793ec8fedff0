//! Initial schema.
//!
//! - `users`: operators allowed to call the API
//! - `products`: catalogue items, each measured in one unit of mass
//! - `product_qualities`: stock bins, one per (product, quality)
//! - `suppliers` / `customers`: counterparties of `IN` / `OUT` movements
//! - `transactions`: the stock ledger

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Users {
    Table,
    Username,
    PasswordHash,
    CreatedAt,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
    Code,
    Name,
    UnitAcronym,
    UnitDescription,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ProductQualities {
    Table,
    Id,
    ProductCode,
    Quality,
    Price,
    Quantity,
    Adjustment,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
enum Suppliers {
    Table,
    Id,
    Code,
    Name,
    Address,
    Phone,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
enum Customers {
    Table,
    Id,
    Code,
    Name,
    Address,
    Phone,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    Code,
    ProductQualityId,
    ProductQualityIdSource,
    SupplierCode,
    CustomerCode,
    Description,
    Quantity,
    UnitMassAcronym,
    Kind,
    CreatedAt,
    UpdatedAt,
}

/// `id`, `code` and `name` plus contact columns shared by suppliers and
/// customers.
fn party_table<T>(table: T, cols: [T; 7]) -> TableCreateStatement
where
    T: Iden + Copy + 'static,
{
    let [id, code, name, address, phone, created_at, updated_at] = cols;
    Table::create()
        .table(table)
        .if_not_exists()
        .col(
            ColumnDef::new(id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(code).string_len(10).not_null().unique_key())
        .col(ColumnDef::new(name).string().not_null())
        .col(ColumnDef::new(address).string())
        .col(ColumnDef::new(phone).string())
        .col(
            ColumnDef::new(created_at)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(updated_at)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Products::Code)
                            .string_len(10)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::UnitAcronym).string().not_null())
                    .col(
                        ColumnDef::new(Products::UnitDescription)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductQualities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductQualities::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductQualities::ProductCode)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductQualities::Quality).string().not_null())
                    .col(
                        ColumnDef::new(ProductQualities::Price)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductQualities::Quantity)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(ProductQualities::Adjustment).string())
                    .col(
                        ColumnDef::new(ProductQualities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductQualities::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-product_qualities-product_code")
                            .from(ProductQualities::Table, ProductQualities::ProductCode)
                            .to(Products::Table, Products::Code)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-product_qualities-product_code")
                    .table(ProductQualities::Table)
                    .col(ProductQualities::ProductCode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(party_table(
                Suppliers::Table,
                [
                    Suppliers::Id,
                    Suppliers::Code,
                    Suppliers::Name,
                    Suppliers::Address,
                    Suppliers::Phone,
                    Suppliers::CreatedAt,
                    Suppliers::UpdatedAt,
                ],
            ))
            .await?;

        manager
            .create_table(party_table(
                Customers::Table,
                [
                    Customers::Id,
                    Customers::Code,
                    Customers::Name,
                    Customers::Address,
                    Customers::Phone,
                    Customers::CreatedAt,
                    Customers::UpdatedAt,
                ],
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Code)
                            .string_len(10)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Transactions::ProductQualityId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::ProductQualityIdSource).integer())
                    .col(ColumnDef::new(Transactions::SupplierCode).string_len(10))
                    .col(ColumnDef::new(Transactions::CustomerCode).string_len(10))
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::Quantity).double().not_null())
                    .col(
                        ColumnDef::new(Transactions::UnitMassAcronym)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-product_quality_id")
                            .from(Transactions::Table, Transactions::ProductQualityId)
                            .to(ProductQualities::Table, ProductQualities::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-product_quality_id_source")
                            .from(Transactions::Table, Transactions::ProductQualityIdSource)
                            .to(ProductQualities::Table, ProductQualities::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-supplier_code")
                            .from(Transactions::Table, Transactions::SupplierCode)
                            .to(Suppliers::Table, Suppliers::Code),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-customer_code")
                            .from(Transactions::Table, Transactions::CustomerCode)
                            .to(Customers::Table, Customers::Code),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Suppliers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductQualities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
