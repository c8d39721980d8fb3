use sea_orm_migration::prelude::*;

use crate::m20250301_000001_create_users::Users;
use crate::m20250301_000002_create_plans::Plans;

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    UserId,
    PlanId,
    Amount,
    TransactionType,
    Status,
    MerchantRequestId,
    CheckoutRequestId,
    ResultDescription,
    MpesaReceiptNumber,
    TransactionDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
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
                    .col(ColumnDef::new(Transactions::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::PlanId).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Transactions::TransactionType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Status).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Transactions::MerchantRequestId)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::CheckoutRequestId)
                            .string_len(64)
                            .null(),
                    )
                    .col(ColumnDef::new(Transactions::ResultDescription).text().null())
                    .col(
                        ColumnDef::new(Transactions::MpesaReceiptNumber)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::TransactionDate)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_user_id")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_plan_id")
                            .from(Transactions::Table, Transactions::PlanId)
                            .to(Plans::Table, Plans::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transactions_user_id")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .to_owned(),
            )
            .await?;

        // callbacks and status polls look transactions up by the gateway's request id
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transactions_checkout_request_id")
                    .table(Transactions::Table)
                    .col(Transactions::CheckoutRequestId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}
