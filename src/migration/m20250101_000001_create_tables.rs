use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::entity::{
    audit_logs, carts, checkout_sessions, items, line_items, orders, users,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        // Referenced tables first so foreign keys resolve on Postgres.
        create_from_entity(manager, &schema, users::Entity).await?;
        create_from_entity(manager, &schema, items::Entity).await?;
        create_from_entity(manager, &schema, carts::Entity).await?;
        create_from_entity(manager, &schema, orders::Entity).await?;
        create_from_entity(manager, &schema, line_items::Entity).await?;
        create_from_entity(manager, &schema, checkout_sessions::Entity).await?;
        create_from_entity(manager, &schema, audit_logs::Entity).await?;

        // One line per (cart, item). Order lines have a NULL cart_id and are not constrained.
        manager
            .create_index(
                Index::create()
                    .name("idx_line_items_cart_item")
                    .table(line_items::Entity)
                    .col(line_items::Column::CartId)
                    .col(line_items::Column::ItemId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_line_items_order")
                    .table(line_items::Entity)
                    .col(line_items::Column::OrderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(audit_logs::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(checkout_sessions::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(line_items::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(orders::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(carts::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(items::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(users::Entity).if_exists().to_owned())
            .await
    }
}

async fn create_from_entity<E>(
    manager: &SchemaManager<'_>,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let mut stmt = schema.create_table_from_entity(entity);
    manager.create_table(stmt.if_not_exists().to_owned()).await
}
