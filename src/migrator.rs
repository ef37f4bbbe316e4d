use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_reference_tables::Migration),
            Box::new(m20250301_000002_create_items_table::Migration),
            Box::new(m20250301_000003_create_stock_in_tables::Migration),
            Box::new(m20250301_000004_create_issuance_tables::Migration),
            Box::new(m20250301_000005_create_activities_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250301_000001_create_reference_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Actor references only; credentials and sessions live outside this service
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Username)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::FullName).string().not_null())
                        .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Departments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Departments::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Departments::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Staff::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Staff::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Staff::StaffCode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Staff::Name).string().not_null())
                        .col(ColumnDef::new(Staff::DepartmentId).big_integer().null())
                        .col(ColumnDef::new(Staff::JobRole).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_staff_department_id")
                                .from(Staff::Table, Staff::DepartmentId)
                                .to(Departments::Table, Departments::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Staff::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Departments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Username,
        FullName,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Departments {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    enum Staff {
        Table,
        Id,
        StaffCode,
        Name,
        DepartmentId,
        JobRole,
    }
}

mod m20250301_000002_create_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Items::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Items::Name).string().not_null())
                        .col(ColumnDef::new(Items::CategoryId).big_integer().not_null())
                        .col(
                            ColumnDef::new(Items::Quantity)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Items::Quantity).gte(0)),
                        )
                        .col(ColumnDef::new(Items::Description).string().null())
                        .col(
                            ColumnDef::new(Items::UnitOfMeasurement)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::ReorderLevel)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Items::ReorderLevel).gte(0)),
                        )
                        .col(ColumnDef::new(Items::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Items::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_category_id")
                                .from(Items::Table, Items::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uniq_items_category_name")
                        .table(Items::Table)
                        .col(Items::CategoryId)
                        .col(Items::Name)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        Id,
        Name,
        CategoryId,
        Quantity,
        Description,
        UnitOfMeasurement,
        ReorderLevel,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
    }
}

mod m20250301_000003_create_stock_in_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_stock_in_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockIns::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockIns::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(StockIns::ReceivedBy)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockIns::Document).string().null())
                        .col(
                            ColumnDef::new(StockIns::Comment)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(StockIns::ReceivedAt).timestamp().not_null())
                        .col(ColumnDef::new(StockIns::CreatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_ins_received_by")
                                .from(StockIns::Table, StockIns::ReceivedBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ins_received_at")
                        .table(StockIns::Table)
                        .col(StockIns::ReceivedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockInLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockInLines::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(StockInLines::StockInId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockInLines::ItemId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockInLines::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(StockInLines::Quantity).gt(0)),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_in_lines_stock_in_id")
                                .from(StockInLines::Table, StockInLines::StockInId)
                                .to(StockIns::Table, StockIns::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_in_lines_item_id")
                                .from(StockInLines::Table, StockInLines::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            // One line per item per header
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uniq_stock_in_lines_header_item")
                        .table(StockInLines::Table)
                        .col(StockInLines::StockInId)
                        .col(StockInLines::ItemId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockInLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockIns::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockIns {
        Table,
        Id,
        ReceivedBy,
        Document,
        Comment,
        ReceivedAt,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum StockInLines {
        Table,
        Id,
        StockInId,
        ItemId,
        Quantity,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        Id,
    }
}

mod m20250301_000004_create_issuance_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_issuance_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Issuances::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Issuances::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Issuances::StaffId).big_integer().not_null())
                        .col(
                            ColumnDef::new(Issuances::IssuedBy)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Issuances::Comment)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Issuances::IssuedAt).timestamp().not_null())
                        .col(
                            ColumnDef::new(Issuances::IsReversed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Issuances::ReversedAt).timestamp().null())
                        .col(ColumnDef::new(Issuances::ReversedBy).big_integer().null())
                        .col(ColumnDef::new(Issuances::CreatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_issuances_staff_id")
                                .from(Issuances::Table, Issuances::StaffId)
                                .to(Staff::Table, Staff::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_issuances_issued_by")
                                .from(Issuances::Table, Issuances::IssuedBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_issuances_reversed_by")
                                .from(Issuances::Table, Issuances::ReversedBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_issuances_issued_at")
                        .table(Issuances::Table)
                        .col(Issuances::IssuedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(IssuanceLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(IssuanceLines::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(IssuanceLines::IssuanceId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(IssuanceLines::ItemId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(IssuanceLines::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(IssuanceLines::Quantity).gt(0)),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_issuance_lines_issuance_id")
                                .from(IssuanceLines::Table, IssuanceLines::IssuanceId)
                                .to(Issuances::Table, Issuances::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_issuance_lines_item_id")
                                .from(IssuanceLines::Table, IssuanceLines::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uniq_issuance_lines_header_item")
                        .table(IssuanceLines::Table)
                        .col(IssuanceLines::IssuanceId)
                        .col(IssuanceLines::ItemId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(IssuanceLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Issuances::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Issuances {
        Table,
        Id,
        StaffId,
        IssuedBy,
        Comment,
        IssuedAt,
        IsReversed,
        ReversedAt,
        ReversedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum IssuanceLines {
        Table,
        Id,
        IssuanceId,
        ItemId,
        Quantity,
    }

    #[derive(DeriveIden)]
    enum Staff {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        Id,
    }
}

mod m20250301_000005_create_activities_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_activities_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Activities::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Activities::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Activities::ActorId).big_integer().not_null())
                        .col(ColumnDef::new(Activities::Verb).string().not_null())
                        .col(ColumnDef::new(Activities::TargetType).string().not_null())
                        .col(
                            ColumnDef::new(Activities::TargetId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Activities::Summary).string().not_null())
                        .col(ColumnDef::new(Activities::Metadata).json().not_null())
                        .col(ColumnDef::new(Activities::CreatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_activities_actor_id")
                                .from(Activities::Table, Activities::ActorId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_activities_verb")
                        .table(Activities::Table)
                        .col(Activities::Verb)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_activities_target")
                        .table(Activities::Table)
                        .col(Activities::TargetType)
                        .col(Activities::TargetId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_activities_created_at")
                        .table(Activities::Table)
                        .col(Activities::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Activities::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Activities {
        Table,
        Id,
        ActorId,
        Verb,
        TargetType,
        TargetId,
        Summary,
        Metadata,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }
}
