use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240501_000001_create_productos_table::Migration),
            Box::new(m20240501_000002_create_proformas_tables::Migration),
            Box::new(m20240501_000003_create_reservas_table::Migration),
            Box::new(m20240501_000004_create_ventas_table::Migration),
            Box::new(m20240501_000005_create_entregas_tables::Migration),
            Box::new(m20240501_000006_create_rutas_tables::Migration),
            Box::new(m20240501_000007_create_novedades_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240501_000001_create_productos_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000001_create_productos_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Productos::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Productos::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Productos::Sku)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Productos::Nombre).string().not_null())
                        .col(
                            ColumnDef::new(Productos::Disponible)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Productos::Reservado)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Productos::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Productos::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Productos::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Productos::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Productos {
        Table,
        Id,
        Sku,
        Nombre,
        Disponible,
        Reservado,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240501_000002_create_proformas_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000002_create_proformas_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Proformas::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Proformas::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Proformas::Numero)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Proformas::ClienteId).uuid().not_null())
                        .col(
                            ColumnDef::new(Proformas::Total)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Proformas::Estado).string().not_null())
                        .col(
                            ColumnDef::new(Proformas::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Proformas::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_proformas_estado")
                        .table(Proformas::Table)
                        .col(Proformas::Estado)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProformaLineas::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProformaLineas::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProformaLineas::ProformaId).uuid().not_null())
                        .col(ColumnDef::new(ProformaLineas::ProductoId).uuid().not_null())
                        .col(ColumnDef::new(ProformaLineas::Cantidad).integer().not_null())
                        .col(
                            ColumnDef::new(ProformaLineas::PrecioUnitario)
                                .decimal()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_proforma_lineas_proforma")
                                .from(ProformaLineas::Table, ProformaLineas::ProformaId)
                                .to(Proformas::Table, Proformas::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_proforma_lineas_proforma_id")
                        .table(ProformaLineas::Table)
                        .col(ProformaLineas::ProformaId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProformaLineas::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Proformas::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Proformas {
        Table,
        Id,
        Numero,
        ClienteId,
        Total,
        Estado,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProformaLineas {
        Table,
        Id,
        ProformaId,
        ProductoId,
        Cantidad,
        PrecioUnitario,
    }
}

mod m20240501_000003_create_reservas_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000003_create_reservas_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Reservas::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Reservas::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Reservas::ProformaId).uuid().not_null())
                        .col(ColumnDef::new(Reservas::ProformaLineaId).uuid().not_null())
                        .col(ColumnDef::new(Reservas::ProductoId).uuid().not_null())
                        .col(ColumnDef::new(Reservas::Cantidad).integer().not_null())
                        .col(ColumnDef::new(Reservas::Estado).string().not_null())
                        .col(
                            ColumnDef::new(Reservas::Renovaciones)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Reservas::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reservas::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reservas::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reservas_proforma")
                                .from(Reservas::Table, Reservas::ProformaId)
                                .to(Proformas::Table, Proformas::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reservas_proforma_id")
                        .table(Reservas::Table)
                        .col(Reservas::ProformaId)
                        .to_owned(),
                )
                .await?;

            // The sweep scans by estado + expiry.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reservas_estado_expires_at")
                        .table(Reservas::Table)
                        .col(Reservas::Estado)
                        .col(Reservas::ExpiresAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Reservas::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Reservas {
        Table,
        Id,
        ProformaId,
        ProformaLineaId,
        ProductoId,
        Cantidad,
        Estado,
        Renovaciones,
        ExpiresAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Proformas {
        Table,
        Id,
    }
}

mod m20240501_000004_create_ventas_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000004_create_ventas_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Ventas::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Ventas::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Ventas::Numero)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Ventas::ProformaId).uuid().not_null())
                        .col(ColumnDef::new(Ventas::ClienteId).uuid().not_null())
                        .col(ColumnDef::new(Ventas::Total).decimal().not_null().default(0))
                        .col(ColumnDef::new(Ventas::Estado).string().not_null())
                        .col(
                            ColumnDef::new(Ventas::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ventas_cliente_id")
                        .table(Ventas::Table)
                        .col(Ventas::ClienteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Ventas::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Ventas {
        Table,
        Id,
        Numero,
        ProformaId,
        ClienteId,
        Total,
        Estado,
        CreatedAt,
    }
}

mod m20240501_000005_create_entregas_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000005_create_entregas_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Entregas::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Entregas::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Entregas::Numero)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Entregas::VentaId).uuid().not_null())
                        .col(ColumnDef::new(Entregas::ConductorId).uuid().null())
                        .col(ColumnDef::new(Entregas::VehiculoId).uuid().null())
                        .col(ColumnDef::new(Entregas::Estado).string().not_null())
                        .col(
                            ColumnDef::new(Entregas::FechaProgramada)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Entregas::IniciadaAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Entregas::CompletadaAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Entregas::MotivoRechazo).string().null())
                        .col(
                            ColumnDef::new(Entregas::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Entregas::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_entregas_venta_id")
                        .table(Entregas::Table)
                        .col(Entregas::VentaId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_entregas_estado")
                        .table(Entregas::Table)
                        .col(Entregas::Estado)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(EntregaUbicaciones::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(EntregaUbicaciones::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(EntregaUbicaciones::EntregaId).uuid().not_null())
                        .col(ColumnDef::new(EntregaUbicaciones::Latitud).double().not_null())
                        .col(
                            ColumnDef::new(EntregaUbicaciones::Longitud)
                                .double()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EntregaUbicaciones::RegistradaAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_entrega_ubicaciones_entrega")
                                .from(EntregaUbicaciones::Table, EntregaUbicaciones::EntregaId)
                                .to(Entregas::Table, Entregas::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_entrega_ubicaciones_entrega_id")
                        .table(EntregaUbicaciones::Table)
                        .col(EntregaUbicaciones::EntregaId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(EntregaUbicaciones::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Entregas::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Entregas {
        Table,
        Id,
        Numero,
        VentaId,
        ConductorId,
        VehiculoId,
        Estado,
        FechaProgramada,
        IniciadaAt,
        CompletadaAt,
        MotivoRechazo,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum EntregaUbicaciones {
        Table,
        Id,
        EntregaId,
        Latitud,
        Longitud,
        RegistradaAt,
    }
}

mod m20240501_000006_create_rutas_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000006_create_rutas_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Rutas::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Rutas::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Rutas::Numero)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Rutas::Zona).string().not_null())
                        .col(ColumnDef::new(Rutas::Fecha).date().not_null())
                        .col(ColumnDef::new(Rutas::ConductorId).uuid().null())
                        .col(ColumnDef::new(Rutas::VehiculoId).uuid().null())
                        .col(ColumnDef::new(Rutas::Estado).string().not_null())
                        .col(
                            ColumnDef::new(Rutas::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_rutas_fecha")
                        .table(Rutas::Table)
                        .col(Rutas::Fecha)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(RutaParadas::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(RutaParadas::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(RutaParadas::RutaId).uuid().not_null())
                        .col(
                            ColumnDef::new(RutaParadas::EntregaId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(RutaParadas::PosicionOrden)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RutaParadas::EstadoEntrega).string().not_null())
                        .col(
                            ColumnDef::new(RutaParadas::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_ruta_paradas_ruta")
                                .from(RutaParadas::Table, RutaParadas::RutaId)
                                .to(Rutas::Table, Rutas::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Stop ordering is unique within a route.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ruta_paradas_ruta_posicion")
                        .table(RutaParadas::Table)
                        .col(RutaParadas::RutaId)
                        .col(RutaParadas::PosicionOrden)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RutaParadas::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Rutas::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Rutas {
        Table,
        Id,
        Numero,
        Zona,
        Fecha,
        ConductorId,
        VehiculoId,
        Estado,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum RutaParadas {
        Table,
        Id,
        RutaId,
        EntregaId,
        PosicionOrden,
        EstadoEntrega,
        CreatedAt,
    }
}

mod m20240501_000007_create_novedades_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000007_create_novedades_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Novedades::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Novedades::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Novedades::EntregaId).uuid().not_null())
                        .col(ColumnDef::new(Novedades::Tipo).string().not_null())
                        .col(ColumnDef::new(Novedades::Descripcion).string().not_null())
                        .col(ColumnDef::new(Novedades::ReportadoPor).string().not_null())
                        .col(ColumnDef::new(Novedades::Estado).string().not_null())
                        .col(ColumnDef::new(Novedades::FotoUrl).string().null())
                        .col(
                            ColumnDef::new(Novedades::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Novedades::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_novedades_entrega")
                                .from(Novedades::Table, Novedades::EntregaId)
                                .to(Entregas::Table, Entregas::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_novedades_entrega_id")
                        .table(Novedades::Table)
                        .col(Novedades::EntregaId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Novedades::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Novedades {
        Table,
        Id,
        EntregaId,
        Tipo,
        Descripcion,
        ReportadoPor,
        Estado,
        FotoUrl,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Entregas {
        Table,
        Id,
    }
}
