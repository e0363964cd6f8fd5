use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // provider_cache
        manager
            .create_table(
                Table::create()
                    .table(ProviderCache::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProviderCache::ProviderId).string().not_null())
                    .col(ColumnDef::new(ProviderCache::ExternalId).string().not_null())
                    .col(ColumnDef::new(ProviderCache::Type).string().not_null())
                    .col(ColumnDef::new(ProviderCache::Name).string().not_null())
                    .col(ColumnDef::new(ProviderCache::Content).string().not_null())
                    .col(ColumnDef::new(ProviderCache::Ttl).big_integer().not_null())
                    .col(ColumnDef::new(ProviderCache::Proxied).integer().null())
                    .col(ColumnDef::new(ProviderCache::DataJson).string().not_null())
                    .col(ColumnDef::new(ProviderCache::Comment).string().null())
                    .col(ColumnDef::new(ProviderCache::Fingerprint).string().not_null())
                    .col(
                        ColumnDef::new(ProviderCache::LastRefreshedAt)
                            .string()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ProviderCache::ProviderId)
                            .col(ProviderCache::ExternalId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_provider_cache_name")
                    .table(ProviderCache::Table)
                    .col(ProviderCache::ProviderId)
                    .col(ProviderCache::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_provider_cache_type")
                    .table(ProviderCache::Table)
                    .col(ProviderCache::ProviderId)
                    .col(ProviderCache::Type)
                    .to_owned(),
            )
            .await?;

        // managed_records
        manager
            .create_table(
                Table::create()
                    .table(ManagedRecords::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ManagedRecords::ProviderId).string().not_null())
                    .col(ColumnDef::new(ManagedRecords::ExternalId).string().not_null())
                    .col(ColumnDef::new(ManagedRecords::Type).string().not_null())
                    .col(ColumnDef::new(ManagedRecords::Name).string().not_null())
                    .col(ColumnDef::new(ManagedRecords::Content).string().not_null())
                    .col(ColumnDef::new(ManagedRecords::Ttl).big_integer().not_null())
                    .col(ColumnDef::new(ManagedRecords::Proxied).integer().null())
                    .col(ColumnDef::new(ManagedRecords::DataJson).string().not_null())
                    .col(ColumnDef::new(ManagedRecords::Comment).string().null())
                    .col(ColumnDef::new(ManagedRecords::Fingerprint).string().not_null())
                    .col(ColumnDef::new(ManagedRecords::Source).string().not_null())
                    .col(
                        ColumnDef::new(ManagedRecords::Managed)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ManagedRecords::IsOrphaned)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ManagedRecords::OrphanedAt).string().null())
                    .col(ColumnDef::new(ManagedRecords::FirstSeenAt).string().not_null())
                    .col(ColumnDef::new(ManagedRecords::TrackedAt).string().not_null())
                    .col(ColumnDef::new(ManagedRecords::UpdatedAt).string().not_null())
                    .col(
                        ColumnDef::new(ManagedRecords::MetadataJson)
                            .string()
                            .not_null()
                            .default("{}"),
                    )
                    .primary_key(
                        Index::create()
                            .col(ManagedRecords::ProviderId)
                            .col(ManagedRecords::ExternalId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_managed_records_name")
                    .table(ManagedRecords::Table)
                    .col(ManagedRecords::ProviderId)
                    .col(ManagedRecords::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_managed_records_orphaned")
                    .table(ManagedRecords::Table)
                    .col(ManagedRecords::IsOrphaned)
                    .to_owned(),
            )
            .await?;

        // hostname_overrides
        manager
            .create_table(
                Table::create()
                    .table(HostnameOverrides::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HostnameOverrides::Hostname)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HostnameOverrides::RecordType).string().null())
                    .col(ColumnDef::new(HostnameOverrides::Content).string().null())
                    .col(ColumnDef::new(HostnameOverrides::Ttl).big_integer().null())
                    .col(ColumnDef::new(HostnameOverrides::Proxied).integer().null())
                    .col(ColumnDef::new(HostnameOverrides::ProviderId).string().null())
                    .col(
                        ColumnDef::new(HostnameOverrides::Enabled)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(HostnameOverrides::Reason).string().null())
                    .col(ColumnDef::new(HostnameOverrides::CreatedAt).string().not_null())
                    .col(ColumnDef::new(HostnameOverrides::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HostnameOverrides::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ManagedRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProviderCache::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ProviderCache {
    #[sea_orm(iden = "provider_cache")]
    Table,
    ProviderId,
    ExternalId,
    Type,
    Name,
    Content,
    Ttl,
    Proxied,
    DataJson,
    Comment,
    Fingerprint,
    LastRefreshedAt,
}

#[derive(DeriveIden)]
enum ManagedRecords {
    #[sea_orm(iden = "managed_records")]
    Table,
    ProviderId,
    ExternalId,
    Type,
    Name,
    Content,
    Ttl,
    Proxied,
    DataJson,
    Comment,
    Fingerprint,
    Source,
    Managed,
    IsOrphaned,
    OrphanedAt,
    FirstSeenAt,
    TrackedAt,
    UpdatedAt,
    MetadataJson,
}

#[derive(DeriveIden)]
enum HostnameOverrides {
    #[sea_orm(iden = "hostname_overrides")]
    Table,
    Hostname,
    RecordType,
    Content,
    Ttl,
    Proxied,
    ProviderId,
    Enabled,
    Reason,
    CreatedAt,
    UpdatedAt,
}
