pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260301_000001_core_tables;
mod m20260302_000001_ip_labels;
mod m20260315_000001_geo_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_core_tables::Migration),
            Box::new(m20260302_000001_ip_labels::Migration),
            Box::new(m20260315_000001_geo_indexes::Migration),
        ]
    }
}
