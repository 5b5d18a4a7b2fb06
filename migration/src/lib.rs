pub use sea_orm_migration::prelude::*;

mod m20240101_000001_pipelines;
mod m20240102_000002_deals;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_pipelines::Migration),
            Box::new(m20240102_000002_deals::Migration),
        ]
    }
}
