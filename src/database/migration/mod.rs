pub use sea_orm_migration::prelude::*;

mod m20240812_101000_sectors_table;
mod m20240812_102000_sector_objects;
mod m20240812_103000_script_tables;
mod m20240812_104000_message_history;
mod m20240812_105000_player_stats;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240812_101000_sectors_table::Migration),
            Box::new(m20240812_102000_sector_objects::Migration),
            Box::new(m20240812_103000_script_tables::Migration),
            Box::new(m20240812_104000_message_history::Migration),
            Box::new(m20240812_105000_player_stats::Migration),
        ]
    }
}
