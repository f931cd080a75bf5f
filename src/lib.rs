pub mod bootstrap;
pub mod chain;
pub mod cli;
pub mod column;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod operation;
pub mod probe;
pub mod revision;
pub mod revisions;
pub mod store;

pub mod prelude {
    pub use crate::chain::{Direction, Plan, RevisionChain, RevisionRegistry, Target};
    pub use crate::column::{Column, ColumnChanges, ColumnType, ForeignKey, ReferentialAction};
    pub use crate::config::{open_store, Driver, Settings};
    pub use crate::dialect::{Dialect, MySql, Postgres, Sqlite};
    pub use crate::engine::{ActionOutcome, Engine, HistoryEntry, StepReport};
    pub use crate::error::{ChainIntegrityError, EngineError, StoreError};
    pub use crate::operation::{
        AddColumn, AddIndex, AlterColumn, CreateTable, DropColumn, DropIndex, DropTable, Index,
        IndexOrder, Operation, RenameColumn, RenameTable, RunSql,
    };
    pub use crate::probe::{Probe, SchemaInspector};
    pub use crate::revision::Revision;
    pub use crate::store::{MemoryStore, StoreDriver};

    #[cfg(feature = "sqlite")]
    pub use crate::store::SqliteStore;

    #[cfg(feature = "postgres")]
    pub use crate::store::PostgresStore;

    #[cfg(feature = "mysql")]
    pub use crate::store::MySqlStore;
}
