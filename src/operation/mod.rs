mod column;
mod index;
mod sql;
mod table;

pub use column::{AddColumn, AlterColumn, DropColumn, RenameColumn};
pub use index::{AddIndex, DropIndex, Index, IndexOrder};
pub use sql::RunSql;
pub use table::{CreateTable, DropTable, RenameTable};

use crate::dialect::Dialect;
use crate::probe::Probe;

pub trait Operation: Send + Sync {
    fn forward(&self, dialect: &dyn Dialect) -> Vec<String>;

    fn backward(&self, dialect: &dyn Dialect) -> Option<Vec<String>>;

    fn describe(&self) -> String;

    fn is_reversible(&self) -> bool {
        true
    }

    /// Schema state meaning the forward statements have already taken effect.
    fn forward_probe(&self) -> Option<Probe> {
        None
    }

    /// Schema state meaning the backward statements have already taken effect.
    fn backward_probe(&self) -> Option<Probe> {
        None
    }

    fn supported_by(&self, _dialect: &dyn Dialect) -> bool {
        true
    }
}
