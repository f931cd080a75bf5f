use crate::chain::Direction;
use crate::dialect::Dialect;
use crate::operation::Operation;
use crate::probe::Probe;

/// One migration step in the revision chain.
pub struct Revision {
    pub revision: &'static str,
    pub down_revision: Option<&'static str>,
    pub message: &'static str,
    forward: Vec<Box<dyn Operation>>,
    backward: Option<Vec<Box<dyn Operation>>>,
    atomic: bool,
}

impl std::fmt::Debug for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Revision")
            .field("revision", &self.revision)
            .field("down_revision", &self.down_revision)
            .field("message", &self.message)
            .field("forward", &format!("[{} operations]", self.forward.len()))
            .field(
                "backward",
                &self
                    .backward
                    .as_ref()
                    .map(|b| format!("[{} operations]", b.len())),
            )
            .field("atomic", &self.atomic)
            .finish()
    }
}

/// A unit of work within a step: the statements of one operation plus the
/// probe that, when satisfied, means they have already taken effect.
#[derive(Debug, Clone)]
pub struct Action {
    pub description: String,
    pub probe: Option<Probe>,
    pub statements: Vec<String>,
}

impl Revision {
    pub fn new(revision: &'static str) -> Self {
        Self {
            revision,
            down_revision: None,
            message: "",
            forward: Vec::new(),
            backward: None,
            atomic: true,
        }
    }

    pub fn down_revision(mut self, down_revision: &'static str) -> Self {
        self.down_revision = Some(down_revision);
        self
    }

    pub fn message(mut self, message: &'static str) -> Self {
        self.message = message;
        self
    }

    /// Whether the step runs inside a transaction on dialects with
    /// transactional DDL. Defaults to `true`.
    pub fn atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    /// Add an operation; its inverse is derived for the downgrade.
    pub fn operation(mut self, op: impl Operation + 'static) -> Self {
        self.forward.push(Box::new(op));
        self
    }

    pub fn forward_ops(mut self, ops: Vec<Box<dyn Operation>>) -> Self {
        self.forward = ops;
        self
    }

    /// Explicit downgrade operations, run in the given order.
    pub fn backward_ops(mut self, ops: Vec<Box<dyn Operation>>) -> Self {
        self.backward = Some(ops);
        self
    }

    pub fn is_reversible(&self) -> bool {
        if self.backward.is_some() {
            return true;
        }
        self.forward.iter().all(|op| op.is_reversible())
    }

    pub fn forward_actions(&self, dialect: &dyn Dialect) -> Vec<Action> {
        self.forward
            .iter()
            .map(|op| Action {
                description: op.describe(),
                probe: op.forward_probe(),
                statements: op.forward(dialect),
            })
            .collect()
    }

    /// `None` when some forward operation has no inverse on this dialect.
    pub fn backward_actions(&self, dialect: &dyn Dialect) -> Option<Vec<Action>> {
        if let Some(ref backward) = self.backward {
            return Some(
                backward
                    .iter()
                    .map(|op| Action {
                        description: op.describe(),
                        probe: op.forward_probe(),
                        statements: op.forward(dialect),
                    })
                    .collect(),
            );
        }

        self.forward
            .iter()
            .rev()
            .map(|op| {
                Some(Action {
                    description: format!("Revert: {}", op.describe()),
                    probe: op.backward_probe(),
                    statements: op.backward(dialect)?,
                })
            })
            .collect()
    }

    pub fn actions(&self, dialect: &dyn Dialect, direction: Direction) -> Option<Vec<Action>> {
        match direction {
            Direction::Upgrade => Some(self.forward_actions(dialect)),
            Direction::Downgrade => self.backward_actions(dialect),
        }
    }

    pub fn forward_sql(&self, dialect: &dyn Dialect) -> Vec<String> {
        self.forward_actions(dialect)
            .into_iter()
            .flat_map(|action| action.statements)
            .collect()
    }

    pub fn backward_sql(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        self.backward_actions(dialect).map(|actions| {
            actions
                .into_iter()
                .flat_map(|action| action.statements)
                .collect()
        })
    }

    /// Description of the first operation the dialect cannot run in the
    /// given direction.
    pub fn unsupported_operation(
        &self,
        dialect: &dyn Dialect,
        direction: Direction,
    ) -> Option<String> {
        let ops: &[Box<dyn Operation>] = match (direction, &self.backward) {
            (Direction::Downgrade, Some(backward)) => backward,
            _ => &self.forward,
        };
        ops.iter()
            .find(|op| !op.supported_by(dialect))
            .map(|op| op.describe())
    }

    /// The step's marker before it is applied and after it is reverted.
    pub fn marker_before(&self, direction: Direction) -> Option<&'static str> {
        match direction {
            Direction::Upgrade => self.down_revision,
            Direction::Downgrade => Some(self.revision),
        }
    }

    pub fn marker_after(&self, direction: Direction) -> Option<&'static str> {
        match direction {
            Direction::Upgrade => Some(self.revision),
            Direction::Downgrade => self.down_revision,
        }
    }

    pub fn forward_operations(&self) -> &[Box<dyn Operation>] {
        &self.forward
    }

    pub fn backward_operations(&self) -> Option<&[Box<dyn Operation>]> {
        self.backward.as_deref()
    }
}
