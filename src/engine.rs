//! The schema evolution engine.
//!
//! [`Engine`] drives a [`StoreDriver`] along a validated [`RevisionChain`].
//! Each step runs as: check the marker precondition, open a transaction when
//! the dialect has transactional DDL and the step is atomic, run every action
//! whose probe is not yet satisfied, advance the marker, commit. A failing
//! step is rolled back (where possible) and aborts the rest of the plan; the
//! marker stays at the last step that completed.

use tracing::{debug, info, warn};

use crate::chain::{Direction, Plan, RevisionChain, Target};
use crate::error::{marker_label, EngineError};
use crate::revision::{Action, Revision};
use crate::store::StoreDriver;

/// What happened to one action of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Executed {
        description: String,
        statements: usize,
    },
    /// The probe found the action's effect already in place.
    AlreadyApplied { description: String, probe: String },
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub revision: String,
    pub direction: Direction,
    pub actions: Vec<ActionOutcome>,
}

impl StepReport {
    pub fn skipped(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, ActionOutcome::AlreadyApplied { .. }))
            .count()
    }

    pub fn executed(&self) -> usize {
        self.actions.len() - self.skipped()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub revision: &'static str,
    pub down_revision: Option<&'static str>,
    pub message: &'static str,
    pub applied: bool,
    pub current: bool,
}

pub struct Engine<'a, S: StoreDriver> {
    chain: &'a RevisionChain,
    store: S,
}

impl<'a, S: StoreDriver> Engine<'a, S> {
    pub fn new(chain: &'a RevisionChain, store: S) -> Self {
        Self { chain, store }
    }

    pub fn chain(&self) -> &'a RevisionChain {
        self.chain
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The stored marker, `None` on a fresh store.
    pub fn current(&mut self) -> Result<Option<String>, EngineError> {
        Ok(self.store.read_marker()?)
    }

    pub fn plan_upgrade(&mut self, target: &Target) -> Result<Plan<'a>, EngineError> {
        let chain = self.chain;
        let marker = self.store.read_marker()?;
        let plan = chain.plan_upgrade(marker.as_deref(), target)?;
        self.check_supported(&plan)?;
        Ok(plan)
    }

    pub fn plan_downgrade(&mut self, target: &Target) -> Result<Plan<'a>, EngineError> {
        let chain = self.chain;
        let marker = self.store.read_marker()?;
        let plan = chain.plan_downgrade(marker.as_deref(), target)?;
        self.check_supported(&plan)?;
        Ok(plan)
    }

    fn check_supported(&self, plan: &Plan<'_>) -> Result<(), EngineError> {
        let dialect = self.store.dialect();
        for step in &plan.steps {
            if let Some(operation) = step.unsupported_operation(dialect, plan.direction) {
                return Err(EngineError::UnsupportedOperation {
                    revision: step.revision.to_string(),
                    operation,
                    dialect: dialect.name(),
                });
            }
            if plan.direction == Direction::Downgrade && step.backward_actions(dialect).is_none() {
                return Err(EngineError::NotReversible(step.revision.to_string()));
            }
        }
        Ok(())
    }

    /// Run one step forward and advance the marker to it.
    pub fn apply(&mut self, revision: &Revision) -> Result<StepReport, EngineError> {
        self.run_step(revision, Direction::Upgrade)
    }

    /// Run one step backward and rewind the marker to its `down_revision`.
    pub fn revert(&mut self, revision: &Revision) -> Result<StepReport, EngineError> {
        self.run_step(revision, Direction::Downgrade)
    }

    pub fn upgrade(&mut self, target: &Target) -> Result<Vec<StepReport>, EngineError> {
        let plan = self.plan_upgrade(target)?;
        self.execute_plan(plan)
    }

    pub fn downgrade(&mut self, target: &Target) -> Result<Vec<StepReport>, EngineError> {
        let plan = self.plan_downgrade(target)?;
        self.execute_plan(plan)
    }

    fn execute_plan(&mut self, plan: Plan<'a>) -> Result<Vec<StepReport>, EngineError> {
        if plan.is_empty() {
            info!(
                marker = %marker_label(plan.from),
                "Nothing to {}", plan.direction
            );
            return Ok(Vec::new());
        }

        info!(
            direction = %plan.direction,
            from = %marker_label(plan.from),
            to = %marker_label(plan.to),
            steps = plan.steps.len(),
            "Planned migration"
        );

        let mut reports = Vec::new();
        let mut completed: Vec<String> = Vec::new();

        for step in &plan.steps {
            match self.run_step(step, plan.direction) {
                Ok(report) => {
                    completed.push(step.revision.to_string());
                    reports.push(report);
                }
                Err(EngineError::ActionExecution {
                    revision,
                    direction,
                    error,
                    ..
                }) => {
                    warn!(
                        revision = %revision,
                        %direction,
                        completed = completed.len(),
                        "Aborting remaining steps"
                    );
                    return Err(EngineError::ActionExecution {
                        revision,
                        direction,
                        error,
                        completed,
                    });
                }
                Err(e) => {
                    warn!(
                        revision = step.revision,
                        direction = %plan.direction,
                        completed = completed.len(),
                        error = %e,
                        "Aborting remaining steps"
                    );
                    return Err(e);
                }
            }
        }

        Ok(reports)
    }

    fn run_step(
        &mut self,
        revision: &Revision,
        direction: Direction,
    ) -> Result<StepReport, EngineError> {
        let dialect = self.store.dialect();

        let marker = self.store.read_marker()?;
        let expected = revision.marker_before(direction);
        if marker.as_deref() != expected {
            return Err(EngineError::MarkerMismatch {
                revision: revision.revision.to_string(),
                expected: marker_label(expected),
                found: marker_label(marker.as_deref()),
            });
        }

        if let Some(operation) = revision.unsupported_operation(dialect, direction) {
            return Err(EngineError::UnsupportedOperation {
                revision: revision.revision.to_string(),
                operation,
                dialect: dialect.name(),
            });
        }

        let actions = revision
            .actions(dialect, direction)
            .ok_or_else(|| EngineError::NotReversible(revision.revision.to_string()))?;

        let fail = |error: String| EngineError::ActionExecution {
            revision: revision.revision.to_string(),
            direction,
            error,
            completed: Vec::new(),
        };

        let should_wrap = dialect.supports_transactional_ddl() && revision.is_atomic();

        if should_wrap {
            self.store
                .begin()
                .map_err(|e| fail(format!("begin transaction: {}", e)))?;
        }

        let outcomes = match self.run_actions(revision, &actions) {
            Ok(outcomes) => outcomes,
            Err(e) => {
                if should_wrap {
                    let _ = self.store.rollback(); // Best effort rollback
                }
                return Err(fail(e));
            }
        };

        // Without a step transaction the marker rewrite still gets its own,
        // so a failure between its statements leaves the old marker.
        if !should_wrap {
            self.store
                .begin()
                .map_err(|e| fail(format!("begin transaction: {}", e)))?;
        }

        if let Err(e) = self.store.write_marker(revision.marker_after(direction)) {
            let _ = self.store.rollback();
            return Err(fail(format!("advance marker: {}", e)));
        }

        if let Err(e) = self.store.commit() {
            let _ = self.store.rollback();
            return Err(fail(format!("commit transaction: {}", e)));
        }

        let report = StepReport {
            revision: revision.revision.to_string(),
            direction,
            actions: outcomes,
        };

        info!(
            revision = revision.revision,
            %direction,
            marker = %marker_label(revision.marker_after(direction)),
            executed = report.executed(),
            skipped = report.skipped(),
            "{} {}",
            match direction {
                Direction::Upgrade => "Applied",
                Direction::Downgrade => "Reverted",
            },
            revision.message
        );

        Ok(report)
    }

    fn run_actions(
        &mut self,
        revision: &Revision,
        actions: &[Action],
    ) -> Result<Vec<ActionOutcome>, String> {
        let mut outcomes = Vec::with_capacity(actions.len());

        for action in actions {
            if let Some(ref probe) = action.probe {
                let satisfied = probe
                    .is_satisfied(&mut self.store)
                    .map_err(|e| format!("probe {}: {}", probe, e))?;
                if satisfied {
                    info!(
                        revision = revision.revision,
                        action = %action.description,
                        %probe,
                        "Already applied, skipping"
                    );
                    outcomes.push(ActionOutcome::AlreadyApplied {
                        description: action.description.clone(),
                        probe: probe.to_string(),
                    });
                    continue;
                }
            }

            for sql in &action.statements {
                debug!(revision = revision.revision, %sql, "Executing");
                self.store
                    .execute(sql)
                    .map_err(|e| format!("{}: {}", action.description, e))?;
            }

            outcomes.push(ActionOutcome::Executed {
                description: action.description.clone(),
                statements: action.statements.len(),
            });
        }

        Ok(outcomes)
    }

    /// Set the marker without running any action.
    pub fn stamp(&mut self, target: &Target) -> Result<Option<&'static str>, EngineError> {
        let marker = self.store.read_marker()?;
        let resolved = self.chain.resolve(marker.as_deref(), target)?;

        if let Some(ref existing) = marker {
            if Some(existing.as_str()) != resolved {
                warn!(
                    from = %existing,
                    to = %marker_label(resolved),
                    "Overwriting existing marker"
                );
            }
        }

        self.store.begin()?;
        if let Err(e) = self.store.write_marker(resolved) {
            let _ = self.store.rollback();
            return Err(e.into());
        }
        self.store.commit()?;

        info!(marker = %marker_label(resolved), "Stamped");
        Ok(resolved)
    }

    /// Render the upgrade plan as SQL without touching the schema. Probes
    /// cannot run offline, so every statement is included.
    pub fn upgrade_sql(&mut self, target: &Target) -> Result<Vec<(String, Vec<String>)>, EngineError> {
        let plan = self.plan_upgrade(target)?;
        self.render(&plan)
    }

    pub fn downgrade_sql(
        &mut self,
        target: &Target,
    ) -> Result<Vec<(String, Vec<String>)>, EngineError> {
        let plan = self.plan_downgrade(target)?;
        self.render(&plan)
    }

    fn render(&self, plan: &Plan<'_>) -> Result<Vec<(String, Vec<String>)>, EngineError> {
        let dialect = self.store.dialect();
        let table = self.store.version_table();

        plan.steps
            .iter()
            .map(|step| {
                let mut sql = match plan.direction {
                    Direction::Upgrade => step.forward_sql(dialect),
                    Direction::Downgrade => step
                        .backward_sql(dialect)
                        .ok_or_else(|| EngineError::NotReversible(step.revision.to_string()))?,
                };
                sql.extend(dialect.marker_update_sql(table, step.marker_after(plan.direction)));
                Ok((step.revision.to_string(), sql))
            })
            .collect()
    }

    /// The chain from head to root, flagging applied steps and the current one.
    pub fn history(&mut self) -> Result<Vec<HistoryEntry>, EngineError> {
        let marker = self.store.read_marker()?;
        let applied = self.chain.applied_count(marker.as_deref())?;

        Ok(self
            .chain
            .iter()
            .enumerate()
            .rev()
            .map(|(i, r)| HistoryEntry {
                revision: r.revision,
                down_revision: r.down_revision,
                message: r.message,
                applied: i < applied,
                current: i + 1 == applied,
            })
            .collect())
    }

    /// Run `f` while holding the store's advisory lock.
    pub fn with_lock<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        self.store.acquire_lock()?;
        debug!("Acquired migration lock");

        let result = f(self);

        if let Err(e) = self.store.release_lock() {
            warn!(error = %e, "Failed to release migration lock");
        }
        result
    }
}
