//! The revision chain: registration, validation and planning.
//!
//! Revisions are registered in any order into a [`RevisionRegistry`] and
//! validated once into a [`RevisionChain`], an ordered list from the root to
//! the head. Validation refuses anything other than a single linear chain;
//! duplicates and forks are never resolved automatically.
//!
//! Planning works on the number of applied steps: a marker at position `p`
//! means steps `0..=p` are applied, an absent marker means none are.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{ChainIntegrityError, EngineError};
use crate::revision::Revision;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upgrade,
    Downgrade,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upgrade => write!(f, "upgrade"),
            Direction::Downgrade => write!(f, "downgrade"),
        }
    }
}

/// Where an upgrade, downgrade or stamp should leave the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Head,
    Base,
    Revision(String),
    /// `+N` / `-N` steps from the current marker.
    Relative(i64),
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "" => Err("empty target".to_string()),
            "head" => Ok(Target::Head),
            "base" => Ok(Target::Base),
            _ if s.starts_with('+') || s.starts_with('-') => s
                .parse::<i64>()
                .map(Target::Relative)
                .map_err(|_| format!("invalid relative target: {}", s)),
            _ => Ok(Target::Revision(s.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Head => write!(f, "head"),
            Target::Base => write!(f, "base"),
            Target::Revision(revision) => write!(f, "{}", revision),
            Target::Relative(n) => write!(f, "{:+}", n),
        }
    }
}

#[derive(Debug, Default)]
pub struct RevisionRegistry {
    revisions: Vec<Revision>,
}

impl RevisionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, revision: Revision) {
        self.revisions.push(revision);
    }

    pub fn get(&self, revision: &str) -> Option<&Revision> {
        self.revisions.iter().find(|r| r.revision == revision)
    }

    pub fn all(&self) -> impl Iterator<Item = &Revision> {
        self.revisions.iter()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Check that the registered revisions form one linear chain and return
    /// their ids from root to head.
    pub fn validate(&self) -> Result<Vec<&'static str>, ChainIntegrityError> {
        let mut ids: HashSet<&'static str> = HashSet::new();
        for revision in &self.revisions {
            if !ids.insert(revision.revision) {
                return Err(ChainIntegrityError::DuplicateRevision(
                    revision.revision.to_string(),
                ));
            }
        }

        for revision in &self.revisions {
            if let Some(down) = revision.down_revision {
                if !ids.contains(down) {
                    return Err(ChainIntegrityError::Dangling {
                        revision: revision.revision.to_string(),
                        down_revision: down.to_string(),
                    });
                }
            }
        }

        let roots: Vec<&'static str> = self
            .revisions
            .iter()
            .filter(|r| r.down_revision.is_none())
            .map(|r| r.revision)
            .collect();
        if roots.len() > 1 {
            return Err(ChainIntegrityError::MultipleRoots(
                roots.iter().map(|r| r.to_string()).collect(),
            ));
        }

        let mut children: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
        for revision in &self.revisions {
            if let Some(down) = revision.down_revision {
                children.entry(down).or_default().push(revision.revision);
            }
        }
        for revision in &self.revisions {
            if let Some(kids) = children.get(revision.revision) {
                if kids.len() > 1 {
                    return Err(ChainIntegrityError::Fork {
                        parent: revision.revision.to_string(),
                        children: kids.iter().map(|k| k.to_string()).collect(),
                    });
                }
            }
        }

        if self.revisions.is_empty() {
            return Ok(Vec::new());
        }

        let root = *roots.first().ok_or(ChainIntegrityError::NoRoot)?;

        let mut order = vec![root];
        let mut current = root;
        while let Some(&next) = children.get(current).and_then(|kids| kids.first()) {
            order.push(next);
            current = next;
        }

        if order.len() != self.revisions.len() {
            let reached: HashSet<&str> = order.iter().copied().collect();
            let unreached = self
                .revisions
                .iter()
                .filter(|r| !reached.contains(r.revision))
                .map(|r| r.revision.to_string())
                .collect();
            return Err(ChainIntegrityError::Cycle(unreached));
        }

        Ok(order)
    }

    pub fn into_chain(self) -> Result<RevisionChain, ChainIntegrityError> {
        let order = self.validate()?;
        let mut by_id: HashMap<&'static str, Revision> = self
            .revisions
            .into_iter()
            .map(|r| (r.revision, r))
            .collect();

        let revisions: Vec<Revision> = order.iter().filter_map(|id| by_id.remove(id)).collect();
        let positions = revisions
            .iter()
            .enumerate()
            .map(|(i, r)| (r.revision, i))
            .collect();

        Ok(RevisionChain {
            revisions,
            positions,
        })
    }
}

/// Validated revisions ordered from root to head.
#[derive(Debug)]
pub struct RevisionChain {
    revisions: Vec<Revision>,
    positions: HashMap<&'static str, usize>,
}

/// Steps to run, in execution order.
#[derive(Debug)]
pub struct Plan<'a> {
    pub direction: Direction,
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
    pub steps: Vec<&'a Revision>,
}

impl Plan<'_> {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn revisions(&self) -> Vec<&'static str> {
        self.steps.iter().map(|r| r.revision).collect()
    }
}

impl RevisionChain {
    pub fn root(&self) -> Option<&Revision> {
        self.revisions.first()
    }

    pub fn head(&self) -> Option<&Revision> {
        self.revisions.last()
    }

    pub fn get(&self, revision: &str) -> Option<&Revision> {
        self.position(revision).map(|i| &self.revisions[i])
    }

    pub fn position(&self, revision: &str) -> Option<usize> {
        self.positions.get(revision).copied()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Revision> {
        self.revisions.iter()
    }

    /// Number of steps applied when the store carries `marker`.
    pub fn applied_count(&self, marker: Option<&str>) -> Result<usize, EngineError> {
        match marker {
            None => Ok(0),
            Some(marker) => self
                .position(marker)
                .map(|p| p + 1)
                .ok_or_else(|| EngineError::UnknownMarker {
                    marker: marker.to_string(),
                }),
        }
    }

    /// Marker value after the first `count` steps are applied.
    pub fn marker_at(&self, count: usize) -> Option<&'static str> {
        count
            .checked_sub(1)
            .and_then(|i| self.revisions.get(i))
            .map(|r| r.revision)
    }

    /// Resolve a target to the marker it denotes, relative to `marker` for
    /// `+N` / `-N`. Used by stamp.
    pub fn resolve(
        &self,
        marker: Option<&str>,
        target: &Target,
    ) -> Result<Option<&'static str>, EngineError> {
        match target {
            Target::Head => Ok(self.marker_at(self.len())),
            Target::Base => Ok(None),
            Target::Revision(revision) => {
                let position = self.require(revision)?;
                Ok(Some(self.revisions[position].revision))
            }
            Target::Relative(n) => {
                let applied = self.applied_count(marker)?;
                let goal = self.offset(applied, *n, target)?;
                Ok(self.marker_at(goal))
            }
        }
    }

    pub fn plan_upgrade(
        &self,
        marker: Option<&str>,
        target: &Target,
    ) -> Result<Plan<'_>, EngineError> {
        let applied = self.applied_count(marker)?;
        let goal = match target {
            Target::Head => self.len(),
            Target::Base => 0,
            Target::Revision(revision) => self.require(revision)? + 1,
            Target::Relative(n) => self.offset(applied, *n, target)?,
        };

        if goal < applied {
            return Err(EngineError::InvalidTarget {
                target: target.to_string(),
                reason: "target is behind the current marker; use downgrade".to_string(),
            });
        }

        Ok(Plan {
            direction: Direction::Upgrade,
            from: self.marker_at(applied),
            to: self.marker_at(goal),
            steps: self.revisions[applied..goal].iter().collect(),
        })
    }

    /// Downgrades are inclusive: reverting to revision `T` reverts `T` itself
    /// and leaves the marker at `T.down_revision`.
    pub fn plan_downgrade(
        &self,
        marker: Option<&str>,
        target: &Target,
    ) -> Result<Plan<'_>, EngineError> {
        let applied = self.applied_count(marker)?;
        let goal = match target {
            Target::Base => 0,
            Target::Head => self.len(),
            Target::Revision(revision) => {
                let position = self.require(revision)?;
                if position >= applied {
                    return Err(EngineError::InvalidTarget {
                        target: target.to_string(),
                        reason: format!("revision {} is not applied", revision),
                    });
                }
                position
            }
            Target::Relative(n) => self.offset(applied, *n, target)?,
        };

        if goal > applied {
            return Err(EngineError::InvalidTarget {
                target: target.to_string(),
                reason: "target is ahead of the current marker; use upgrade".to_string(),
            });
        }

        let steps: Vec<&Revision> = self.revisions[goal..applied].iter().rev().collect();
        if let Some(step) = steps.iter().find(|step| !step.is_reversible()) {
            return Err(EngineError::NotReversible(step.revision.to_string()));
        }

        Ok(Plan {
            direction: Direction::Downgrade,
            from: self.marker_at(applied),
            to: self.marker_at(goal),
            steps,
        })
    }

    fn require(&self, revision: &str) -> Result<usize, EngineError> {
        self.position(revision)
            .ok_or_else(|| EngineError::UnknownRevision(revision.to_string()))
    }

    fn offset(&self, applied: usize, n: i64, target: &Target) -> Result<usize, EngineError> {
        let goal = i64::try_from(applied).ok().and_then(|a| a.checked_add(n));
        match goal.and_then(|g| usize::try_from(g).ok()) {
            Some(goal) if goal <= self.len() => Ok(goal),
            _ => Err(EngineError::InvalidTarget {
                target: target.to_string(),
                reason: format!(
                    "{} steps applied of {}; relative target is out of range",
                    applied,
                    self.len()
                ),
            }),
        }
    }
}
