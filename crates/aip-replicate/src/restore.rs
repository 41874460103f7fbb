use std::fs;
use std::path::Path;

use aip_pack::{ObjectProperties, Pack, PackContext, Packer, PackerError};
use aip_types::{DigitalObject, Handle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ReplicateError, ReplicateResult};
use crate::manager::ReplicaManager;

/// How a package is merged into the live repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMode {
    /// Clear an existing object's fields, then apply the package. Missing
    /// objects are created.
    Replace,
    /// Create and apply only where the object is absent. An existing object
    /// fails.
    Restore,
    /// Apply package fields over an existing object without clearing it.
    /// Missing objects are created.
    KeepExisting,
}

/// Settings for one restore invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOptions {
    pub mode: RestoreMode,
    /// Follow each restored object's recorded children, parent first.
    pub recursive: bool,
    pub create_metadata_fields: bool,
    /// Skip (instead of failing) objects whose recorded owner is not live.
    pub skip_if_parent_missing: bool,
}

impl RestoreOptions {
    pub fn new(mode: RestoreMode) -> Self {
        Self {
            mode,
            recursive: false,
            create_metadata_fields: false,
            skip_if_parent_missing: false,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn skip_if_parent_missing(mut self, skip: bool) -> Self {
        self.skip_if_parent_missing = skip;
        self
    }

    pub fn create_metadata_fields(mut self, create: bool) -> Self {
        self.create_metadata_fields = create;
        self
    }
}

/// What happened to one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ObjectOutcome {
    Created,
    Replaced,
    Merged,
    Skipped { reason: String },
    Failed { reason: String },
}

impl ObjectOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Overall state of a restore that ran to completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreStatus {
    /// Every target was restored or skipped by policy.
    Success,
    /// At least one object failed. Failures are not retried.
    PartialFailure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RestoreEntry {
    pub handle: Handle,
    #[serde(flatten)]
    pub outcome: ObjectOutcome,
}

/// Per-object outcomes in visit order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub entries: Vec<RestoreEntry>,
}

impl RestoreReport {
    pub fn status(&self) -> RestoreStatus {
        if self.entries.iter().any(|e| e.outcome.is_failure()) {
            RestoreStatus::PartialFailure
        } else {
            RestoreStatus::Success
        }
    }

    pub fn outcome(&self, handle: &Handle) -> Option<&ObjectOutcome> {
        self.entries
            .iter()
            .find(|e| &e.handle == handle)
            .map(|e| &e.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RestoreEntry> {
        self.entries.iter().filter(|e| e.outcome.is_failure())
    }

    fn record(&mut self, handle: &Handle, outcome: ObjectOutcome) {
        self.entries.push(RestoreEntry {
            handle: handle.clone(),
            outcome,
        });
    }
}

/// Walks replicas back into the live repository under one [`RestoreMode`].
///
/// Targets are visited in order. With `recursive` set, the children recorded
/// in each restored package follow depth-first, so an owner is always live
/// before its children are checked. A package that cannot be read stops the
/// walk with an error; any other problem is recorded against the object and
/// its subtree is not visited.
pub struct RestoreReconciler<'a> {
    manager: &'a ReplicaManager,
    ctx: PackContext,
    options: RestoreOptions,
}

impl<'a> RestoreReconciler<'a> {
    pub fn new(manager: &'a ReplicaManager, options: RestoreOptions) -> Self {
        let mut ctx = manager.context().clone();
        ctx.options.create_metadata_fields = options.create_metadata_fields;
        Self {
            manager,
            ctx,
            options,
        }
    }

    pub fn run(&self, targets: &[Handle]) -> ReplicateResult<RestoreReport> {
        let mut report = RestoreReport::default();
        let mut stack: Vec<Handle> = targets.iter().rev().cloned().collect();
        while let Some(handle) = stack.pop() {
            let children = self.visit(&handle, &mut report)?;
            if self.options.recursive {
                stack.extend(children.into_iter().rev());
            }
        }
        info!(
            mode = ?self.options.mode,
            objects = report.entries.len(),
            status = ?report.status(),
            "restore finished"
        );
        Ok(report)
    }

    /// Restore one object and return the children to visit next.
    fn visit(&self, handle: &Handle, report: &mut RestoreReport) -> ReplicateResult<Vec<Handle>> {
        let archive = match self.manager.fetch(handle) {
            Ok(path) => path,
            Err(ReplicateError::MissingReplica(_)) => {
                warn!(%handle, "no replica to restore");
                report.record(
                    handle,
                    ObjectOutcome::Failed {
                        reason: "no replica in store".into(),
                    },
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let result = self.apply(handle, &archive, report);
        match fs::remove_file(&archive) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %archive.display(), error = %e, "failed to remove fetched archive"),
        }
        result
    }

    fn apply(
        &self,
        handle: &Handle,
        archive: &Path,
        report: &mut RestoreReport,
    ) -> ReplicateResult<Vec<Handle>> {
        let props = self.read_properties(handle, archive)?;
        let repository = &self.ctx.repository;

        if let Some(owner) = &props.owner {
            if !repository.exists(owner)? {
                let err = PackerError::MissingParent(owner.clone());
                if self.options.skip_if_parent_missing {
                    info!(%handle, %owner, "parent not live, skipping");
                    report.record(
                        handle,
                        ObjectOutcome::Skipped {
                            reason: err.to_string(),
                        },
                    );
                } else {
                    warn!(%handle, %owner, "parent not live");
                    report.record(
                        handle,
                        ObjectOutcome::Failed {
                            reason: err.to_string(),
                        },
                    );
                }
                return Ok(Vec::new());
            }
        }

        match self.reconcile(&props, archive) {
            Ok(outcome) => {
                debug!(%handle, ?outcome, "object restored");
                report.record(handle, outcome);
                Ok(props.children)
            }
            Err(e) => {
                warn!(%handle, error = %e, "object restore failed");
                report.record(
                    handle,
                    ObjectOutcome::Failed {
                        reason: e.to_string(),
                    },
                );
                Ok(Vec::new())
            }
        }
    }

    fn read_properties(&self, handle: &Handle, archive: &Path) -> ReplicateResult<ObjectProperties> {
        let unreadable = |source: PackerError| ReplicateError::Unreadable {
            handle: handle.clone(),
            source,
        };
        let mut reader = self.ctx.open_package(archive).map_err(unreadable)?;
        let props = ObjectProperties::read(&reader).map_err(unreadable);
        reader.clean().map_err(|e| unreadable(e.into()))?;
        let props = props?;
        if &props.handle != handle {
            return Err(unreadable(PackerError::Properties(format!(
                "replica of {handle} describes {}",
                props.handle
            ))));
        }
        Ok(props)
    }

    fn reconcile(&self, props: &ObjectProperties, archive: &Path) -> Result<ObjectOutcome, PackerError> {
        let repository = &self.ctx.repository;
        let handle = &props.handle;
        let existing = repository.find(handle)?;
        let outcome = match (existing, self.options.mode) {
            (Some(_), RestoreMode::Restore) => {
                return Err(PackerError::AlreadyExists(handle.clone()))
            }
            (Some(live), mode) => {
                check_kind(&live, props)?;
                if mode == RestoreMode::Replace {
                    repository.clear(handle)?;
                    ObjectOutcome::Replaced
                } else {
                    ObjectOutcome::Merged
                }
            }
            (None, _) => {
                repository.create(props.kind, handle, props.owner.as_ref())?;
                ObjectOutcome::Created
            }
        };
        Packer::for_kind(props.kind, handle.clone()).unpack(&self.ctx, archive)?;
        Ok(outcome)
    }
}

fn check_kind(live: &DigitalObject, props: &ObjectProperties) -> Result<(), PackerError> {
    if live.kind != props.kind {
        return Err(PackerError::KindMismatch {
            expected: props.kind,
            found: live.kind,
        });
    }
    Ok(())
}
