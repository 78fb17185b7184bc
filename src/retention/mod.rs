//! Retention engine: evaluates per-data-type retention policies and applies
//! the resulting decisions.
//!
//! `evaluate` is pure over a policy table and a timestamp; `apply` performs
//! deletions, running a covering backup first wherever the policy demands
//! one. Retention never deletes data it could not first preserve: a failed
//! covering backup defers the deletion to a later run instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backup::{ArtifactStatus, BackupEngine, BackupScope};
use crate::error::Result;
use crate::record::{DataType, OwnerId};
use crate::store::{LiveStore, RecordFilter};

/// Retention policy for one data-type category. Configuration data, created
/// by an administrator-facing operation, read-only during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub data_type: DataType,
    pub retention_days: u32,
    pub auto_delete: bool,
    pub backup_before_delete: bool,
}

impl RetentionPolicy {
    /// Default policy table. Financial and ledger data keep the longest
    /// windows; nothing is auto-deleted until an administrator opts in.
    pub fn defaults() -> Vec<RetentionPolicy> {
        let entry = |data_type, retention_days| RetentionPolicy {
            data_type,
            retention_days,
            auto_delete: false,
            backup_before_delete: true,
        };
        vec![
            entry(DataType::UserProfiles, 2555),
            entry(DataType::AuctionItems, 1825),
            entry(DataType::Bids, 1825),
            entry(DataType::Payments, 2555),
            entry(DataType::Orders, 1825),
            entry(DataType::WalletTransactions, 2555),
            entry(DataType::LedgerBlocks, 3650),
            entry(DataType::AuctionParticipants, 1095),
        ]
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.retention_days))
    }
}

/// What to do with one record past its retention cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionAction {
    Keep,
    BackupThenDelete,
    Delete,
}

/// Decision for a single record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionDecision {
    pub record_id: Uuid,
    pub data_type: DataType,
    pub owner: OwnerId,
    pub last_modified: DateTime<Utc>,
    pub action: RetentionAction,
}

/// Outcome of applying a decision batch.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RetentionReport {
    pub evaluated: usize,
    pub kept: usize,
    pub deleted: Vec<Uuid>,
    /// Decisions whose prerequisite backup (or deletion) did not succeed;
    /// expected to resolve on a later run.
    pub deferred: Vec<Uuid>,
    /// Locations of the covering artifacts created during this run.
    pub covering_artifacts: Vec<String>,
}

/// Retention engine over the live store, delegating pre-delete backups to
/// the backup engine.
pub struct RetentionEngine {
    live: Arc<dyn LiveStore>,
    backup: Arc<BackupEngine>,
}

impl RetentionEngine {
    pub fn new(live: Arc<dyn LiveStore>, backup: Arc<BackupEngine>) -> Self {
        Self { live, backup }
    }

    /// Identify records past their policy cutoff and decide their fate.
    ///
    /// Only records strictly older than the cutoff appear in the output.
    /// Policies with `auto_delete=false` produce `Keep` decisions, so a
    /// report-only run still shows what would be deleted.
    pub async fn evaluate(
        &self,
        policies: &[RetentionPolicy],
        now: DateTime<Utc>,
    ) -> Result<Vec<RetentionDecision>> {
        let mut decisions = Vec::new();

        for policy in policies {
            let cutoff = policy.cutoff(now);
            let expired = self
                .live
                .fetch(
                    policy.data_type,
                    RecordFilter {
                        modified_until: Some(cutoff),
                        ..Default::default()
                    },
                )
                .await?;

            for record in expired {
                if record.last_modified >= cutoff {
                    continue;
                }
                let action = if !policy.auto_delete {
                    RetentionAction::Keep
                } else if policy.backup_before_delete {
                    RetentionAction::BackupThenDelete
                } else {
                    RetentionAction::Delete
                };
                decisions.push(RetentionDecision {
                    record_id: record.id,
                    data_type: record.data_type,
                    owner: record.owner,
                    last_modified: record.last_modified,
                    action,
                });
            }
        }

        info!(decisions = decisions.len(), "retention evaluation complete");
        Ok(decisions)
    }

    /// Apply a decision batch.
    ///
    /// Backup-then-delete records are grouped by owner and covered by a
    /// user-scoped backup; deletion only proceeds once that artifact is
    /// `Complete`. Anything that could not be preserved first is deferred,
    /// never silently dropped.
    pub async fn apply(&self, decisions: Vec<RetentionDecision>) -> Result<RetentionReport> {
        let mut report = RetentionReport {
            evaluated: decisions.len(),
            ..Default::default()
        };

        let mut guarded: BTreeMap<OwnerId, Vec<RetentionDecision>> = BTreeMap::new();
        let mut direct = Vec::new();

        for decision in decisions {
            match decision.action {
                RetentionAction::Keep => report.kept += 1,
                RetentionAction::BackupThenDelete => {
                    guarded.entry(decision.owner).or_default().push(decision)
                }
                RetentionAction::Delete => direct.push(decision),
            }
        }

        for (owner, batch) in guarded {
            match self.backup.run_backup(BackupScope::User { owner }, true).await {
                Ok(artifact) if artifact.status == ArtifactStatus::Complete => {
                    report.covering_artifacts.push(artifact.location.clone());
                    for decision in batch {
                        self.delete_or_defer(decision, &mut report).await;
                    }
                }
                Ok(artifact) => {
                    warn!(
                        owner,
                        artifact_id = %artifact.id,
                        "covering backup did not complete, deferring deletions"
                    );
                    report.deferred.extend(batch.into_iter().map(|d| d.record_id));
                }
                Err(e) => {
                    warn!(owner, error = %e, "covering backup failed, deferring deletions");
                    report.deferred.extend(batch.into_iter().map(|d| d.record_id));
                }
            }
        }

        for decision in direct {
            self.delete_or_defer(decision, &mut report).await;
        }

        info!(
            deleted = report.deleted.len(),
            deferred = report.deferred.len(),
            kept = report.kept,
            "retention apply complete"
        );
        Ok(report)
    }

    async fn delete_or_defer(&self, decision: RetentionDecision, report: &mut RetentionReport) {
        match self
            .live
            .delete(decision.data_type, decision.record_id)
            .await
        {
            Ok(true) => report.deleted.push(decision.record_id),
            // Already gone: nothing to re-delete, nothing to report.
            Ok(false) => {}
            Err(e) => {
                warn!(record_id = %decision.record_id, error = %e, "deletion failed, deferred");
                report.deferred.push(decision.record_id);
            }
        }
    }
}
