// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C6 DAG Builder (spec §4.1).
//!
//! A pure, deterministic function: `Job` parameters in, an ordered
//! task list with explicit dependency edges out (P8). Engine selection
//! happens here too — the resolved `engine_id` for each stage is
//! stamped on its task so the scheduler never has to re-derive it.

use std::collections::HashMap;
use tx_wire::{
    DependencyEdge, EngineId, Job, JobParameters, PiiDetectionTier, RedactionMode, SpeakerDetection, Stage,
    Task, TaskId, TaskStatus, TimestampGranularity,
};

/// Default per-task retry cap (spec §6 "max_retries").
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Maps a `(stage, model)` pair, as named on `JobParameters.model`, to a
/// concrete engine identity. The table itself is operator-authored
/// configuration; an unresolved pair still produces a task (stamped
/// with a synthesized id), deferring the "no live engine" decision to
/// dispatch time (spec §4.3 "Required engine absent") rather than
/// treating it as a build-time configuration error.
#[derive(Debug, Clone, Default)]
pub struct EngineVariantTable {
    variants: HashMap<(Stage, String), EngineId>,
}

impl EngineVariantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, stage: Stage, model: impl Into<String>, engine_id: EngineId) -> Self {
        self.variants.insert((stage, model.into()), engine_id);
        self
    }

    pub fn resolve(&self, stage: Stage, model: &str) -> EngineId {
        self.variants
            .get(&(stage, model.to_string()))
            .cloned()
            .unwrap_or_else(|| EngineId::new(format!("{stage}:{model}")))
    }
}

fn stage_required(stage: Stage) -> bool {
    matches!(stage, Stage::Prepare | Stage::Transcribe | Stage::Merge)
}

fn included_stages(params: &JobParameters) -> Result<Vec<Stage>, txctl_core::StageError> {
    let include_align = params.timestamps_granularity == TimestampGranularity::Word;
    let include_diarize = params.speaker_detection == SpeakerDetection::Diarize;
    let include_pii = params.pii_detection.requires_pii_detect();
    let include_redact = params.redact_pii_audio != RedactionMode::None;

    if include_pii && !include_align {
        return Err(config_error(
            "pii_detect requires timestamps_granularity=word to produce the align output it consumes",
        ));
    }
    if include_redact && !include_pii {
        return Err(config_error("redact_pii_audio requires pii_detection to be enabled"));
    }

    let mut stages = vec![Stage::Prepare, Stage::Transcribe];
    if include_align {
        stages.push(Stage::Align);
    }
    if include_diarize {
        stages.push(Stage::Diarize);
    }
    if include_pii {
        stages.push(Stage::PiiDetect);
    }
    if include_redact {
        stages.push(Stage::AudioRedact);
    }
    stages.push(Stage::Merge);
    Ok(stages)
}

fn config_error(message: &str) -> txctl_core::StageError {
    txctl_core::StageError::new(txctl_core::ErrorKind::ConfigurationError, "dag_builder", message)
}

/// Builds the task graph for `job` (spec §4.1). Deterministic: the same
/// `job.parameters` always produce the same stage set, edges, and
/// `required` flags (P8) — only the generated `TaskId`s vary per call.
pub fn build_dag(job: &Job, table: &EngineVariantTable) -> Result<Vec<Task>, txctl_core::StageError> {
    let stages = included_stages(&job.parameters)?;
    let included: std::collections::HashSet<Stage> = stages.iter().copied().collect();

    let mut ids: HashMap<Stage, TaskId> = HashMap::new();
    for stage in &stages {
        ids.insert(*stage, TaskId::new());
    }

    let edge = |stage: Stage, required_for_downstream: bool| DependencyEdge {
        depends_on: ids[&stage],
        required_for_downstream,
    };

    let mut tasks = Vec::with_capacity(stages.len());
    for stage in &stages {
        let dependencies = match stage {
            Stage::Prepare => Vec::new(),
            Stage::Transcribe => vec![edge(Stage::Prepare, true)],
            Stage::Align => vec![edge(Stage::Transcribe, true)],
            Stage::Diarize => vec![edge(Stage::Prepare, true)],
            Stage::PiiDetect => {
                let mut deps = vec![edge(Stage::Align, true)];
                if included.contains(&Stage::Diarize) {
                    // Enriching dependency (Open Question resolution):
                    // pii_detect still runs, without speaker attribution,
                    // if diarize was skipped.
                    deps.push(edge(Stage::Diarize, false));
                }
                deps
            }
            Stage::AudioRedact => vec![edge(Stage::PiiDetect, true)],
            Stage::Merge => stages
                .iter()
                .filter(|s| **s != Stage::Merge)
                .map(|s| edge(*s, stage_required(*s)))
                .collect(),
        };

        tasks.push(Task {
            id: ids[stage],
            job_id: job.id,
            stage: *stage,
            engine_id: table.resolve(*stage, &job.parameters.model),
            status: TaskStatus::Pending,
            required: stage_required(*stage),
            attempts: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            dependencies,
            input_artifact_uri: None,
            output_artifact_uri: None,
            queued_at_ms: None,
            started_at_ms: None,
            completed_at_ms: None,
            error: None,
            correlation: job.correlation.clone(),
        });
    }

    Ok(tasks)
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
