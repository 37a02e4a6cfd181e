//! Declarative pipeline schema (version 1)
//!
//! This is the human-authored document accepted by the import endpoints:
//!
//! ```yaml
//! version: v1.0
//! name: build
//! stages: [compile, package]
//! jobs:
//!   - job: make
//!     stage: compile
//!     steps:
//!       - script: make all
//! ```
//!
//! A document may also declare `steps` at the top level instead of `jobs`;
//! they then form a single job in a single stage.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::pipeline::{
    Action, ActionKind, Job, Parameter, ParameterType, Pipeline, Requirement, Stage,
};

pub const PIPELINE_VERSION_1: &str = "v1.0";

/// Stage and job name used by the top-level `steps` shorthand
pub const DEFAULT_STAGE_NAME: &str = "Build";

/// Structural problems found while converting a document to a [`Pipeline`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("unsupported pipeline version {0}")]
    UnsupportedVersion(String),

    #[error("pipeline name is missing")]
    MissingName,

    #[error("stage {0} is declared more than once")]
    DuplicateStage(String),

    #[error("stage {0} is not declared")]
    UnknownStage(String),

    #[error("job {0} does not name a stage")]
    JobWithoutStage(String),

    #[error("job {job} is declared more than once in stage {stage}")]
    DuplicateJob { job: String, stage: String },

    #[error("top-level steps cannot be combined with jobs")]
    StepsWithJobs,

    #[error("top-level steps need at most one stage, {0} declared")]
    StepsWithManyStages(usize),

    #[error("step {index} of job {job} must declare exactly one of script or action")]
    InvalidStep { job: String, index: usize },
}

/// On-the-wire pipeline document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineV1 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParameterV1>,

    /// Stage names in execution order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, StageOptionsV1>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jobs: Vec<JobV1>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepV1>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterV1 {
    #[serde(rename = "type", default)]
    pub param_type: ParameterType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageOptionsV1 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conditions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobV1 {
    pub job: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Each entry maps a requirement kind to its value, e.g. `binary: git`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepV1>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepV1 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptV1>,

    /// Name of a builtin action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_executed: Option<bool>,
}

/// A script given as one string or as a list of lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptV1 {
    Line(String),
    Lines(Vec<String>),
}

impl ScriptV1 {
    fn into_lines(self) -> Vec<String> {
        match self {
            ScriptV1::Line(line) => vec![line],
            ScriptV1::Lines(lines) => lines,
        }
    }
}

impl PipelineV1 {
    /// Converts the document into an unsaved internal pipeline
    pub fn to_domain(&self) -> Result<Pipeline, ConversionError> {
        if let Some(version) = &self.version {
            if version != PIPELINE_VERSION_1 {
                return Err(ConversionError::UnsupportedVersion(version.clone()));
            }
        }

        if self.name.trim().is_empty() {
            return Err(ConversionError::MissingName);
        }

        let mut pipeline = Pipeline::new(self.name.trim());
        pipeline.description = self.description.clone();
        pipeline.parameters = self
            .parameters
            .iter()
            .map(|(name, p)| Parameter {
                name: name.clone(),
                param_type: p.param_type,
                value: p.default.clone().unwrap_or_default(),
                description: p.description.clone(),
            })
            .collect();

        let jobs = self.effective_jobs()?;
        let stage_names = self.stage_names(&jobs)?;

        for name in self.options.keys() {
            if !stage_names.contains(name) {
                return Err(ConversionError::UnknownStage(name.clone()));
            }
        }

        let mut stages: Vec<Stage> = stage_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let options = self.options.get(name).cloned().unwrap_or_default();
                Stage {
                    name: name.clone(),
                    build_order: i as u32 + 1,
                    enabled: options.enabled.unwrap_or(true),
                    conditions: options.conditions,
                    jobs: Vec::new(),
                }
            })
            .collect();

        for job in jobs {
            let stage_name = resolve_stage(&job, &stage_names)?;
            let stage = stages
                .iter_mut()
                .find(|s| s.name == stage_name)
                .ok_or_else(|| ConversionError::UnknownStage(stage_name.clone()))?;

            if stage.jobs.iter().any(|j| j.name == job.job) {
                return Err(ConversionError::DuplicateJob {
                    job: job.job.clone(),
                    stage: stage_name,
                });
            }
            stage.jobs.push(job_to_domain(job)?);
        }

        pipeline.stages = stages;
        Ok(pipeline)
    }

    /// Builds the document describing an internal pipeline
    pub fn from_domain(pipeline: &Pipeline) -> Self {
        let parameters = pipeline
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    ParameterV1 {
                        param_type: p.param_type,
                        default: (!p.value.is_empty()).then(|| p.value.clone()),
                        description: p.description.clone(),
                    },
                )
            })
            .collect();

        let mut stages_by_order: Vec<&Stage> = pipeline.stages.iter().collect();
        stages_by_order.sort_by_key(|s| s.build_order);

        let options = stages_by_order
            .iter()
            .filter(|s| !s.enabled || !s.conditions.is_empty())
            .map(|s| {
                (
                    s.name.clone(),
                    StageOptionsV1 {
                        enabled: (!s.enabled).then_some(false),
                        conditions: s.conditions.clone(),
                    },
                )
            })
            .collect();

        let jobs = stages_by_order
            .iter()
            .flat_map(|s| s.jobs.iter().map(move |j| job_from_domain(j, &s.name)))
            .collect();

        Self {
            version: Some(PIPELINE_VERSION_1.to_string()),
            name: pipeline.name.clone(),
            description: pipeline.description.clone(),
            parameters,
            stages: stages_by_order.iter().map(|s| s.name.clone()).collect(),
            options,
            jobs,
            steps: Vec::new(),
        }
    }

    /// Jobs of the document, expanding the top-level `steps` shorthand
    fn effective_jobs(&self) -> Result<Vec<JobV1>, ConversionError> {
        if self.steps.is_empty() {
            return Ok(self.jobs.clone());
        }
        if !self.jobs.is_empty() {
            return Err(ConversionError::StepsWithJobs);
        }
        if self.stages.len() > 1 {
            return Err(ConversionError::StepsWithManyStages(self.stages.len()));
        }

        let stage = self
            .stages
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_STAGE_NAME.to_string());
        Ok(vec![JobV1 {
            job: DEFAULT_STAGE_NAME.to_string(),
            stage: Some(stage),
            steps: self.steps.clone(),
            ..Default::default()
        }])
    }

    /// Declared stages, or the stages referenced by jobs when none are declared
    fn stage_names(&self, jobs: &[JobV1]) -> Result<Vec<String>, ConversionError> {
        let mut seen = HashSet::new();

        if !self.stages.is_empty() {
            for name in &self.stages {
                if !seen.insert(name.as_str()) {
                    return Err(ConversionError::DuplicateStage(name.clone()));
                }
            }
            return Ok(self.stages.clone());
        }

        let mut names = Vec::new();
        for job in jobs {
            let name = job.stage.as_deref().unwrap_or(DEFAULT_STAGE_NAME);
            if seen.insert(name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

fn resolve_stage(job: &JobV1, stage_names: &[String]) -> Result<String, ConversionError> {
    match &job.stage {
        Some(stage) if stage_names.contains(stage) => Ok(stage.clone()),
        Some(stage) => Err(ConversionError::UnknownStage(stage.clone())),
        None if stage_names.len() == 1 => Ok(stage_names[0].clone()),
        None => Err(ConversionError::JobWithoutStage(job.job.clone())),
    }
}

fn job_to_domain(job: JobV1) -> Result<Job, ConversionError> {
    let requirements = job
        .requirements
        .into_iter()
        .flat_map(|entry| entry.into_iter())
        .map(|(kind, value)| Requirement { kind, value })
        .collect();

    let steps = job
        .steps
        .into_iter()
        .enumerate()
        .map(|(index, step)| step_to_domain(step, &job.job, index))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Job {
        name: job.job,
        description: job.description,
        enabled: job.enabled.unwrap_or(true),
        requirements,
        steps,
    })
}

fn step_to_domain(step: StepV1, job: &str, index: usize) -> Result<Action, ConversionError> {
    let (default_name, kind) = match (step.script, step.action) {
        (Some(script), None) => (
            "Script".to_string(),
            ActionKind::Script {
                lines: script.into_lines(),
            },
        ),
        (None, Some(action)) => (
            action.clone(),
            ActionKind::Builtin {
                action,
                params: step.with,
            },
        ),
        _ => {
            return Err(ConversionError::InvalidStep {
                job: job.to_string(),
                index,
            });
        }
    };

    Ok(Action {
        name: step.name.unwrap_or(default_name),
        kind,
        enabled: step.enabled.unwrap_or(true),
        optional: step.optional.unwrap_or(false),
        always_executed: step.always_executed.unwrap_or(false),
    })
}

fn job_from_domain(job: &Job, stage: &str) -> JobV1 {
    JobV1 {
        job: job.name.clone(),
        stage: Some(stage.to_string()),
        description: job.description.clone(),
        enabled: (!job.enabled).then_some(false),
        requirements: job
            .requirements
            .iter()
            .map(|r| BTreeMap::from([(r.kind.clone(), r.value.clone())]))
            .collect(),
        steps: job.steps.iter().map(step_from_domain).collect(),
    }
}

fn step_from_domain(action: &Action) -> StepV1 {
    let (script, name, builtin, with) = match &action.kind {
        ActionKind::Script { lines } => {
            let script = match lines.as_slice() {
                [line] => ScriptV1::Line(line.clone()),
                _ => ScriptV1::Lines(lines.clone()),
            };
            (Some(script), action.name != "Script", None, BTreeMap::new())
        }
        ActionKind::Builtin { action: a, params } => {
            (None, action.name != *a, Some(a.clone()), params.clone())
        }
    };

    StepV1 {
        name: name.then(|| action.name.clone()),
        script,
        action: builtin,
        with,
        enabled: (!action.enabled).then_some(false),
        optional: action.optional.then_some(true),
        always_executed: action.always_executed.then_some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::format::{Format, decode};

    fn parse(doc: &str) -> PipelineV1 {
        decode(doc.as_bytes(), Format::Yaml).unwrap()
    }

    #[test]
    fn test_minimal_document() {
        let pipeline = parse("name: build\nstages: [compile]\n").to_domain().unwrap();

        assert_eq!(pipeline.name, "build");
        assert_eq!(pipeline.stages.len(), 1);
        assert_eq!(pipeline.stages[0].name, "compile");
        assert_eq!(pipeline.stages[0].build_order, 1);
        assert!(pipeline.stages[0].enabled);
        assert!(!pipeline.is_persisted());
    }

    #[test]
    fn test_jobs_are_attached_to_their_stage() {
        let doc = r#"
name: build
stages: [compile, test]
options:
  test:
    enabled: false
jobs:
  - job: unit
    stage: test
    steps:
      - script: cargo test
  - job: make
    stage: compile
    requirements:
      - binary: cargo
    steps:
      - action: checkout
        with:
          depth: "1"
      - name: build
        script: [cargo build, cargo doc]
"#;
        let pipeline = parse(doc).to_domain().unwrap();

        let compile = pipeline.stage("compile").unwrap();
        assert_eq!(compile.jobs.len(), 1);
        let make = &compile.jobs[0];
        assert_eq!(
            make.requirements,
            vec![Requirement {
                kind: "binary".to_string(),
                value: "cargo".to_string()
            }]
        );
        assert_eq!(make.steps[0].name, "checkout");
        assert!(matches!(
            &make.steps[0].kind,
            ActionKind::Builtin { action, params } if action == "checkout" && params["depth"] == "1"
        ));
        assert_eq!(make.steps[1].name, "build");
        assert!(matches!(
            &make.steps[1].kind,
            ActionKind::Script { lines } if lines.len() == 2
        ));

        let test = pipeline.stage("test").unwrap();
        assert!(!test.enabled);
        assert_eq!(test.build_order, 2);
        assert_eq!(test.jobs[0].name, "unit");
    }

    #[test]
    fn test_top_level_steps_shorthand() {
        let pipeline = parse("name: quick\nsteps:\n  - script: echo hi\n")
            .to_domain()
            .unwrap();

        assert_eq!(pipeline.stages.len(), 1);
        assert_eq!(pipeline.stages[0].name, DEFAULT_STAGE_NAME);
        assert_eq!(pipeline.stages[0].jobs[0].name, DEFAULT_STAGE_NAME);
        assert_eq!(pipeline.job_count(), 1);
    }

    #[test]
    fn test_stages_inferred_from_jobs() {
        let doc = "name: p\njobs:\n  - job: a\n    stage: one\n  - job: b\n    stage: two\n  - job: c\n    stage: one\n";
        let pipeline = parse(doc).to_domain().unwrap();

        let names: Vec<_> = pipeline.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(pipeline.stage("one").unwrap().jobs.len(), 2);
    }

    #[test]
    fn test_structural_errors() {
        let cases = [
            ("version: v2.0\nname: p\n", ConversionError::UnsupportedVersion("v2.0".into())),
            ("stages: [a]\n", ConversionError::MissingName),
            ("name: p\nstages: [a, a]\n", ConversionError::DuplicateStage("a".into())),
            (
                "name: p\nstages: [a]\njobs:\n  - job: j\n    stage: b\n",
                ConversionError::UnknownStage("b".into()),
            ),
            (
                "name: p\nstages: [a]\noptions:\n  b:\n    enabled: false\n",
                ConversionError::UnknownStage("b".into()),
            ),
            (
                "name: p\nstages: [a, b]\njobs:\n  - job: j\n",
                ConversionError::JobWithoutStage("j".into()),
            ),
            (
                "name: p\nstages: [a]\njobs:\n  - job: j\n  - job: j\n",
                ConversionError::DuplicateJob {
                    job: "j".into(),
                    stage: "a".into(),
                },
            ),
            (
                "name: p\nsteps:\n  - script: x\njobs:\n  - job: j\n",
                ConversionError::StepsWithJobs,
            ),
            (
                "name: p\nstages: [a]\njobs:\n  - job: j\n    steps:\n      - name: empty\n",
                ConversionError::InvalidStep {
                    job: "j".into(),
                    index: 0,
                },
            ),
        ];

        for (doc, expected) in cases {
            assert_eq!(parse(doc).to_domain().unwrap_err(), expected, "{doc}");
        }
    }

    #[test]
    fn test_export_then_import_preserves_pipeline() {
        let doc = r#"
name: release
description: Ship it
parameters:
  tag:
    type: string
    default: latest
stages: [build, deploy]
options:
  deploy:
    conditions:
      git.branch: main
jobs:
  - job: image
    stage: build
    steps:
      - script: docker build .
        optional: true
  - job: push
    stage: deploy
    enabled: false
    steps:
      - action: deploy
        name: Rollout
        with:
          target: prod
"#;
        let pipeline = parse(doc).to_domain().unwrap();
        let exported = PipelineV1::from_domain(&pipeline);
        assert_eq!(exported.version.as_deref(), Some(PIPELINE_VERSION_1));

        let mut reimported = exported.to_domain().unwrap();
        reimported.created_at = pipeline.created_at;
        reimported.updated_at = pipeline.updated_at;
        assert_eq!(reimported, pipeline);
    }
}
