//! [`Sequence`]: a validated stage DAG plus the per-stage start times derived
//! from it. Construction is the only place a cyclic graph can fail — once a
//! `Sequence` exists, playback cannot encounter one.

use crate::stage::{Stage, StageId};
use galileo_events::AnimationCategory;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Never,
    Times(u32),
    Infinite,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    #[error("duplicate stage id: {0}")]
    DuplicateStageId(StageId),
    #[error("stage {stage} depends on unknown stage {dependency}")]
    UnknownDependency { stage: StageId, dependency: StageId },
    #[error("stage dependency graph contains a cycle")]
    CyclicDependency,
}

/// A validated stage graph: construction is the only fallible operation,
/// matching spec's "cycle ⇒ sequence rejected" / "fail construction, not
/// play" split between unrecoverable and recoverable errors.
pub struct Sequence {
    pub id: String,
    pub category: AnimationCategory,
    pub autoplay: bool,
    pub loop_mode: LoopMode,
    pub(crate) stages: Vec<Stage>,
    pub(crate) index_of: FxHashMap<StageId, usize>,
    pub(crate) start_times_ms: Vec<u64>,
    pub(crate) topo_order: Vec<usize>,
}

impl Sequence {
    pub fn new(
        id: impl Into<String>,
        stages: Vec<Stage>,
        autoplay: bool,
        loop_mode: LoopMode,
        category: AnimationCategory,
    ) -> Result<Self, SequenceError> {
        let mut index_of = FxHashMap::default();
        for (i, stage) in stages.iter().enumerate() {
            if index_of.insert(stage.id.clone(), i).is_some() {
                return Err(SequenceError::DuplicateStageId(stage.id.clone()));
            }
        }
        for stage in &stages {
            for dep in &stage.depends_on {
                if !index_of.contains_key(dep) {
                    return Err(SequenceError::UnknownDependency {
                        stage: stage.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let topo_order = topological_order(&stages, &index_of)?;
        let start_times_ms = compute_start_times(&stages, &index_of, &topo_order);

        Ok(Self {
            id: id.into(),
            category,
            autoplay,
            loop_mode,
            stages,
            index_of,
            start_times_ms,
            topo_order,
        })
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn start_time_ms(&self, stage_id: &str) -> Option<u64> {
        self.index_of.get(stage_id).map(|&i| self.start_times_ms[i])
    }

    pub fn stage_index(&self, stage_id: &str) -> Option<usize> {
        self.index_of.get(stage_id).copied()
    }

    /// The sequence's total duration: the longest path's end time.
    pub fn total_duration_ms(&self) -> u64 {
        self.stages
            .iter()
            .enumerate()
            .map(|(i, s)| self.start_times_ms[i] + s.effective_duration_ms())
            .max()
            .unwrap_or(0)
    }
}

/// Kahn's algorithm; returns the processing order or `CyclicDependency` if
/// any stage is left unvisited (a back-edge exists).
fn topological_order(
    stages: &[Stage],
    index_of: &FxHashMap<StageId, usize>,
) -> Result<Vec<usize>, SequenceError> {
    let n = stages.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (i, stage) in stages.iter().enumerate() {
        in_degree[i] = stage.depends_on.len();
        for dep in &stage.depends_on {
            let dep_index = index_of[dep];
            dependents[dep_index].push(i);
        }
    }

    let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    let mut cursor = 0;
    while cursor < queue.len() {
        let i = queue[cursor];
        cursor += 1;
        order.push(i);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push(dependent);
            }
        }
    }

    if order.len() != n {
        return Err(SequenceError::CyclicDependency);
    }
    Ok(order)
}

fn compute_start_times(
    stages: &[Stage],
    index_of: &FxHashMap<StageId, usize>,
    topo_order: &[usize],
) -> Vec<u64> {
    let mut start_times = vec![0u64; stages.len()];
    for &i in topo_order {
        let stage = &stages[i];
        let baseline = stage
            .depends_on
            .iter()
            .map(|dep| {
                let dep_index = index_of[dep];
                start_times[dep_index] + stages[dep_index].effective_duration_ms()
            })
            .max()
            .unwrap_or(0);
        start_times[i] = baseline + stage.delay_ms;
    }
    start_times
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StyleMap;

    fn style(id: &str, duration_ms: u64) -> Stage {
        Stage::style(id, vec!["#x".into()], StyleMap::default()).with_duration_ms(duration_ms)
    }

    #[test]
    fn root_stage_starts_at_zero() {
        let seq = Sequence::new(
            "seq",
            vec![style("a", 200)],
            true,
            LoopMode::Never,
            AnimationCategory::Transition,
        )
        .unwrap();
        assert_eq!(seq.start_time_ms("a"), Some(0));
    }

    #[test]
    fn dependent_stage_starts_after_dependency_plus_its_own_delay() {
        let a = style("a", 200);
        let b = style("b", 100).depends_on(["a"]).with_delay_ms(50);
        let seq = Sequence::new("seq", vec![a, b], true, LoopMode::Never, AnimationCategory::Transition).unwrap();
        assert_eq!(seq.start_time_ms("b"), Some(250));
    }

    #[test]
    fn duplicate_stage_ids_are_rejected() {
        let a = style("a", 100);
        let dup = style("a", 50);
        let result = Sequence::new("seq", vec![a, dup], true, LoopMode::Never, AnimationCategory::Transition);
        assert!(matches!(result, Err(SequenceError::DuplicateStageId(_))));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let a = style("a", 100).depends_on(["ghost"]);
        let result = Sequence::new("seq", vec![a], true, LoopMode::Never, AnimationCategory::Transition);
        assert!(matches!(result, Err(SequenceError::UnknownDependency { .. })));
    }

    #[test]
    fn cyclic_dependency_is_rejected() {
        let a = style("a", 100).depends_on(["b"]);
        let b = style("b", 100).depends_on(["a"]);
        let result = Sequence::new("seq", vec![a, b], true, LoopMode::Never, AnimationCategory::Transition);
        assert_eq!(result, Err(SequenceError::CyclicDependency));
    }

    #[test]
    fn total_duration_is_the_longest_path() {
        let a = style("a", 200);
        let b = style("b", 100).depends_on(["a"]).with_delay_ms(50);
        let seq = Sequence::new("seq", vec![a, b], true, LoopMode::Never, AnimationCategory::Transition).unwrap();
        assert_eq!(seq.total_duration_ms(), 350);
    }
}
