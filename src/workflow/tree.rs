//! Pure edits over the scope forest.
//!
//! Every operation takes the forest (or phase) by value and hands back the
//! edited value, touching only the path from the root to the target node.
//! Missing targets are no-ops; they are logged at debug level so that stale
//! ids held by an editing surface show up when tracing is turned up.

use tracing::debug;

use super::generator::{create_repeater, create_scope_module};
use super::ids::IdGenerator;
use super::{PhaseConfig, RepeaterStep, ScopeModule};

/// Move the element at `from` to position `to`.
///
/// Out-of-range indices return the list unchanged.
pub fn move_item<T>(mut list: Vec<T>, from: usize, to: usize) -> Vec<T> {
    if from >= list.len() || to >= list.len() {
        debug!("move_item ignored: {} -> {} on list of {}", from, to, list.len());
        return list;
    }
    let item = list.remove(from);
    list.insert(to, item);
    list
}

/// Depth-first search for a scope by id
pub fn find_scope<'a>(forest: &'a [ScopeModule], target_id: &str) -> Option<&'a ScopeModule> {
    for scope in forest {
        if scope.id == target_id {
            return Some(scope);
        }
        if let Some(found) = find_scope(&scope.children, target_id) {
            return Some(found);
        }
    }
    None
}

fn find_scope_mut<'a>(forest: &'a mut [ScopeModule], target_id: &str) -> Option<&'a mut ScopeModule> {
    for scope in forest.iter_mut() {
        if scope.id == target_id {
            return Some(scope);
        }
        if let Some(found) = find_scope_mut(&mut scope.children, target_id) {
            return Some(found);
        }
    }
    None
}

/// Replace the scope with `target_id` by `updater(scope)`, at any depth.
pub fn update_scope_in_tree<F>(mut forest: Vec<ScopeModule>, target_id: &str, updater: F) -> Vec<ScopeModule>
where
    F: FnOnce(ScopeModule) -> ScopeModule,
{
    match find_scope_mut(&mut forest, target_id) {
        Some(slot) => {
            let scope = std::mem::take(slot);
            *slot = updater(scope);
        }
        None => debug!("update_scope_in_tree: no scope with id '{}'", target_id),
    }
    forest
}

/// Append `child` to the children of the scope with `parent_id`.
///
/// When the parent does not exist the child is dropped and the forest is
/// returned unchanged.
pub fn append_child_scope(mut forest: Vec<ScopeModule>, parent_id: &str, child: ScopeModule) -> Vec<ScopeModule> {
    match find_scope_mut(&mut forest, parent_id) {
        Some(parent) => parent.children.push(child),
        None => debug!(
            "append_child_scope: no parent '{}', dropping scope '{}'",
            parent_id, child.id
        ),
    }
    forest
}

/// Remove the first scope (pre-order) with `target_id`.
///
/// The flag reports whether anything was removed.
pub fn remove_scope_from_tree(mut forest: Vec<ScopeModule>, target_id: &str) -> (Vec<ScopeModule>, bool) {
    let removed = remove_first(&mut forest, target_id);
    if !removed {
        debug!("remove_scope_from_tree: no scope with id '{}'", target_id);
    }
    (forest, removed)
}

fn remove_first(forest: &mut Vec<ScopeModule>, target_id: &str) -> bool {
    for index in 0..forest.len() {
        if forest[index].id == target_id {
            forest.remove(index);
            return true;
        }
        if remove_first(&mut forest[index].children, target_id) {
            return true;
        }
    }
    false
}

/// Result of [`ensure_scope_and_repeater`]
#[derive(Debug, Clone, PartialEq)]
pub struct EnsuredRepeater {
    pub phase: PhaseConfig,
    pub scope_id: String,
    pub repeater_id: String,
}

/// Make sure `phase` has a scope with a repeater to attach steps to.
///
/// A missing `scope_id` (or one that names no scope in the phase) appends a
/// new top-level scope; a scope without a repeater gets one. Calling again
/// with the returned ids leaves the phase as it is. `repeater_id` is only a
/// hint: the id reported back is always the scope's actual repeater.
pub fn ensure_scope_and_repeater(
    mut phase: PhaseConfig,
    scope_id: Option<&str>,
    repeater_id: Option<&str>,
    ids: &mut dyn IdGenerator,
) -> EnsuredRepeater {
    let existing = scope_id.filter(|id| find_scope(&phase.chain, id).is_some());

    let scope_id = match existing {
        Some(id) => id.to_string(),
        None => {
            let scope = create_scope_module(ids);
            let id = scope.id.clone();
            phase.chain.push(scope);
            id
        }
    };

    let mut resolved_repeater = String::new();
    if let Some(scope) = find_scope_mut(&mut phase.chain, &scope_id) {
        let repeater = scope.repeater.get_or_insert_with(|| create_repeater(ids));
        if let Some(hint) = repeater_id {
            if hint != repeater.id {
                debug!(
                    "ensure_scope_and_repeater: scope '{}' uses repeater '{}', not '{}'",
                    scope_id, repeater.id, hint
                );
            }
        }
        resolved_repeater = repeater.id.clone();
    }

    EnsuredRepeater {
        phase,
        scope_id,
        repeater_id: resolved_repeater,
    }
}

/// Replace the step list of the repeater owned by `scope_id`.
///
/// No-op when the scope is missing or has no repeater.
pub fn update_repeater_steps<F>(mut phase: PhaseConfig, scope_id: &str, updater: F) -> PhaseConfig
where
    F: FnOnce(Vec<RepeaterStep>) -> Vec<RepeaterStep>,
{
    match find_scope_mut(&mut phase.chain, scope_id).and_then(|scope| scope.repeater.as_mut()) {
        Some(repeater) => {
            let steps = std::mem::take(&mut repeater.steps);
            repeater.steps = updater(steps);
        }
        None => debug!("update_repeater_steps: no repeater under scope '{}'", scope_id),
    }
    phase
}

/// All repeater steps of the forest in pre-order
pub fn flatten_steps(forest: &[ScopeModule]) -> Vec<&RepeaterStep> {
    let mut steps = Vec::new();
    collect_steps(forest, &mut steps);
    steps
}

fn collect_steps<'a>(forest: &'a [ScopeModule], steps: &mut Vec<&'a RepeaterStep>) {
    for scope in forest {
        if let Some(repeater) = &scope.repeater {
            steps.extend(repeater.steps.iter());
        }
        collect_steps(&scope.children, steps);
    }
}

/// Number of scopes at every depth
pub fn count_scopes(forest: &[ScopeModule]) -> usize {
    forest
        .iter()
        .map(|scope| 1 + count_scopes(&scope.children))
        .sum()
}

/// Deepest nesting level; an empty forest has depth 0
pub fn max_depth(forest: &[ScopeModule]) -> usize {
    forest
        .iter()
        .map(|scope| 1 + max_depth(&scope.children))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::generator::create_document_url_step;
    use crate::workflow::ids::SequentialIds;

    fn scope(id: &str, children: Vec<ScopeModule>) -> ScopeModule {
        ScopeModule {
            id: id.to_string(),
            css_selector: format!(".{}", id),
            children,
            ..Default::default()
        }
    }

    /// a -> b -> c -> d, plus a sibling root e
    fn deep_forest() -> Vec<ScopeModule> {
        vec![
            scope("a", vec![scope("b", vec![scope("c", vec![scope("d", vec![])])])]),
            scope("e", vec![]),
        ]
    }

    #[test]
    fn test_move_item() {
        let list = vec!['a', 'b', 'c', 'd'];
        assert_eq!(move_item(list.clone(), 0, 2), vec!['b', 'c', 'a', 'd']);
        assert_eq!(move_item(list.clone(), 3, 0), vec!['d', 'a', 'b', 'c']);
        assert_eq!(move_item(list.clone(), 1, 1), list);
    }

    #[test]
    fn test_move_item_is_permutation() {
        let list: Vec<u32> = (0..6).collect();
        for from in 0..list.len() {
            for to in 0..list.len() {
                let moved = move_item(list.clone(), from, to);
                assert_eq!(moved[to], list[from]);
                let mut sorted = moved.clone();
                sorted.sort();
                assert_eq!(sorted, list);
            }
        }
    }

    #[test]
    fn test_move_item_out_of_range() {
        let list = vec![1, 2, 3];
        assert_eq!(move_item(list.clone(), 3, 0), list);
        assert_eq!(move_item(list.clone(), 0, 3), list);
        assert_eq!(move_item(Vec::<u8>::new(), 0, 0), Vec::<u8>::new());
    }

    #[test]
    fn test_update_reaches_any_depth() {
        let forest = deep_forest();
        let updated = update_scope_in_tree(forest.clone(), "d", |mut scope| {
            scope.label = "deepest".to_string();
            scope
        });

        assert_eq!(find_scope(&updated, "d").unwrap().label, "deepest");
        // untouched sibling subtree
        assert_eq!(updated[1], forest[1]);
        assert_eq!(count_scopes(&updated), count_scopes(&forest));
    }

    #[test]
    fn test_update_missing_id_is_noop() {
        let forest = deep_forest();
        let updated = update_scope_in_tree(forest.clone(), "missing", |mut scope| {
            scope.label = "never".to_string();
            scope
        });
        assert_eq!(updated, forest);
    }

    #[test]
    fn test_append_child_scope() {
        let forest = deep_forest();
        let appended = append_child_scope(forest.clone(), "c", scope("f", vec![]));

        let parent = find_scope(&appended, "c").unwrap();
        assert_eq!(parent.children.len(), 2);
        assert_eq!(parent.children[1].id, "f");

        let unchanged = append_child_scope(forest.clone(), "missing", scope("f", vec![]));
        assert_eq!(unchanged, forest);
    }

    #[test]
    fn test_remove_at_depth() {
        let forest = deep_forest();
        let (removed, changed) = remove_scope_from_tree(forest.clone(), "c");

        assert!(changed);
        assert!(find_scope(&removed, "c").is_none());
        assert!(find_scope(&removed, "d").is_none());
        assert!(find_scope(&removed, "b").unwrap().children.is_empty());
        assert_eq!(removed[1], forest[1]);
    }

    #[test]
    fn test_remove_missing_id() {
        let forest = deep_forest();
        let (unchanged, changed) = remove_scope_from_tree(forest.clone(), "zzz");
        assert!(!changed);
        assert_eq!(unchanged, forest);
    }

    #[test]
    fn test_ensure_scope_and_repeater_creates_nodes() {
        let mut ids = SequentialIds::new();
        let ensured = ensure_scope_and_repeater(PhaseConfig::default(), None, None, &mut ids);

        assert_eq!(ensured.phase.chain.len(), 1);
        assert_eq!(ensured.scope_id, "scope-1");
        assert_eq!(ensured.repeater_id, "repeater-2");
        assert_eq!(
            ensured.phase.chain[0].repeater.as_ref().unwrap().id,
            ensured.repeater_id
        );
    }

    #[test]
    fn test_ensure_scope_and_repeater_is_idempotent() {
        let mut ids = SequentialIds::new();
        let first = ensure_scope_and_repeater(PhaseConfig::default(), None, None, &mut ids);

        let second = ensure_scope_and_repeater(
            first.phase.clone(),
            Some(&first.scope_id),
            Some(&first.repeater_id),
            &mut ids,
        );
        let third = ensure_scope_and_repeater(
            second.phase.clone(),
            Some(&second.scope_id),
            Some(&second.repeater_id),
            &mut ids,
        );

        assert_eq!(second, first);
        assert_eq!(third, second);
    }

    #[test]
    fn test_ensure_adds_repeater_to_nested_scope() {
        let mut ids = SequentialIds::starting_after(100);
        let phase = PhaseConfig {
            before: Vec::new(),
            chain: deep_forest(),
        };

        let ensured = ensure_scope_and_repeater(phase, Some("c"), None, &mut ids);
        assert_eq!(ensured.scope_id, "c");
        assert_eq!(ensured.phase.chain.len(), 2);
        let nested = find_scope(&ensured.phase.chain, "c").unwrap();
        assert_eq!(nested.repeater.as_ref().unwrap().id, ensured.repeater_id);
    }

    #[test]
    fn test_update_repeater_steps_and_flatten() {
        let mut ids = SequentialIds::new();
        let ensured = ensure_scope_and_repeater(PhaseConfig::default(), None, None, &mut ids);
        let step = create_document_url_step(&mut ids);
        let step_id = step.id.clone();

        let phase = update_repeater_steps(ensured.phase, &ensured.scope_id, |mut steps| {
            steps.push(step);
            steps
        });

        let steps = flatten_steps(&phase.chain);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].id, step_id);

        let untouched = update_repeater_steps(phase.clone(), "missing", |_| Vec::new());
        assert_eq!(untouched, phase);
    }

    #[test]
    fn test_outline_statistics() {
        let forest = deep_forest();
        assert_eq!(count_scopes(&forest), 5);
        assert_eq!(max_depth(&forest), 4);
        assert_eq!(max_depth(&[]), 0);
    }
}
