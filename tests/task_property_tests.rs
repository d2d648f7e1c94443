//! Property-Based Tests for Task Invariants
//!
//! Whatever sequence of updates is attempted against a stored task, its
//! history never shrinks and its state only ever moves forward.

use conductor_workspace::a2a::{
    FileTaskStore, InMemoryTaskStore, Message, TaskState, TaskStore, TaskStoreExt,
};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Step {
    Claim,
    Complete,
    Fail,
    Rewind,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Claim),
        Just(Step::Complete),
        Just(Step::Fail),
        Just(Step::Rewind),
    ]
}

async fn apply_steps(store: &dyn TaskStore, steps: Vec<Step>) {
    let task = store.create(Message::user("payload")).await.unwrap();
    let mut previous = task;

    for step in steps {
        let attempted = store
            .update_with(&previous.id, move |task| match step {
                Step::Claim => task.transition(TaskState::Working),
                Step::Complete => task.complete("done"),
                Step::Fail => task.fail("broken"),
                Step::Rewind => {
                    task.state = TaskState::Submitted;
                    Ok(())
                }
            })
            .await;

        let current = store.get(&previous.id).await.unwrap();
        assert!(current.history.len() >= previous.history.len());
        assert!(
            current.state == previous.state || previous.state.can_transition_to(current.state),
            "{} -> {}",
            previous.state,
            current.state
        );
        if attempted.is_err() {
            assert_eq!(current.history.len(), previous.history.len());
            assert_eq!(current.state, previous.state);
        }
        if previous.is_terminal() {
            assert_eq!(current.state, previous.state);
        }
        previous = current;
    }
}

proptest! {
    /// Property: the in-memory store enforces the task state machine
    #[test]
    fn prop_in_memory_history_is_monotonic(steps in prop::collection::vec(step_strategy(), 0..12)) {
        tokio_test::block_on(async {
            let store = InMemoryTaskStore::new();
            apply_steps(&store, steps).await;
        });
    }

    /// Property: the file store enforces the same invariants
    #[test]
    fn prop_file_history_is_monotonic(steps in prop::collection::vec(step_strategy(), 0..8)) {
        let dir = tempfile::tempdir().unwrap();
        tokio_test::block_on(async {
            let store = FileTaskStore::new(dir.path()).unwrap();
            apply_steps(&store, steps).await;
        });
    }
}

#[test]
fn test_terminal_state_is_final() {
    tokio_test::block_on(async {
        let store = InMemoryTaskStore::new();
        apply_steps(
            &store,
            vec![Step::Claim, Step::Complete, Step::Fail, Step::Rewind, Step::Claim],
        )
        .await;
    });
}
