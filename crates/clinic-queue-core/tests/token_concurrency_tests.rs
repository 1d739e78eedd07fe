//! Concurrency and invariant tests for token allocation and transitions.

use std::sync::Arc;
use std::thread;

use proptest::prelude::*;

use clinic_queue_core::{ClinicConfig, ClinicCore, ClinicError, PatientStatus};

fn open_core() -> ClinicCore {
    ClinicCore::open_in_memory(&ClinicConfig::default()).unwrap()
}

#[test]
fn test_concurrent_registrations_get_dense_tokens() {
    let core = Arc::new(open_core());
    let threads = 8;
    let per_thread = 4;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let core = Arc::clone(&core);
            thread::spawn(move || {
                (0..per_thread)
                    .map(|i| {
                        core.register_patient(&format!("Patient {}-{}", t, i), None, None, None)
                            .unwrap()
                            .token_number
                    })
                    .collect::<Vec<i64>>()
            })
        })
        .collect();

    let mut tokens: Vec<i64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    tokens.sort_unstable();

    let expected: Vec<i64> = (1..=i64::from(threads * per_thread)).collect();
    assert_eq!(tokens, expected);
    assert_eq!(
        core.current_token().unwrap(),
        i64::from(threads * per_thread)
    );
}

#[test]
fn test_concurrent_starts_admit_one_patient() {
    let core = Arc::new(open_core());

    let ids: Vec<i64> = (0..4)
        .map(|i| {
            core.register_patient(&format!("Patient {}", i), None, None, None)
                .unwrap()
                .id
        })
        .collect();

    let handles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let core = Arc::clone(&core);
            thread::spawn(move || core.start_consultation(id))
        })
        .collect();

    let results: Vec<Result<_, ClinicError>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    let started = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(started, 1);
    for result in &results {
        if let Err(e) = result {
            assert!(matches!(e, ClinicError::ConsultationActive(_)));
        }
    }

    let counts = core.dashboard_counts().unwrap();
    assert_eq!(counts.in_consultation, 1);
    assert_eq!(counts.waiting, 3);
}

// =========================================================================
// Property tests
// =========================================================================

#[derive(Debug, Clone)]
enum Op {
    Register,
    Start(usize),
    Complete(usize),
    Cancel(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Register),
        2 => any::<usize>().prop_map(Op::Start),
        2 => any::<usize>().prop_map(Op::Complete),
        1 => any::<usize>().prop_map(Op::Cancel),
    ]
}

fn pick(ids: &[i64], index: usize) -> Option<i64> {
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()])
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any interleaving of queue operations preserves the core invariants:
    /// tokens stay dense, at most one consultation is active, and every
    /// record holds a legal status.
    #[test]
    fn test_invariants_hold_under_any_op_sequence(
        ops in proptest::collection::vec(op_strategy(), 1..40)
    ) {
        let core = open_core();
        let mut ids: Vec<i64> = Vec::new();

        for (n, op) in ops.into_iter().enumerate() {
            match op {
                Op::Register => {
                    let record = core
                        .register_patient(&format!("Patient {}", n), None, None, None)
                        .unwrap();
                    ids.push(record.id);
                }
                Op::Start(i) => {
                    if let Some(id) = pick(&ids, i) {
                        // May legally fail; must never corrupt state
                        let _ = core.start_consultation(id);
                    }
                }
                Op::Complete(i) => {
                    if let Some(id) = pick(&ids, i) {
                        let _ = core.complete_consultation(id);
                    }
                }
                Op::Cancel(i) => {
                    if let Some(id) = pick(&ids, i) {
                        let _ = core.cancel_patient(id);
                    }
                }
            }

            let queue = core.list_queue(None).unwrap();

            // Tokens are dense: registrations never failed, so today's
            // tokens are exactly 1..=len
            let mut tokens: Vec<i64> = queue.iter().map(|p| p.token_number).collect();
            tokens.sort_unstable();
            let expected: Vec<i64> = (1..=queue.len() as i64).collect();
            prop_assert_eq!(tokens, expected);

            // Single-doctor invariant
            let active = queue
                .iter()
                .filter(|p| p.current_status == PatientStatus::InConsultation)
                .count();
            prop_assert!(active <= 1);

            // Counts agree with the listing, all statuses accounted for
            let counts = core.dashboard_counts().unwrap();
            prop_assert_eq!(counts.total() as usize, queue.len());
            for status in PatientStatus::ALL {
                let listed = queue
                    .iter()
                    .filter(|p| p.current_status == status)
                    .count();
                prop_assert_eq!(counts.get(status) as usize, listed);
            }
        }
    }
}
