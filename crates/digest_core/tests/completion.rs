use digest_core::{
    job_has_results, CompletionPolicy, Enrichment, EnrichmentStatus, EnrichmentTally, Item,
    JobStatus, Progress, StatusTracker,
};

fn item_with(statuses: &[EnrichmentStatus]) -> Item {
    let mut item = Item::with_properties("https://example.com/a", "A story");
    item.enrichments = statuses
        .iter()
        .map(|status| Enrichment {
            status: *status,
            ..Enrichment::default()
        })
        .collect();
    item
}

#[test]
fn tally_counts_completed_enrichments_across_items() {
    let items = vec![
        item_with(&[EnrichmentStatus::Completed, EnrichmentStatus::Running]),
        item_with(&[EnrichmentStatus::Completed, EnrichmentStatus::Failed]),
        item_with(&[]),
    ];
    let tally = EnrichmentTally::from_items(&items);
    assert_eq!(tally.completed, 2);
    assert_eq!(tally.total, 4);
    assert!((tally.fraction() - 0.5).abs() < f64::EPSILON);
}

#[test]
fn no_enrichments_counts_as_satisfied() {
    let items = vec![item_with(&[]), item_with(&[])];
    let tally = EnrichmentTally::from_items(&items);
    assert_eq!(tally.total, 0);
    assert!(CompletionPolicy::new(1.0).unwrap().is_satisfied(&tally));
}

#[test]
fn policy_compares_against_threshold_inclusively() {
    let policy = CompletionPolicy::default();
    let four_of_five = EnrichmentTally {
        completed: 4,
        total: 5,
    };
    let three_of_five = EnrichmentTally {
        completed: 3,
        total: 5,
    };
    assert!(policy.is_satisfied(&four_of_five));
    assert!(!policy.is_satisfied(&three_of_five));
}

#[test]
fn only_settled_jobs_with_progress_have_results() {
    let done = Progress {
        completion: Some(100.0),
        found: 0,
    };
    let found_some = Progress {
        completion: Some(20.0),
        found: 2,
    };
    let nothing = Progress {
        completion: Some(50.0),
        found: 0,
    };

    assert!(job_has_results(JobStatus::Idle, Some(&done)));
    assert!(job_has_results(JobStatus::Completed, Some(&found_some)));
    assert!(!job_has_results(JobStatus::Idle, Some(&nothing)));
    assert!(!job_has_results(JobStatus::Idle, None));
    assert!(!job_has_results(JobStatus::Running, Some(&done)));
    assert!(!job_has_results(JobStatus::Failed, Some(&found_some)));
}

#[test]
fn tracker_keeps_status_monotonic_and_found_non_decreasing() {
    let mut tracker = StatusTracker::new();

    let first = tracker.observe(
        JobStatus::Running,
        Some(&Progress {
            completion: Some(30.0),
            found: 4,
        }),
    );
    assert_eq!(first.status, JobStatus::Running);
    assert_eq!(first.found, 4);

    let settled = tracker.observe(JobStatus::Idle, Some(&Progress::default()));
    assert_eq!(settled.status, JobStatus::Idle);
    assert_eq!(settled.found, 4);

    let regressed = tracker.observe(
        JobStatus::Pending,
        Some(&Progress {
            completion: None,
            found: 6,
        }),
    );
    assert!(regressed.regressed);
    assert_eq!(regressed.status, JobStatus::Idle);
    assert_eq!(regressed.found, 6);
    assert_eq!(tracker.status(), JobStatus::Idle);
}
