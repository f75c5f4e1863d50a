//! End-to-end synchronization scenarios over in-memory and local domains

use std::sync::Arc;
use tidesync_domain::{LocalDomain, MemoryDomain};
use tidesync_engine::{SyncEngine, SyncRequest};
use tidesync_types::{
    ChangeReport, DomainTag, Error, StorageDomain, SyncFailure, SyncPath, TransferPolicy,
};
use tokio_util::sync::CancellationToken;

fn memory_pair() -> (Arc<MemoryDomain>, SyncPath, Arc<MemoryDomain>, SyncPath) {
    let source = Arc::new(MemoryDomain::new("/zone/home/user"));
    let target = Arc::new(MemoryDomain::new("/zone/home/user"));
    let source_root = SyncPath::new(DomainTag::Remote, ["/zone/home/user/src"]);
    let target_root = SyncPath::new(DomainTag::Remote, ["/zone/home/user/dst"]);
    source.put_container(&source_root);
    target.put_container(&target_root);
    (source, source_root, target, target_root)
}

async fn run(
    source: Arc<MemoryDomain>,
    source_root: &SyncPath,
    target: Arc<MemoryDomain>,
    target_root: &SyncPath,
    policy: TransferPolicy,
) -> Result<ChangeReport, SyncFailure> {
    let request = SyncRequest::new(
        source,
        source_root.clone(),
        target,
        target_root.clone(),
    )
    .with_policy(policy);
    SyncEngine::new().sync(request).await
}

// Scenario A: new container and leaf appear at an empty target
#[tokio::test]
async fn scenario_a_fresh_target() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_leaf(&src_root.join(["a/x.txt"]), b"ten bytes!");

    let report = run(
        source,
        &src_root,
        Arc::clone(&target),
        &dst_root,
        TransferPolicy::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.containers_created.len(), 1);
    assert_eq!(report.containers_created[0].to_string(), "a");
    assert_eq!(report.copies.len(), 1);
    assert_eq!(report.copies[0].rel.to_string(), "a/x.txt");
    assert_eq!(
        target.leaf_content(&dst_root.join(["a/x.txt"])).unwrap(),
        b"ten bytes!"
    );
}

// Scenario B: identical leaf on both sides produces zero operations
#[tokio::test]
async fn scenario_b_identical_leaf_is_noop() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_leaf(&src_root.join(["a/x.txt"]), b"ten bytes!");
    target.put_leaf(&dst_root.join(["a/x.txt"]), b"ten bytes!");

    let report = run(source, &src_root, target, &dst_root, TransferPolicy::default())
        .await
        .unwrap();
    assert!(report.is_noop());
    assert!(report.skipped.is_empty());
}

// Scenario C: conflicting leaf under the strict policy aborts with no copies
#[tokio::test]
async fn scenario_c_strict_conflict_aborts() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_leaf(&src_root.join(["a/x.txt"]), b"twelve bytes");
    target.put_leaf(&dst_root.join(["a/x.txt"]), b"ten bytes!");

    let failure = run(
        Arc::clone(&source),
        &src_root,
        Arc::clone(&target),
        &dst_root,
        TransferPolicy::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(failure.error, Error::AlreadyExists { .. }));
    assert!(failure.report.copies.is_empty());
    // the target is untouched
    assert_eq!(
        target.leaf_content(&dst_root.join(["a/x.txt"])).unwrap(),
        b"ten bytes!"
    );
}

// Scenario D: the same conflict with overwrite enabled updates the leaf
#[tokio::test]
async fn scenario_d_overwrite_updates() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_leaf(&src_root.join(["a/x.txt"]), b"twelve bytes");
    target.put_leaf(&dst_root.join(["a/x.txt"]), b"ten bytes!");

    let report = run(
        source,
        &src_root,
        Arc::clone(&target),
        &dst_root,
        TransferPolicy::default().with_overwrite(true),
    )
    .await
    .unwrap();

    assert_eq!(report.copies.len(), 1);
    let target_path = dst_root.join(["a/x.txt"]);
    assert_eq!(target.size(&target_path).await.unwrap(), 12);
    assert_eq!(target.leaf_content(&target_path).unwrap(), b"twelve bytes");
}

// Scenario E: empty containers are not created unless requested
#[tokio::test]
async fn scenario_e_empty_container_policy() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_container(&src_root.join(["empty"]));

    let report = run(
        Arc::clone(&source),
        &src_root,
        Arc::clone(&target),
        &dst_root,
        TransferPolicy::default(),
    )
    .await
    .unwrap();
    assert!(report.is_noop());

    let copying = TransferPolicy {
        copy_empty_containers: true,
        ..TransferPolicy::default()
    };
    let report = run(source, &src_root, Arc::clone(&target), &dst_root, copying)
        .await
        .unwrap();
    assert_eq!(report.containers_created.len(), 1);
    assert!(target.exists(&dst_root.join(["empty"])).await.unwrap());
}

// P1: a second run over converged trees is a no-op
#[tokio::test]
async fn property_idempotence() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_leaf(&src_root.join(["a/x.txt"]), b"content a");
    source.put_leaf(&src_root.join(["b/y.txt"]), b"content b");

    let first = run(
        Arc::clone(&source),
        &src_root,
        Arc::clone(&target),
        &dst_root,
        TransferPolicy::default(),
    )
    .await
    .unwrap();
    assert_eq!(first.copies.len(), 2);

    let second = run(source, &src_root, target, &dst_root, TransferPolicy::default())
        .await
        .unwrap();
    assert!(second.is_noop());
}

// P2: entries present only at the target survive any policy
#[tokio::test]
async fn property_non_destructive() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_leaf(&src_root.join(["x.txt"]), b"x");
    target.put_leaf(&dst_root.join(["keep/only-here.txt"]), b"precious");

    let policy = TransferPolicy::default()
        .with_overwrite(true)
        .with_ignore_err(true);
    run(source, &src_root, Arc::clone(&target), &dst_root, policy)
        .await
        .unwrap();

    assert_eq!(
        target
            .leaf_content(&dst_root.join(["keep/only-here.txt"]))
            .unwrap(),
        b"precious"
    );
}

// P3: a depth bound excludes deeper leaves but keeps bound containers
#[tokio::test]
async fn property_depth_bound() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_leaf(&src_root.join(["a/x.txt"]), b"shallow");
    source.put_leaf(&src_root.join(["a/b/c/deep.txt"]), b"deep");

    let report = run(
        source,
        &src_root,
        Arc::clone(&target),
        &dst_root,
        TransferPolicy::default().with_max_depth(Some(2)),
    )
    .await
    .unwrap();

    for rel in report
        .containers_created
        .iter()
        .chain(report.copies.iter().map(|c| &c.rel))
    {
        assert!(rel.depth() <= 2, "operation too deep: {rel}");
    }
    // the container at the bound is still created because it is non-empty
    assert!(target.exists(&dst_root.join(["a/b"])).await.unwrap());
    assert!(!target.exists(&dst_root.join(["a/b/c"])).await.unwrap());
    assert_eq!(
        target.leaf_content(&dst_root.join(["a/x.txt"])).unwrap(),
        b"shallow"
    );
}

// P4: every completed copy re-walks to the source's size and checksum
#[tokio::test]
async fn property_integrity_of_completed_copies() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_leaf(&src_root.join(["a/x.txt"]), b"verified content");

    let report = run(
        Arc::clone(&source),
        &src_root,
        Arc::clone(&target),
        &dst_root,
        TransferPolicy::default(),
    )
    .await
    .unwrap();

    for copy in &report.copies {
        let source_path = src_root.join_rel(&copy.rel);
        let target_path = dst_root.join_rel(&copy.rel);
        assert_eq!(
            source.size(&source_path).await.unwrap(),
            target.size(&target_path).await.unwrap()
        );
        assert_eq!(
            source.checksum(&source_path).await.unwrap(),
            target.checksum(&target_path).await.unwrap()
        );
    }
}

// Dry-run reports the same plan it would execute, without touching the target
#[tokio::test]
async fn dry_run_plans_without_writing() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_leaf(&src_root.join(["a/x.txt"]), b"planned");

    let report = run(
        source,
        &src_root,
        Arc::clone(&target),
        &dst_root,
        TransferPolicy::dry_run(),
    )
    .await
    .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.containers_created.len(), 1);
    assert_eq!(report.copies.len(), 1);
    assert!(!target.exists(&dst_root.join(["a"])).await.unwrap());
}

// A pre-cancelled token yields a partial (here: empty) report, not an error
#[tokio::test]
async fn cancellation_returns_partial_report() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_leaf(&src_root.join(["x.txt"]), b"never copied");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let request = SyncRequest::new(
        source,
        src_root.clone(),
        target.clone(),
        dst_root.clone(),
    )
    .with_cancel(cancel);

    let report = SyncEngine::new().sync(request).await.unwrap();
    assert!(report.cancelled);
    assert!(report.copies.is_empty());
    assert!(!target.exists(&dst_root.join(["x.txt"])).await.unwrap());
}

// An unreadable source container is contained to a recorded skip
#[tokio::test]
async fn unreadable_container_is_contained() {
    let (source, src_root, target, dst_root) = memory_pair();
    source.put_leaf(&src_root.join(["good/x.txt"]), b"fine");
    source.put_leaf(&src_root.join(["bad/y.txt"]), b"hidden");
    source.fail_listing(&src_root.join(["bad"]));

    let report = run(
        source,
        &src_root,
        Arc::clone(&target),
        &dst_root,
        TransferPolicy::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.copies.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("unreadable"));
    assert!(target.exists(&dst_root.join(["good/x.txt"])).await.unwrap());
}

// Upload direction: local filesystem source into the in-memory object store
#[tokio::test]
async fn local_to_memory_upload() {
    let tmp = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("photos")).unwrap();
    std::fs::write(tmp.path().join("photos/cat.jpg"), b"meow bytes").unwrap();
    std::fs::write(tmp.path().join("notes.txt"), b"hello").unwrap();

    let local = Arc::new(LocalDomain::new(tmp.path()));
    let local_root = LocalDomain::sync_path(tmp.path()).unwrap();
    let remote = Arc::new(MemoryDomain::new("/zone/home/user"));
    let remote_root = SyncPath::new(DomainTag::Remote, ["/zone/home/user/backup"]);
    remote.put_container(&remote_root);

    let request = SyncRequest::new(
        local,
        local_root,
        remote.clone(),
        remote_root.clone(),
    );
    let report = SyncEngine::new().sync(request).await.unwrap();

    assert_eq!(report.containers_created.len(), 1);
    assert_eq!(report.copies.len(), 2);
    assert_eq!(
        remote
            .leaf_content(&remote_root.join(["photos/cat.jpg"]))
            .unwrap(),
        b"meow bytes"
    );
}

// Download direction: in-memory object store into a local directory
#[tokio::test]
async fn memory_to_local_download() {
    let remote = Arc::new(MemoryDomain::new("/zone/home/user"));
    let remote_root = SyncPath::new(DomainTag::Remote, ["/zone/home/user/data"]);
    remote.put_leaf(&remote_root.join(["set/obj.dat"]), b"object bytes");

    let tmp = tempfile::TempDir::new().unwrap();
    let local = Arc::new(LocalDomain::new(tmp.path()));
    let local_root = LocalDomain::sync_path(tmp.path()).unwrap();

    let request = SyncRequest::new(remote, remote_root, local, local_root);
    let report = SyncEngine::new().sync(request).await.unwrap();

    assert_eq!(report.copies.len(), 1);
    assert_eq!(
        std::fs::read(tmp.path().join("set/obj.dat")).unwrap(),
        b"object bytes"
    );
}
