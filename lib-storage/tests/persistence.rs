//! On-disk persistence checks: a store reopened from the same directory
//! resumes at the committed head.

use lib_storage::VersionedBoxStore;
use lib_types::Hash;

fn id(seed: u8) -> Hash {
    Hash::new([seed; 32])
}

#[test]
fn reopen_restores_head_and_boxes() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = VersionedBoxStore::open(dir.path()).unwrap();
        store
            .update(id(0xa0), 1_000, &[], &[(id(1), vec![1, 1])])
            .unwrap();
        store
            .update(id(0xa1), 2_000, &[id(1)], &[(id(2), vec![2, 2])])
            .unwrap();
    }

    let store = VersionedBoxStore::open(dir.path()).unwrap();
    assert_eq!(store.last_version_id().unwrap(), Some(id(0xa1)));
    assert_eq!(store.state_timestamp().unwrap(), Some(2_000));
    assert_eq!(store.get(&id(1)).unwrap(), None);
    assert_eq!(store.get(&id(2)).unwrap(), Some(vec![2, 2]));
}

#[test]
fn reopen_can_still_roll_back() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = VersionedBoxStore::open(dir.path()).unwrap();
        store
            .update(id(0xa0), 1_000, &[], &[(id(1), vec![1])])
            .unwrap();
        store
            .update(id(0xa1), 2_000, &[], &[(id(2), vec![2])])
            .unwrap();
    }

    // The undo journal survives restart with the rest of the tree.
    let store = VersionedBoxStore::open(dir.path()).unwrap();
    store.rollback(id(0xa0)).unwrap();
    assert_eq!(store.last_version_id().unwrap(), Some(id(0xa0)));
    assert_eq!(store.state_timestamp().unwrap(), Some(1_000));
    assert!(store.get(&id(2)).unwrap().is_none());
}
