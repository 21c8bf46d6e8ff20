use tierkreis_core::Loc;
use tierkreis_storage::{ControllerStorage, FileStorage};

#[tokio::test]
async fn survives_being_reopened_at_the_same_directory() {
    let dir = tempfile::tempdir().unwrap();
    let loc: Loc = "-.N0".parse().unwrap();

    {
        let storage = FileStorage::open(dir.path()).await.unwrap();
        storage.mark_node_started(&loc).await.unwrap();
        storage
            .write_output(&loc, &"value".to_string(), b"7")
            .await
            .unwrap();
        storage.mark_node_finished(&loc).await.unwrap();
    }

    let reopened = FileStorage::open(dir.path()).await.unwrap();
    assert!(reopened.is_node_started(&loc).await.unwrap());
    assert!(reopened.is_node_finished(&loc).await.unwrap());
    assert_eq!(
        reopened.read_output(&loc, &"value".to_string()).await.unwrap(),
        b"7"
    );
}

#[tokio::test]
async fn output_writes_are_one_shot() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).await.unwrap();
    let loc: Loc = "-.N0".parse().unwrap();
    storage.write_output(&loc, &"value".to_string(), b"first").await.unwrap();
    storage.write_output(&loc, &"value".to_string(), b"second").await.unwrap();
    assert_eq!(
        storage.read_output(&loc, &"value".to_string()).await.unwrap(),
        b"first"
    );
}

#[tokio::test]
async fn links_redirect_reads() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).await.unwrap();
    let a: Loc = "-.N0".parse().unwrap();
    let b: Loc = "-.N1".parse().unwrap();
    storage.write_output(&a, &"value".to_string(), b"9").await.unwrap();
    storage
        .link_outputs(&b, &"value".to_string(), &a, &"value".to_string())
        .await
        .unwrap();
    assert_eq!(
        storage.read_output(&b, &"value".to_string()).await.unwrap(),
        b"9"
    );
}

#[tokio::test]
async fn missing_reads_report_not_found_rather_than_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).await.unwrap();
    let loc: Loc = "-.N5".parse().unwrap();
    let err = storage.read_output(&loc, &"value".to_string()).await;
    assert!(err.is_err());
}
