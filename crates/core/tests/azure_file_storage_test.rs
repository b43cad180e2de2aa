//! Blob storage adapter behaviour against the in-memory blob service.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use azurefs_core::azure::{AzureFileStorage, BlobService, BlobServiceConnector, MemoryConnector};
use azurefs_core::clock::FixedClock;
use azurefs_core::storage::{FileStorage, RefreshableStorage, reader_from_bytes};
use azurefs_shared::{FileRef, SettingsUpdate, StorageSettings};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, ReadBuf};
use tokio::sync::oneshot;
use uuid::Uuid;

const CONNECTION: &str = "UseDevelopmentStorage=true";

fn storage(connector: &Arc<MemoryConnector>, container: &str) -> AzureFileStorage {
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 7, 10, 30, 0).unwrap());
    AzureFileStorage::new(
        StorageSettings::new(CONNECTION, container),
        Arc::clone(connector) as Arc<dyn BlobServiceConnector>,
    )
    .with_clock(Arc::new(clock))
}

async fn read_all(storage: &AzureFileStorage, reference: &FileRef) -> Vec<u8> {
    let mut reader = storage.open_stream(reference).await.ok().expect("opened");
    let mut data = Vec::new();
    reader.read_to_end(&mut data).await.expect("read");
    data
}

#[tokio::test]
async fn test_report_lifecycle() {
    let connector = Arc::new(MemoryConnector::new());
    let storage = storage(&connector, "docs");
    storage.init().await.expect("connected");

    let payload: Vec<u8> = (0..1234).map(|i| (i % 251) as u8).collect();
    let parameters = HashMap::from([("owner".to_string(), "finance".to_string())]);
    let reference = storage
        .save_stream("report.pdf", reader_from_bytes(payload.clone()), parameters)
        .await
        .expect("saved");

    let key = reference.path();
    let uuid = key
        .strip_prefix("2024/03/07/")
        .and_then(|rest| rest.strip_suffix(".pdf"))
        .expect("date-partitioned key with extension");
    assert!(Uuid::parse_str(uuid).is_ok(), "{key}");
    assert_eq!(reference.storage_name(), "azurefs");
    assert_eq!(reference.file_name(), "report.pdf");
    assert_eq!(reference.parameters()["owner"], "finance");

    assert_eq!(read_all(&storage, &reference).await, payload);
    assert!(storage.file_exists(&reference).await);

    storage.remove_file(&reference).await.expect("removed");
    assert!(!storage.file_exists(&reference).await);
}

#[tokio::test]
async fn test_name_without_extension_yields_bare_key() {
    let connector = Arc::new(MemoryConnector::new());
    let storage = storage(&connector, "docs");
    storage.init().await.expect("connected");

    let reference = storage
        .save_bytes("README", "hello".into())
        .await
        .expect("saved");
    let last = reference.path().rsplit('/').next().expect("segment");
    assert!(Uuid::parse_str(last).is_ok(), "{}", reference.path());
}

#[tokio::test]
async fn test_connect_twice_against_existing_container() {
    let connector = Arc::new(MemoryConnector::new());
    connector
        .connect(CONNECTION)
        .expect("account")
        .create_container("docs")
        .await
        .expect("pre-created");

    let storage = storage(&connector, "docs");
    storage.init().await.expect("first connect");
    let before = storage
        .save_bytes("notes.txt", "first".into())
        .await
        .expect("saved");

    storage.connect().await.expect("second connect");
    assert_eq!(read_all(&storage, &before).await, b"first");
    let after = storage
        .save_bytes("notes.txt", "second".into())
        .await
        .expect("saved");
    assert_eq!(read_all(&storage, &after).await, b"second");

    let account = connector.account(CONNECTION).expect("account");
    assert_eq!(account.container_names(), vec!["docs"]);
}

#[tokio::test]
async fn test_operations_before_init() {
    let connector = Arc::new(MemoryConnector::new());
    let storage = storage(&connector, "docs");
    let reference = FileRef::new("azurefs", "2024/03/07/missing.pdf", "missing.pdf");

    assert!(!storage.is_connected());
    assert!(!storage.file_exists(&reference).await);

    let err = storage
        .save_bytes("report.pdf", "data".into())
        .await
        .expect_err("no handle");
    assert!(err.is_io());
    assert_eq!(err.to_string(), "Could not save file report.pdf.");
    assert!(storage.open_stream(&reference).await.is_err());
    assert!(storage.remove_file(&reference).await.is_err());
}

#[tokio::test]
async fn test_unknown_reference() {
    let connector = Arc::new(MemoryConnector::new());
    let storage = storage(&connector, "docs");
    storage.init().await.expect("connected");
    let reference = FileRef::new("azurefs", "2024/03/07/never-saved.pdf", "never-saved.pdf");

    assert!(!storage.file_exists(&reference).await);
    let err = storage.open_stream(&reference).await.err().expect("missing blob");
    assert_eq!(err.to_string(), "Could not load file never-saved.pdf.");
}

#[tokio::test]
async fn test_refresh_switches_container() {
    let connector = Arc::new(MemoryConnector::new());
    let storage = storage(&connector, "docs");
    storage.init().await.expect("connected");
    let old = storage
        .save_bytes("a.txt", "old".into())
        .await
        .expect("saved");

    storage
        .refresh_with(SettingsUpdate {
            connection_string: CONNECTION.to_string(),
            container_name: "archive".to_string(),
            block_size: None,
            max_concurrency: None,
        })
        .await
        .expect("refreshed");

    assert_eq!(storage.container_name().as_deref(), Some("archive"));
    assert!(!storage.file_exists(&old).await);
    let account = connector.account(CONNECTION).expect("account");
    assert_eq!(account.container_names(), vec!["archive", "docs"]);
}

#[tokio::test]
async fn test_upload_larger_than_block_size() {
    let connector = Arc::new(MemoryConnector::new());
    let settings = StorageSettings::new(CONNECTION, "docs").with_transfer(16, 4);
    let storage = AzureFileStorage::new(settings, Arc::clone(&connector) as Arc<dyn BlobServiceConnector>);
    storage.init().await.expect("connected");

    let payload = vec![7_u8; 100];
    let reference = storage
        .save_bytes("blob.bin", payload.clone().into())
        .await
        .expect("saved");
    assert_eq!(read_all(&storage, &reference).await, payload);
}

/// Reader that reports when the upload starts pulling data.
struct StartSignal<R> {
    inner: R,
    started: Option<oneshot::Sender<()>>,
}

impl<R: AsyncRead + Unpin> AsyncRead for StartSignal<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if let Some(started) = self.started.take() {
            let _ = started.send(());
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

#[tokio::test]
async fn test_in_flight_save_completes_against_captured_container() {
    let connector = Arc::new(MemoryConnector::new());
    let storage = Arc::new(storage(&connector, "docs"));
    storage.init().await.expect("connected");

    let (mut client, server) = tokio::io::duplex(64);
    let (started_tx, started_rx) = oneshot::channel();
    let reader = StartSignal {
        inner: server,
        started: Some(started_tx),
    };
    let upload = {
        let storage = Arc::clone(&storage);
        tokio::spawn(async move {
            storage
                .save_stream("late.txt", Box::new(reader), HashMap::new())
                .await
        })
    };

    started_rx.await.expect("upload started");
    storage
        .refresh_with(SettingsUpdate {
            connection_string: CONNECTION.to_string(),
            container_name: "archive".to_string(),
            block_size: None,
            max_concurrency: None,
        })
        .await
        .expect("refreshed");

    client.write_all(b"written during refresh").await.expect("written");
    drop(client);
    let reference = upload.await.expect("joined").expect("saved");

    assert_eq!(storage.container_name().as_deref(), Some("archive"));
    assert!(!storage.file_exists(&reference).await);

    let docs = connector
        .account(CONNECTION)
        .expect("account")
        .container("docs")
        .expect("docs container");
    let stored = docs.operator().read(reference.path()).await.expect("read");
    assert_eq!(stored.to_vec(), b"written during refresh");
}

#[tokio::test]
async fn test_upload_sets_content_type() {
    let connector = Arc::new(MemoryConnector::new());
    let storage = storage(&connector, "docs");
    storage.init().await.expect("connected");

    let reference = storage
        .save_bytes("report.pdf", "%PDF-1.7".into())
        .await
        .expect("saved");

    let docs = connector
        .account(CONNECTION)
        .expect("account")
        .container("docs")
        .expect("docs container");
    let meta = docs.operator().stat(reference.path()).await.expect("stat");
    assert_eq!(meta.content_type(), Some("application/pdf"));
}

/// Reader that fails after yielding a few bytes.
struct BrokenReader {
    sent: bool,
}

impl AsyncRead for BrokenReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.sent {
            return Poll::Ready(Err(std::io::Error::other("connection reset")));
        }
        self.sent = true;
        buf.put_slice(b"partial");
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_failing_stream_is_reported_and_not_stored() {
    let connector = Arc::new(MemoryConnector::new());
    let settings = StorageSettings::new(CONNECTION, "docs").with_transfer(4, 2);
    let storage = AzureFileStorage::new(settings, Arc::clone(&connector) as Arc<dyn BlobServiceConnector>);
    storage.init().await.expect("connected");

    let err = storage
        .save_stream("broken.bin", Box::new(BrokenReader { sent: false }), HashMap::new())
        .await
        .expect_err("stream fails");
    assert!(err.is_io());
    assert_eq!(err.to_string(), "Could not save file broken.bin.");

    let docs = connector
        .account(CONNECTION)
        .expect("account")
        .container("docs")
        .expect("docs container");
    let listed = docs.operator().list_with("/").recursive(true).await.expect("list");
    assert!(listed.iter().all(|entry| entry.metadata().is_dir()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn saved_bytes_read_back_unchanged(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let read = runtime.block_on(async {
            let connector = Arc::new(MemoryConnector::new());
            let storage = storage(&connector, "docs");
            storage.init().await.expect("connected");
            let reference = storage
                .save_bytes("data.bin", payload.clone().into())
                .await
                .expect("saved");
            read_all(&storage, &reference).await
        });
        prop_assert_eq!(read, payload);
    }
}
