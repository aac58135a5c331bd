use super::*;
use crate::connectors::{MemoryLoader, MemorySource};
use crate::dataset::{Dataset, Record};
use crate::report::StageStatus;
use crate::transformers::DoNothing;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Helper to build `count` single-column rows
fn rows(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| Record::from([("id", i.to_string())]))
        .collect()
}

fn source(name: &str, count: usize) -> Box<dyn DataSource> {
    Box::new(MemorySource::new(name, rows(count)))
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// Data source whose read always fails, counting the attempts
struct FailingSource {
    name: String,
    reads: Arc<AtomicUsize>,
}

#[async_trait]
impl DataSource for FailingSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "FailingSource"
    }

    async fn read(&self) -> Result<Dataset> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Err(ETLError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}

// Data source counting its reads
struct CountingSource {
    inner: MemorySource,
    reads: Arc<AtomicUsize>,
}

#[async_trait]
impl DataSource for CountingSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> &str {
        "CountingSource"
    }

    async fn read(&self) -> Result<Dataset> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read().await
    }
}

#[test]
fn test_new_pipeline_is_created() {
    let pipeline = EtlPipeline::new(Config::default());

    assert_eq!(pipeline.state(), PipelineState::Created);
    assert!(pipeline.registry().is_empty());
    assert!(pipeline.report().is_empty());
    assert!(!pipeline.succeeded());
}

#[test]
fn test_initialize_registers_every_stage() {
    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("orders", 1));
    pipeline.add_transformer(Box::new(DoNothing::new(
        "copy",
        names(&["orders"]),
        names(&["orders_copy"]),
    )));
    pipeline.add_loader(Box::new(MemoryLoader::new("orders")));

    assert!(pipeline.initialize());
    assert_eq!(pipeline.state(), PipelineState::Initialized);

    let report = pipeline.report();
    assert_eq!(report.len(), 3);
    assert!(report
        .entries()
        .iter()
        .all(|e| e.status() == StageStatus::Pending && e.order_index().is_none()));
    assert!(report.get(StageKind::DataSource, "orders").is_some());
    assert!(report.get(StageKind::Loader, "orders").is_some());
}

#[test]
fn test_initialize_without_data_source_fails() {
    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_loader(Box::new(MemoryLoader::new("orders")));

    assert!(!pipeline.initialize());
    assert_eq!(pipeline.state(), PipelineState::Error);
}

#[test]
fn test_initialize_rejects_duplicate_and_empty_names() {
    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("orders", 1));
    pipeline.add_extractor(source("orders", 2));
    assert!(!pipeline.initialize());

    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("", 1));
    assert!(!pipeline.initialize());
}

#[test]
fn test_initialize_twice_fails() {
    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("orders", 1));

    assert!(pipeline.initialize());
    assert!(!pipeline.initialize());
    assert_eq!(pipeline.state(), PipelineState::Error);
}

#[tokio::test]
async fn test_initialize_after_terminate_resets_run_state() {
    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("orders", 2));

    assert!(pipeline.initialize());
    assert!(pipeline.extract().await);
    assert!(pipeline.terminate());
    assert_eq!(pipeline.registry().len(), 1);

    assert!(pipeline.initialize());
    assert_eq!(pipeline.state(), PipelineState::Initialized);
    assert!(pipeline.registry().is_empty());
    let entry = pipeline.report().get(StageKind::DataSource, "orders").unwrap();
    assert_eq!(entry.status(), StageStatus::Pending);
    assert_eq!(entry.order_index(), None);
}

#[tokio::test]
async fn test_stages_out_of_order_fail() {
    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("orders", 1));

    assert!(!pipeline.extract().await);
    assert_eq!(pipeline.state(), PipelineState::Error);
    assert!(!pipeline.transform().await);
    assert!(!pipeline.load().await);
}

#[tokio::test]
async fn test_extract_stacks_only_non_empty_datasets() {
    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("orders", 3));
    pipeline.add_extractor(source("empty_src", 0));

    assert!(pipeline.initialize());
    assert!(pipeline.extract().await);
    assert_eq!(pipeline.state(), PipelineState::Extracted);

    assert_eq!(pipeline.registry().get_from_name("orders").unwrap().count(), 3);
    assert!(pipeline.registry().get_from_name("empty_src").is_none());

    let entry = pipeline
        .report()
        .get(StageKind::DataSource, "empty_src")
        .unwrap();
    assert_eq!(entry.status(), StageStatus::Completed);
    assert_eq!(entry.row_count(), 0);
    assert_eq!(entry.order_index(), Some(2));
    assert_eq!(entry.description(), "MemorySource -> Output: [empty_src]");
}

#[tokio::test]
async fn test_extract_renames_dataset_to_source_name() {
    struct MisnamedSource;

    #[async_trait]
    impl DataSource for MisnamedSource {
        fn name(&self) -> &str {
            "customers"
        }

        fn kind(&self) -> &str {
            "MisnamedSource"
        }

        async fn read(&self) -> Result<Dataset> {
            Ok(Dataset::from_records(rows(2)).with_name("something_else"))
        }
    }

    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(Box::new(MisnamedSource));

    assert!(pipeline.initialize());
    assert!(pipeline.extract().await);
    assert_eq!(pipeline.registry().names(), vec!["customers"]);
}

#[tokio::test]
async fn test_extract_is_fail_fast_and_discards_stack() {
    let failing_reads = Arc::new(AtomicUsize::new(0));
    let later_reads = Arc::new(AtomicUsize::new(0));

    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("orders", 3));
    pipeline.add_extractor(Box::new(FailingSource {
        name: "sap".to_string(),
        reads: Arc::clone(&failing_reads),
    }));
    pipeline.add_extractor(Box::new(CountingSource {
        inner: MemorySource::new("customers", rows(2)),
        reads: Arc::clone(&later_reads),
    }));

    assert!(pipeline.initialize());
    assert!(!pipeline.extract().await);

    assert_eq!(pipeline.state(), PipelineState::Error);
    assert_eq!(failing_reads.load(Ordering::SeqCst), 1);
    assert_eq!(later_reads.load(Ordering::SeqCst), 0);
    assert!(pipeline.registry().is_empty());
    assert_eq!(pipeline.registry().len(), 0);

    let report = pipeline.report();
    assert_eq!(
        report.get(StageKind::DataSource, "sap").unwrap().status(),
        StageStatus::Failed
    );
    assert_eq!(
        report.get(StageKind::DataSource, "customers").unwrap().status(),
        StageStatus::Pending
    );
}

#[tokio::test]
async fn test_transform_skips_when_no_input_resolves() {
    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("orders", 3));
    pipeline.add_transformer(Box::new(DoNothing::new(
        "orphan",
        names(&["missing", "also_missing"]),
        names(&["out"]),
    )));

    assert!(pipeline.initialize());
    assert!(pipeline.extract().await);
    let before = pipeline.registry().clone();

    assert!(pipeline.transform().await);

    assert_eq!(pipeline.registry(), &before);
    let entry = pipeline
        .report()
        .get(StageKind::Transformer, "orphan")
        .unwrap();
    assert_eq!(entry.status(), StageStatus::Skipped);
    assert_eq!(entry.order_index(), Some(2));
    assert_eq!(entry.row_count(), 0);
    assert_eq!(
        entry.description(),
        "DoNothing -> Inputs: [missing,also_missing] / Outputs: [out]"
    );
}

#[tokio::test]
async fn test_transform_failure_stops_remaining_transformers() {
    struct BrokenTransformer {
        inputs: Vec<String>,
    }

    #[async_trait]
    impl Transformer for BrokenTransformer {
        fn name(&self) -> &str {
            "broken"
        }

        fn kind(&self) -> &str {
            "BrokenTransformer"
        }

        fn inputs(&self) -> &[String] {
            &self.inputs
        }

        fn outputs(&self) -> &[String] {
            &[]
        }

        async fn transform(&self, _inputs: Datasets) -> Result<(Datasets, usize)> {
            Err(ETLError::Configuration("bad column".to_string()))
        }
    }

    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("orders", 3));
    pipeline.add_transformer(Box::new(BrokenTransformer {
        inputs: names(&["orders"]),
    }));
    pipeline.add_transformer(Box::new(DoNothing::new(
        "copy",
        names(&["orders"]),
        names(&["orders_copy"]),
    )));

    assert!(pipeline.initialize());
    assert!(pipeline.extract().await);
    assert!(!pipeline.transform().await);

    assert_eq!(pipeline.state(), PipelineState::Error);
    assert!(!pipeline.registry().contains("orders_copy"));
    let report = pipeline.report();
    assert_eq!(
        report.get(StageKind::Transformer, "broken").unwrap().status(),
        StageStatus::Failed
    );
    assert_eq!(
        report.get(StageKind::Transformer, "copy").unwrap().status(),
        StageStatus::Pending
    );
}

#[tokio::test]
async fn test_load_skips_missing_dataset_and_continues() {
    let loaded = MemoryLoader::new("orders");
    let handle = loaded.handle();

    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("orders", 3));
    pipeline.add_loader(Box::new(MemoryLoader::new("nowhere")));
    pipeline.add_loader(Box::new(loaded));

    assert!(pipeline.initialize());
    assert!(pipeline.extract().await);
    assert!(pipeline.transform().await);
    assert!(pipeline.load().await);
    assert_eq!(pipeline.state(), PipelineState::Loaded);

    assert_eq!(handle.lock().await.len(), 1);
    let report = pipeline.report();
    let skipped = report.get(StageKind::Loader, "nowhere").unwrap();
    assert_eq!(skipped.status(), StageStatus::Skipped);
    assert_eq!(skipped.order_index(), None);
    let written = report.get(StageKind::Loader, "orders").unwrap();
    assert_eq!(written.order_index(), Some(2));
    assert_eq!(written.row_count(), 3);
    assert_eq!(written.description(), "MemoryLoader -> Input: [orders]");
}

#[tokio::test]
async fn test_load_rejection_stops_remaining_loaders() {
    let after = MemoryLoader::new("customers");
    let handle = after.handle();

    let mut pipeline = EtlPipeline::new(Config::default());
    pipeline.add_extractor(source("orders", 3));
    pipeline.add_extractor(source("customers", 2));
    pipeline.add_loader(Box::new(MemoryLoader::rejecting("orders")));
    pipeline.add_loader(Box::new(after));

    assert!(pipeline.initialize());
    assert!(pipeline.extract().await);
    assert!(pipeline.transform().await);
    assert!(!pipeline.load().await);

    assert_eq!(pipeline.state(), PipelineState::Error);
    assert!(handle.lock().await.is_empty());
    assert_eq!(
        pipeline
            .report()
            .get(StageKind::Loader, "orders")
            .unwrap()
            .status(),
        StageStatus::Failed
    );
}

#[tokio::test]
async fn test_terminate_keeps_error_state() {
    let mut pipeline = EtlPipeline::new(Config::default());
    assert!(!pipeline.initialize());

    assert!(pipeline.terminate());
    assert_eq!(pipeline.state(), PipelineState::Error);
    assert!(!pipeline.succeeded());
}

#[test]
fn test_error_chain_joins_sources() {
    let err = ETLError::extract(
        "sap",
        std::io::Error::new(std::io::ErrorKind::Other, "logon failed"),
    );
    assert_eq!(
        error_chain(&err),
        "Data source 'sap' failed to extract: logon failed"
    );
}

#[test]
fn test_next_order_index_starts_at_one() {
    let mut counter = 0;
    assert_eq!(next_order_index(&mut counter), 1);
    assert_eq!(next_order_index(&mut counter), 2);
}
