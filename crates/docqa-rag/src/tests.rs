//! Scenario tests across ingestion, storage and retrieval

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use insta::assert_json_snapshot;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::{
    Answer, Chunker, ContextAssembler, DocumentStore, HashEmbedder, IngestionPipeline,
    LLMProvider, LocalDocumentStore, QuestionAnswerer, Result, Retrieval, RetrievalConfig,
    Retriever, SourceFilter, StagingArea, UploadedFile,
};

/// Build a PDF with one page per entry of `pages`
fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let kids: Vec<Object> = pages
        .iter()
        .map(|text| {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<LocalDocumentStore>,
    embedder: Arc<HashEmbedder>,
    pipeline: IngestionPipeline,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalDocumentStore::in_memory());
        let embedder = Arc::new(HashEmbedder::new(384).unwrap());
        let pipeline = IngestionPipeline::new(
            StagingArea::new(dir.path().join("staging")),
            Chunker::new(200, 20).unwrap(),
            embedder.clone(),
            store.clone(),
        );
        Self {
            _dir: dir,
            store,
            embedder,
            pipeline,
        }
    }

    fn retriever(&self) -> Retriever {
        Retriever::with_store(
            self.embedder.clone(),
            self.store.clone(),
            RetrievalConfig::default(),
        )
    }
}

#[tokio::test]
async fn test_ingested_marker_is_retrieved_first() {
    let harness = Harness::new();
    harness
        .pipeline
        .ingest(vec![
            UploadedFile::new("filler.txt", b"Bananas are yellow and grow in bunches.".to_vec()),
            UploadedFile::new("secret.txt", b"The vault code word is zephyrquokka.".to_vec()),
        ])
        .await
        .unwrap();

    let retrieval = harness.retriever().retrieve("zephyrquokka", 3).await;
    let passages = retrieval.passages();
    assert!(!passages.is_empty());
    assert!(passages[0].content().contains("zephyrquokka"));
    assert_eq!(passages[0].source(), "secret.txt");
}

#[tokio::test]
async fn test_unrelated_query_reports_no_relevant_documents() {
    let harness = Harness::new();
    harness
        .pipeline
        .ingest(vec![UploadedFile::new(
            "cats.txt",
            b"Cats sleep for most of the day.".to_vec(),
        )])
        .await
        .unwrap();

    let retrieval = harness.retriever().retrieve("quantum physics lecture", 3).await;
    assert!(matches!(retrieval, Retrieval::NoRelevantDocuments));
}

#[tokio::test]
async fn test_empty_store_reports_no_relevant_documents() {
    let harness = Harness::new();
    assert!(!harness.retriever().retrieve("anything", 3).await.is_relevant());
}

#[tokio::test]
async fn test_pdf_pages_are_attributed() {
    let harness = Harness::new();
    let pdf = pdf_with_pages(&["Chapter one covers onboarding.", "Chapter two covers payroll."]);
    let report = harness
        .pipeline
        .ingest(vec![UploadedFile::new("handbook.pdf", pdf)])
        .await
        .unwrap();
    assert_eq!(report.pages, 2);

    let passages = harness.retriever().retrieve("payroll", 1).await.into_passages();
    assert_eq!(passages[0].source(), "handbook.pdf");
    assert_eq!(passages[0].page(), 2);
    assert_eq!(passages[0].record.attribution(), "handbook.pdf (page 2)");
}

#[tokio::test]
async fn test_delete_by_source_and_stats() {
    let harness = Harness::new();
    harness
        .pipeline
        .ingest(vec![
            UploadedFile::new("Q3-report.pdf", pdf_with_pages(&["Quarterly results."])),
            UploadedFile::new("faq.json", br#"[{"q": "hours?"}, {"q": "parking?"}]"#.to_vec()),
            UploadedFile::new("notes.txt", b"Loose notes.".to_vec()),
        ])
        .await
        .unwrap();

    let stats = harness.store.stats().await.unwrap();
    assert_json_snapshot!(stats, @r###"
    {
      "total_documents": 4,
      "pdf_documents": 1,
      "json_documents": 2,
      "text_documents": 1
    }
    "###);

    let removed = harness.store.delete_by_source_pattern("q3-REPORT").await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(
        harness
            .store
            .count(&SourceFilter::pattern("report").unwrap())
            .await
            .unwrap(),
        0
    );
    assert_eq!(harness.store.count(&SourceFilter::All).await.unwrap(), 3);
}

#[tokio::test]
async fn test_same_name_uploads_are_both_kept() {
    let harness = Harness::new();
    harness
        .pipeline
        .ingest(vec![
            UploadedFile::new("notes.txt", b"First upload about apples.".to_vec()),
            UploadedFile::new("notes.txt", b"Second upload about oranges.".to_vec()),
        ])
        .await
        .unwrap();

    assert_eq!(harness.store.count(&SourceFilter::All).await.unwrap(), 2);
}

#[tokio::test]
async fn test_persisted_passages_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("passages.json");
    let embedder = Arc::new(HashEmbedder::new(64).unwrap());

    {
        let store = Arc::new(LocalDocumentStore::open(&store_path, Some(64)).await.unwrap());
        let pipeline = IngestionPipeline::new(
            StagingArea::new(dir.path().join("staging")),
            Chunker::default(),
            embedder.clone(),
            store,
        );
        pipeline
            .ingest(vec![UploadedFile::new("kept.txt", b"Durable passage text.".to_vec())])
            .await
            .unwrap();
    }

    let reopened = Arc::new(LocalDocumentStore::open(&store_path, Some(64)).await.unwrap());
    assert_eq!(reopened.count(&SourceFilter::All).await.unwrap(), 1);

    let retriever = Retriever::with_store(embedder, reopened, RetrievalConfig::default());
    let passages = retriever.retrieve("durable passage", 3).await.into_passages();
    assert_eq!(passages[0].source(), "kept.txt");
}

/// Returns the prompt it was given so tests can inspect it
struct EchoLlm {
    last_prompt: Mutex<Option<String>>,
}

#[async_trait]
impl LLMProvider for EchoLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        Ok("answer".to_string())
    }

    fn model_id(&self) -> &str {
        "echo"
    }
}

#[tokio::test]
async fn test_answer_cites_each_source_once_and_truncates_context() {
    let harness = Harness::new();
    let body = "Glaciers retreat as summers warm. ".repeat(30);
    harness
        .pipeline
        .ingest(vec![UploadedFile::new("glaciers.txt", body.into_bytes())])
        .await
        .unwrap();

    let llm = Arc::new(EchoLlm {
        last_prompt: Mutex::new(None),
    });
    let answerer = QuestionAnswerer::new(
        harness.retriever(),
        ContextAssembler::new(50),
        llm.clone(),
    );

    let answer = answerer.answer("Why do glaciers retreat?").await.unwrap();
    assert_eq!(
        answer,
        Answer {
            response: "answer".to_string(),
            sources: vec!["glaciers.txt".to_string()],
        }
    );

    let prompt = llm.last_prompt.lock().unwrap().clone().unwrap();
    let context = prompt
        .split("Document Context:\n")
        .nth(1)
        .and_then(|rest| rest.split("\nQuestion:").next())
        .unwrap()
        .trim_end_matches('\n');
    // three excerpts of at most 50 characters separated by blank lines
    assert_eq!(context.matches("\n\n").count(), 2);
    assert!(context.chars().count() <= 3 * 50 + 2 * 2);
}
