//! Integration tests for the JSON request protocol.

use pdfsplice::config::ServiceConfig;
use pdfsplice::protocol::{FilePayload, Request, RequestHandler, Response};
use pdfsplice::serve::serve;
use pdfsplice::service::PdfService;
use serde_json::json;
use std::sync::Arc;

use crate::common::{page_content, page_contents, tagged_pdf};

fn handler(config: ServiceConfig) -> RequestHandler {
    RequestHandler::new(Arc::new(PdfService::new(config).unwrap()))
}

fn request_line(request: &Request) -> String {
    format!("{}\n", serde_json::to_string(request).unwrap())
}

async fn exchange(handler: RequestHandler, input: String) -> Vec<Response> {
    let mut output = Vec::new();
    serve(handler, input.as_bytes(), &mut output, 4).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_analyze_then_split_over_serve() {
    let handler = handler(ServiceConfig::default());

    let analyze = Request::Analyze {
        file: FilePayload::encode(Some("report.pdf".to_string()), &tagged_pdf("R", 4)),
    };
    let responses = exchange(handler.clone(), request_line(&analyze)).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].status, 200);
    assert_eq!(responses[0].page_count, Some(4));
    let key = responses[0].key.clone().unwrap();

    let split = json!({ "action": "split", "filename": key, "pages": [4, 2] }).to_string();
    let responses = exchange(handler, format!("{split}\n{split}\n")).await;

    assert_eq!(responses[0].status, 200);
    assert_eq!(responses[0].content_type, "application/pdf");
    assert_eq!(responses[0].filename.as_deref(), Some("split_pages_2_4.pdf"));
    let bytes = responses[0].decode_data().unwrap().unwrap();
    assert_eq!(
        page_contents(&bytes),
        vec![page_content("R", 2), page_content("R", 4)]
    );

    assert_eq!(responses[1].status, 404);
    assert_eq!(responses[1].kind.as_deref(), Some("CacheKeyNotFound"));
}

#[tokio::test]
async fn test_merge_over_serve() {
    let merge = Request::Merge {
        files: vec![
            FilePayload::encode(Some("a.pdf".to_string()), &tagged_pdf("A", 1)),
            FilePayload::encode(None, &tagged_pdf("B", 2)),
        ],
    };
    let responses = exchange(handler(ServiceConfig::default()), request_line(&merge)).await;

    let response = &responses[0];
    assert_eq!(response.status, 200);
    assert_eq!(response.filename.as_deref(), Some("merged.pdf"));
    assert_eq!(response.page_count, Some(3));
    assert!(response.key.is_none());
}

#[tokio::test]
async fn test_error_statuses_over_serve() {
    let config = ServiceConfig {
        max_upload_bytes: 64,
        ..Default::default()
    };
    let input = [
        json!({ "action": "explode" }).to_string(),
        json!({ "action": "merge", "files": [] }).to_string(),
        json!({ "action": "analyze", "file": { "name": "big.pdf", "data": "A".repeat(400) } })
            .to_string(),
        json!({ "action": "analyze", "file": { "name": "x.pdf", "data": "bm90IGEgcGRm" } })
            .to_string(),
        json!({ "action": "split", "key": "nope", "pages": "1" }).to_string(),
    ]
    .join("\n");

    let responses = exchange(handler(config), input).await;
    let statuses: Vec<u16> = responses.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![400, 400, 413, 422, 404]);
    assert!(responses.iter().all(|r| r.error.is_some() && r.data.is_none()));
}

#[tokio::test]
async fn test_cleanup_over_serve() {
    let handler = handler(ServiceConfig::default());
    let analyze = Request::Analyze {
        file: FilePayload::encode(None, &tagged_pdf("C", 1)),
    };
    let key = exchange(handler.clone(), request_line(&analyze)).await[0]
        .key
        .clone()
        .unwrap();

    let cleanup = request_line(&Request::Cleanup { key });
    let responses = exchange(handler, format!("{cleanup}{cleanup}")).await;

    assert_eq!(responses[0].removed, Some(true));
    assert_eq!(responses[1].removed, Some(false));
    assert!(responses.iter().all(Response::is_success));
}

#[tokio::test]
async fn test_huge_page_range_gets_short_answer() {
    let handler = handler(ServiceConfig::default());
    let analyze = Request::Analyze {
        file: FilePayload::encode(None, &tagged_pdf("H", 1)),
    };
    let key = exchange(handler.clone(), request_line(&analyze)).await[0]
        .key
        .clone()
        .unwrap();

    let split = json!({ "action": "split", "key": key, "pages": "1-4000000000" }).to_string();
    let responses = exchange(handler, format!("{split}\n")).await;

    assert_eq!(responses[0].status, 400);
    assert_eq!(responses[0].kind.as_deref(), Some("InvalidPageSelection"));
    let message = responses[0].error.as_deref().unwrap();
    assert!(message.len() < 200, "{message}");
    assert!(message.contains("and 3999999989 more"));
}
