//! Discovery plus Gemini analysis, both served by one mock server.

use serde_json::json;
use termscope_core::AnalysisMethod;
use termscope_runtime::{RuntimeConfig, TermsScope};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/models/gemini-2.5-flash:generateContent";

const ANALYSIS: &str = r#"{
  "privacy_score": 88,
  "score_explanation": "Collects little.",
  "terms_analysis": {
    "ok": ["Deletion on request"],
    "neutral": ["Uses analytics cookies"],
    "bad": ["Sells data to data brokers"]
  },
  "data_selling": "Yes, to data brokers.",
  "data_buyers": ["Data brokers"],
  "data_storage": "Indefinitely.",
  "main_concerns": ["Data sales"],
  "user_rights": "Deletion.",
  "summary": "Sells personal data."
}"#;

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
}

fn model_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{"content": {"parts": [{"text": text}]}, "finishReason": "STOP"}],
        "usageMetadata": {"promptTokenCount": 2000, "candidatesTokenCount": 400}
    }))
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<footer><a href="/privacy-policy">Privacy Policy</a></footer>"#))
        .mount(server)
        .await;
    let policy = format!(
        "<html><body><nav>Home</nav><main><h1>Privacy Policy</h1><p>{}</p></main></body></html>",
        "We sell the personal data we collect to data brokers and marketing partners. ".repeat(5)
    );
    Mock::given(method("GET"))
        .and(path("/privacy-policy"))
        .respond_with(html(&policy))
        .mount(server)
        .await;
}

fn scope(server: &MockServer) -> TermsScope {
    let mut config = RuntimeConfig::default();
    config
        .provider
        .options
        .insert("api_key".to_string(), json!("test-key"));
    config
        .provider
        .options
        .insert("base_url".to_string(), json!(server.uri()));
    TermsScope::builder().config(config).build().unwrap()
}

#[tokio::test]
async fn url_mode_analysis_is_rubric_checked() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(json!({"tools": [{"urlContext": {}}]})))
        .respond_with(model_reply(ANALYSIS))
        .expect(1)
        .mount(&server)
        .await;

    let report = scope(&server)
        .analyze_with_report(&server.uri())
        .await
        .unwrap();

    assert_eq!(report.result.analysis_method, AnalysisMethod::Url);
    let analysis = report.result.analysis.unwrap();
    assert!(analysis.privacy_score <= 69);
    assert!(report.result.raw_analysis.is_none());
    assert_eq!(report.usage.llm_calls, 1);
    assert_eq!(report.usage.prompt_tokens, 2000);
}

#[tokio::test]
async fn url_mode_error_falls_back_to_page_text() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(json!({"tools": [{"urlContext": {}}]})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "URL context is not supported."}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(
            json!({"generationConfig": {"responseMimeType": "application/json"}}),
        ))
        .respond_with(model_reply(ANALYSIS))
        .expect(1)
        .mount(&server)
        .await;

    let report = scope(&server)
        .analyze_with_report(&server.uri())
        .await
        .unwrap();

    assert_eq!(report.result.analysis_method, AnalysisMethod::Text);
    assert!(report.result.analysis.is_some());
    assert_eq!(report.usage.llm_calls, 2);

    let text_call = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .rfind(|r| r.url.path() == ENDPOINT)
        .unwrap();
    let body = String::from_utf8_lossy(&text_call.body);
    assert!(body.contains("marketing partners"));
    assert!(!body.contains("<nav>"));
}

#[tokio::test]
async fn missing_api_key_fails_build() {
    std::env::remove_var("GEMINI_API_KEY");
    let result = TermsScope::builder().config(RuntimeConfig::default()).build();
    assert!(result.is_err());
}
