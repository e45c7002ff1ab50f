//! HTTP adapter integration tests against mockito servers.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use appsurveyor_core::{
    AccessTokens, AppInfo, AppSurveyorError, ClassificationOracle, Collaborators, DataAccess,
    DataRequest, OracleConfig, ScanConfig, ScanOrchestrator, SchemaSource, SensitivityLabel,
    adapters::{HttpDataAccess, HttpSchemaSource, build_http_client},
    classifier::Classifier,
    oracle::{ChatOracle, ClassificationRequest, ColumnSamples},
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use zeroize::Zeroizing;

const TOKEN_X: &str = "izOe/w==";
const TOKEN_Y: &str = "p1w5+CLC";

fn tokens() -> AccessTokens {
    AccessTokens::new(TOKEN_X.to_string(), TOKEN_Y.to_string()).unwrap()
}

fn chat_reply(content: &str) -> String {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
}

#[tokio::test]
async fn test_http_schema_source_fetches_dbml() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Regex(r"^/api/schema/.+$".to_string()))
        .match_query(Matcher::UrlEncoded("format".into(), "dbml".into()))
        .with_status(200)
        .with_body("Table users {\n  email text\n}\n")
        .create_async()
        .await;

    let source = HttpSchemaSource::new(build_http_client(Some(5)).unwrap(), server.url());
    let description = source.fetch_schema("https://shop.example.com").await.unwrap();

    assert!(description.contains("Table users"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_schema_source_status_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", Matcher::Regex(r"^/api/schema/.+$".to_string()))
        .match_query(Matcher::Any)
        .with_status(404)
        .create_async()
        .await;

    let source = HttpSchemaSource::new(build_http_client(None).unwrap(), server.url());
    let err = source.fetch_schema("https://shop.example.com").await.unwrap_err();
    assert!(matches!(err, AppSurveyorError::UpstreamStatus { status: 404, .. }));
    assert!(!err.to_string().contains("format=dbml"));
}

#[tokio::test]
async fn test_http_app_info_reads_meta() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/1.1/meta")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"app_data": {"appname": "shop-123"}}).to_string())
        .create_async()
        .await;

    let source = HttpSchemaSource::new(build_http_client(None).unwrap(), "http://unused.invalid");
    let info = source.fetch_app_info(&server.url()).await.unwrap();
    assert_eq!(info.app_name, "shop-123");
    assert_eq!(info.app_url, server.url());
}

#[tokio::test]
async fn test_http_app_info_falls_back_to_hostname() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/1.1/meta")
        .with_status(404)
        .create_async()
        .await;

    let source = HttpSchemaSource::new(build_http_client(None).unwrap(), "http://unused.invalid");
    let info = source.fetch_app_info(&server.url()).await.unwrap();
    // The mock server listens on 127.0.0.1; the first label is used.
    assert_eq!(info.app_name, "127");
}

#[tokio::test]
async fn test_http_data_access_posts_tokens_in_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/fetch")
        .match_body(Matcher::PartialJson(json!({
            "x": TOKEN_X,
            "y": TOKEN_Y,
            "appName": "shop",
            "appUrl": "https://shop.example.com",
            "payload": {
                "appname": "shop",
                "app_version": "test",
                "type": "custom.orders",
                "n": 5,
                "from": 0,
                "constraints": [],
                "sorts_list": [],
                "situation": "initial search"
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"body": {"hits": {"hits": []}, "at_end": true}}).to_string())
        .create_async()
        .await;

    let access = HttpDataAccess::new(
        build_http_client(None).unwrap(),
        format!("{}/fetch", server.url()),
        tokens(),
    )
    .with_app_version("test");
    let raw = access
        .fetch(&DataRequest {
            app: AppInfo {
                app_url: "https://shop.example.com".to_string(),
                app_name: "shop".to_string(),
            },
            table_type: "custom.orders".to_string(),
            page_size: 5,
            offset: 0,
        })
        .await
        .unwrap();

    assert_eq!(raw["body"]["at_end"], true);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_data_access_error_never_leaks_tokens() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/fetch")
        .match_query(Matcher::Any)
        .with_status(502)
        .create_async()
        .await;

    let access = HttpDataAccess::new(
        build_http_client(None).unwrap(),
        format!("{}/fetch?x={}", server.url(), TOKEN_X),
        tokens(),
    );
    let err = access
        .fetch(&DataRequest {
            app: AppInfo {
                app_url: "https://shop.example.com".to_string(),
                app_name: "shop".to_string(),
            },
            table_type: "user".to_string(),
            page_size: 10,
            offset: 0,
        })
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(matches!(err, AppSurveyorError::UpstreamStatus { status: 502, .. }));
    assert!(!message.contains(TOKEN_X));
    assert!(!message.contains(TOKEN_Y));
}

#[tokio::test]
async fn test_http_chat_oracle_classifies() {
    let mut server = Server::new_async().await;
    let answer = "Here is the result:\n```json\n{\"fields\": [\
        {\"name\": \"email\", \"sensitivity\": \"high\"},\
        {\"name\": \"invented\", \"sensitivity\": \"high\"}]}\n```";
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({"model": "gpt-4o-mini"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_reply(answer))
        .create_async()
        .await;

    let oracle = ChatOracle::new(
        build_http_client(None).unwrap(),
        &format!("{}/v1/", server.url()),
        "gpt-4o-mini",
        Zeroizing::new("sk-test".to_string()),
    );
    let classifier = Classifier::new(Arc::new(oracle), ScanConfig::default());
    let request = ClassificationRequest {
        table_id: "users".to_string(),
        display_name: "Users".to_string(),
        columns: vec![
            ColumnSamples {
                name: "email".to_string(),
                examples: vec!["ada@example.com".to_string()],
            },
            ColumnSamples {
                name: "plan".to_string(),
                examples: vec!["pro".to_string()],
            },
        ],
    };

    let labels = classifier.classify(&request).await.unwrap();
    assert_eq!(labels.get("email"), Some(&SensitivityLabel::High));
    assert_eq!(labels.get("plan"), Some(&SensitivityLabel::Low));
    assert!(!labels.contains_key("invented"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_chat_oracle_status_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .create_async()
        .await;

    let oracle = ChatOracle::new(
        build_http_client(None).unwrap(),
        &server.url(),
        "gpt-4o-mini",
        Zeroizing::new("sk-test".to_string()),
    );
    let request = ClassificationRequest {
        table_id: "users".to_string(),
        display_name: "Users".to_string(),
        columns: vec![ColumnSamples {
            name: "email".to_string(),
            examples: vec![],
        }],
    };
    let err = oracle.classify_columns(&request).await.unwrap_err();
    assert!(matches!(err, AppSurveyorError::UpstreamStatus { status: 429, .. }));
    assert!(!err.to_string().contains("sk-test"));
}

#[test]
fn test_chat_oracle_requires_api_key() {
    let config = OracleConfig {
        api_key_env: "APPSURVEYOR_TEST_ORACLE_KEY".to_string(),
        ..OracleConfig::default()
    };

    temp_env::with_var_unset("APPSURVEYOR_TEST_ORACLE_KEY", || {
        let err = ChatOracle::from_config(build_http_client(None).unwrap(), &config).unwrap_err();
        assert!(matches!(err, AppSurveyorError::Configuration { .. }));
        assert!(err.to_string().contains("APPSURVEYOR_TEST_ORACLE_KEY"));
    });

    temp_env::with_var("APPSURVEYOR_TEST_ORACLE_KEY", Some("sk-live-secret"), || {
        let oracle = ChatOracle::from_config(build_http_client(None).unwrap(), &config).unwrap();
        assert!(!format!("{:?}", oracle).contains("sk-live-secret"));
    });
}

#[tokio::test]
async fn test_http_integration_full_scan() {
    let mut server = Server::new_async().await;
    let base = server.url();

    server
        .mock("GET", Matcher::Regex(r"^/schema/api/schema/.+$".to_string()))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("Table users {\n  email text\n  name text\n}\n\nTable logs {\n  line text\n}\n")
        .create_async()
        .await;
    server
        .mock("GET", "/api/1.1/meta")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"app_data": {"appname": "shop"}}).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/fetch")
        .match_body(Matcher::PartialJson(json!({"payload": {"type": "custom.users"}})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"body": {"hits": {"hits": [
                {"_id": "1", "_source": {"email": "ada@example.com", "name": "Ada"}}
            ]}, "at_end": true}})
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("POST", "/fetch")
        .match_body(Matcher::PartialJson(json!({"payload": {"type": "custom.logs"}})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"status": 401, "message": "unauthorized"}).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/oracle/chat/completions")
        .match_body(Matcher::Regex("classify database columns".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_reply(
            r#"{"fields": [{"name": "email", "sensitivity": "high"}, {"name": "name", "sensitivity": "moderate"}]}"#,
        ))
        .create_async()
        .await;
    server
        .mock("POST", "/oracle/chat/completions")
        .match_body(Matcher::Regex("rank exposed application tables".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_reply(
            r#"{"risk": "Emails are exposed.", "tables": [{"name": "users", "columns": ["email"]}]}"#,
        ))
        .create_async()
        .await;

    let client = build_http_client(Some(10)).unwrap();
    let oracle = Arc::new(ChatOracle::new(
        client.clone(),
        &format!("{}/oracle", base),
        "gpt-4o-mini",
        Zeroizing::new("sk-test".to_string()),
    ));
    let collaborators = Collaborators {
        schema: Arc::new(HttpSchemaSource::new(client.clone(), format!("{}/schema", base))),
        data: Arc::new(HttpDataAccess::new(client, format!("{}/fetch", base), tokens())),
        classification: oracle.clone(),
        prioritization: oracle,
    };
    let orchestrator = ScanOrchestrator::new(collaborators, ScanConfig::default()).unwrap();

    let report = orchestrator.run_scan(&base).await.unwrap();
    assert_eq!(report.app.as_ref().unwrap().app_name, "shop");

    let users = report.tables.iter().find(|t| t.id == "users").unwrap();
    assert_eq!(users.sensitivity.as_ref().unwrap().level, SensitivityLabel::High);
    let logs = report.tables.iter().find(|t| t.id == "logs").unwrap();
    assert!(!logs.has_real_data());
    assert!(logs.sensitivity.is_none());

    let summary = report.summary.unwrap();
    assert_eq!(summary.risk, "Emails are exposed.");
    assert_eq!(summary.tables[0].columns, vec!["email"]);

    let json = serde_json::to_string(&orchestrator.report().await.unwrap()).unwrap();
    assert!(!json.contains(TOKEN_X));
    assert!(!json.contains(TOKEN_Y));
}
