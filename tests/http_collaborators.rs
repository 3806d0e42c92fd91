//! Outbound collaborators and the HTTP front end against local mock servers

use async_trait::async_trait;
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ul_resolver::config::{Args, ResolverConfig, UnrecognizedPointerPolicy};
use ul_resolver::server::{self, AppState};
use ul_resolver::services::{
    ContentFetcher, ContentGateway, EndpointRegistry, FetchError, GatewayChain, HttpFetcher,
    JsonRpcReader, NetworkEntry, ReadError, RemoteReader, Resolver,
};

const CONTRACT: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

/// ABI encoding of a single `string` return value
fn abi_string(s: &str) -> String {
    let mut out = vec![0u8; 32];
    out[31] = 0x20;
    let mut len = [0u8; 32];
    len[24..].copy_from_slice(&(s.len() as u64).to_be_bytes());
    out.extend_from_slice(&len);
    out.extend_from_slice(s.as_bytes());
    while out.len() % 32 != 0 {
        out.push(0);
    }
    format!("0x{}", hex::encode(out))
}

async fn mount_token_uri(server: &MockServer, uri: &str) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_call"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": abi_string(uri),
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_http_fetcher_json_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipfs/good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "ok"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ipfs/not-json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5));

    let value = fetcher
        .get_json(&format!("{}/ipfs/good", server.uri()))
        .await
        .unwrap();
    assert_eq!(value, json!({"name": "ok"}));

    let missing = fetcher
        .get_json(&format!("{}/ipfs/absent", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(missing, FetchError::Status(404));

    let garbled = fetcher
        .get_json(&format!("{}/ipfs/not-json", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(garbled, FetchError::Decode(_)));
}

#[tokio::test]
async fn test_http_fetcher_transport_error() {
    // Bind and drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpFetcher::new(Duration::from_secs(2));
    let err = fetcher
        .get_text(&format!("http://{}/meta", addr))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn test_gateway_chain_falls_over_to_token_gateway() {
    let public = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&public)
        .await;

    let private = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipfs/bafyCID"))
        .and(query_param("token", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"image": "ipfs://img"})))
        .expect(1)
        .mount(&private)
        .await;

    let chain = GatewayChain::new(vec![
        ContentGateway::new(format!("{}/ipfs/", public.uri()), ""),
        ContentGateway::new(format!("{}/ipfs/", private.uri()), "?token=s3cret"),
    ]);

    let fetcher = HttpFetcher::new(Duration::from_secs(5));
    let value = chain.fetch(&fetcher, "ipfs://bafyCID").await.unwrap();
    assert_eq!(value, json!({"image": "ipfs://img"}));
}

#[tokio::test]
async fn test_json_rpc_reader_decodes_token_uri() {
    let rpc = MockServer::start().await;
    mount_token_uri(&rpc, "ipfs://bafyCID/7.json").await;

    let reader = JsonRpcReader::new(Duration::from_secs(5));
    let uri = reader.token_uri(&rpc.uri(), CONTRACT, "7").await.unwrap();
    assert_eq!(uri, "ipfs://bafyCID/7.json");
}

#[tokio::test]
async fn test_json_rpc_reader_surfaces_rpc_error() {
    let rpc = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 3, "message": "execution reverted"},
        })))
        .mount(&rpc)
        .await;

    let reader = JsonRpcReader::new(Duration::from_secs(5));
    let err = reader.token_uri(&rpc.uri(), CONTRACT, "7").await.unwrap_err();
    assert_eq!(
        err,
        ReadError::Rpc {
            code: 3,
            message: "execution reverted".to_string()
        }
    );
}

#[tokio::test]
async fn test_json_rpc_reader_rejects_bad_token_id_without_calling() {
    let rpc = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&rpc)
        .await;

    let reader = JsonRpcReader::new(Duration::from_secs(5));
    let err = reader
        .token_uri(&rpc.uri(), CONTRACT, "not-a-number")
        .await
        .unwrap_err();
    assert!(matches!(err, ReadError::InvalidAssetId(_)));
}

async fn spawn_server(rpc_urls: Vec<String>, gateway: &MockServer) -> std::net::SocketAddr {
    let reader = Arc::new(JsonRpcReader::new(Duration::from_secs(5)));
    spawn_server_with_reader(rpc_urls, gateway, reader).await
}

async fn spawn_server_with_reader(
    rpc_urls: Vec<String>,
    gateway: &MockServer,
    reader: Arc<dyn RemoteReader>,
) -> std::net::SocketAddr {
    let registry = EndpointRegistry::new(vec![NetworkEntry {
        network: "3".to_string(),
        sub_network: "3336".to_string(),
        registry_instance: "51".to_string(),
        rpc_urls,
        chain_id: "2718".to_string(),
    }])
    .unwrap();

    let config = ResolverConfig {
        registry,
        gateways: GatewayChain::new(vec![ContentGateway::new(
            format!("{}/ipfs/", gateway.uri()),
            "",
        )]),
        unrecognized_pointer: UnrecognizedPointerPolicy::PassThrough,
        rpc_backoff: Duration::from_millis(10),
        request_timeout: Duration::from_secs(5),
    };

    let resolver = Resolver::new(
        Arc::new(config),
        reader,
        Arc::new(HttpFetcher::new(Duration::from_secs(5))),
    );
    let state = Arc::new(AppState::new(Args::parse_from(["ul-resolver"]), resolver));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::http::serve(listener, state));
    addr
}

fn location_url(addr: std::net::SocketAddr, sub_network: &str) -> String {
    format!(
        "http://{}/GlobalConsensus(3)/Parachain({})/PalletInstance(51)/AccountKey20({})/GeneralKey(789)",
        addr, sub_network, CONTRACT
    )
}

#[tokio::test]
async fn test_server_resolves_ipfs_metadata_after_rpc_failover() {
    let dead_rpc = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&dead_rpc)
        .await;

    let rpc = MockServer::start().await;
    mount_token_uri(&rpc, "ipfs://bafyCID").await;

    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipfs/bafyCID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "x"})))
        .mount(&gateway)
        .await;

    let addr = spawn_server(vec![dead_rpc.uri(), rpc.uri()], &gateway).await;

    let response = reqwest::get(location_url(addr, "3336")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({"data": "x"}));
}

#[tokio::test]
async fn test_server_error_bodies() {
    let gateway = MockServer::start().await;
    let rpc = MockServer::start().await;
    let addr = spawn_server(vec![rpc.uri()], &gateway).await;

    let response = reqwest::get(location_url(addr, "1")).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"code": 404, "name": "Not Found", "description": "RPC URLs not found."})
    );

    let response = reqwest::get(format!("http://{}/GlobalConsensus(3)", addr))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Bad Request");

    let response = reqwest::Client::new()
        .post(location_url(addr, "3336"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 405);
}

#[tokio::test]
async fn test_server_health() {
    let gateway = MockServer::start().await;
    let addr = spawn_server(vec!["http://127.0.0.1:1".to_string()], &gateway).await;

    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["healthy"], true);
    assert_eq!(body["networks"], 1);
    assert_eq!(body["gateways"], 1);
    assert_eq!(body["unrecognized_pointer"], "pass-through");
}

/// Reader that aborts its task mid-resolution
struct PanickingReader;

#[async_trait]
impl RemoteReader for PanickingReader {
    async fn token_uri(
        &self,
        _endpoint: &str,
        _contract: &str,
        _asset_id: &str,
    ) -> Result<String, ReadError> {
        panic!("reader blew up");
    }
}

/// Reader that echoes the token id it was asked for as a plain pointer
struct EchoReader;

#[async_trait]
impl RemoteReader for EchoReader {
    async fn token_uri(
        &self,
        _endpoint: &str,
        _contract: &str,
        asset_id: &str,
    ) -> Result<String, ReadError> {
        Ok(format!("ar://{}", asset_id))
    }
}

#[tokio::test]
async fn test_server_answers_500_when_resolution_panics() {
    let gateway = MockServer::start().await;
    let addr = spawn_server_with_reader(
        vec!["http://rpc.invalid".to_string()],
        &gateway,
        Arc::new(PanickingReader),
    )
    .await;

    let response = reqwest::get(location_url(addr, "3336")).await.unwrap();
    assert_eq!(response.status().as_u16(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 500);
    assert_eq!(body["name"], "Internal Server Error");
    assert!(!body["description"].as_str().unwrap().contains("blew up"));

    // The server keeps serving after the aborted task
    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_server_decodes_percent_escapes_in_path() {
    let gateway = MockServer::start().await;
    let addr = spawn_server_with_reader(
        vec!["http://rpc.invalid".to_string()],
        &gateway,
        Arc::new(EchoReader),
    )
    .await;

    let url = format!(
        "http://{}/GlobalConsensus(3)/Parachain(3336)/PalletInstance(51)/AccountKey20({})/GeneralKey(7%2089)",
        addr, CONTRACT
    );
    let response = reqwest::get(url).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({"token_uri": "ar://7 89"}));
}
