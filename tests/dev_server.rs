// tests/dev_server.rs

use std::error::Error;
use std::net::SocketAddr;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;

use assetdag::reload::ReloadHub;
use assetdag::server::DevServer;
use assetdag_test_utils::{init_tracing, with_timeout, write_tree};

type TestResult = Result<(), Box<dyn Error>>;

async fn start(root: &std::path::Path) -> Result<SocketAddr, Box<dyn Error>> {
    let server = DevServer::bind("127.0.0.1:0".parse()?, root, ReloadHub::new()).await?;
    let addr = server.local_addr()?;
    tokio::spawn(server.run());
    Ok(addr)
}

fn content_type(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn serves_build_root_with_live_reload_injected() -> TestResult {
    with_timeout(async {
        init_tracing();
        let dir = tempfile::tempdir()?;
        write_tree(
            dir.path(),
            [
                ("index.html", "<html><body><h1>hi</h1></body></html>"),
                ("assets/css/main.css", ".a{color:red}"),
            ],
        );
        let addr = start(dir.path()).await?;

        let resp = reqwest::get(format!("http://{addr}/")).await?;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(content_type(&resp).starts_with("text/html"));
        let body = resp.text().await?;
        assert_eq!(
            body,
            "<html><body><h1>hi</h1><script src=\"/__assetdag/client.js\"></script></body></html>"
        );

        let resp = reqwest::get(format!("http://{addr}/assets/css/main.css")).await?;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(content_type(&resp).starts_with("text/css"));
        assert_eq!(resp.text().await?, ".a{color:red}");

        let resp = reqwest::get(format!("http://{addr}/assets/missing.js")).await?;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = reqwest::get(format!("http://{addr}/__assetdag/client.js")).await?;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(content_type(&resp).starts_with("application/javascript"));
        assert!(resp.text().await?.contains("/__assetdag/reload"));
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn missing_build_root_is_404_not_a_crash() -> TestResult {
    with_timeout(async {
        let dir = tempfile::tempdir()?;
        let addr = start(&dir.path().join("build")).await?;

        let resp = reqwest::get(format!("http://{addr}/")).await?;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn encoded_file_names_are_served() -> TestResult {
    with_timeout(async {
        let dir = tempfile::tempdir()?;
        write_tree(
            dir.path(),
            [
                ("assets/images/hero image.svg", "<svg/>"),
                ("café.html", "<p>menu</p>"),
            ],
        );
        let addr = start(dir.path()).await?;

        let resp = reqwest::get(format!("http://{addr}/assets/images/hero%20image.svg")).await?;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(content_type(&resp).starts_with("image/svg+xml"));
        assert_eq!(resp.text().await?, "<svg/>");

        let resp = reqwest::get(format!("http://{addr}/caf%C3%A9.html")).await?;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.text().await?.starts_with("<p>menu</p>"));

        let resp = reqwest::get(format!("http://{addr}/%2e%2e%2fsecret.txt")).await?;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}
