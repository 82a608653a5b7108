use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use toastbox_core::config::ResourceConfig;
use toastbox_core::resource::error::ResourceError;
use toastbox_core::resource::port::{Contrast, StaticTheme, Theme, ThemeInfo};
use toastbox_resource::{ResolveOptions, ResolvedSource, ResourceResolver, markup_values};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-body";

/// 极简 HTTP 服务器，记录每个请求的目标路径。
async fn spawn_server() -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let seen = seen.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let target = request
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();
                seen.lock().unwrap().push(target.clone());

                let path = target.split('?').next().unwrap_or("/");
                let head = match path {
                    "/image.png" => format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        PNG_BYTES.len()
                    ),
                    "/redirect" => "HTTP/1.1 302 Found\r\nLocation: /image.png\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                    "/loop" => "HTTP/1.1 302 Found\r\nLocation: /loop\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                    "/huge.png" => "HTTP/1.1 200 OK\r\nContent-Length: 5000000\r\nConnection: close\r\n\r\n".to_string(),
                    _ => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                };
                socket.write_all(head.as_bytes()).await.ok();
                if path == "/image.png" {
                    socket.write_all(PNG_BYTES).await.ok();
                }
                socket.shutdown().await.ok();
            });
        }
    });
    (addr, requests)
}

fn resolver(root: &Path) -> ResourceResolver {
    let config = ResourceConfig {
        cache_dir: Some(root.to_path_buf()),
        ..ResourceConfig::default()
    };
    let theme = StaticTheme(ThemeInfo {
        contrast: Contrast::High,
        lang: "tr-tr".to_string(),
        theme: Theme::Dark,
    });
    ResourceResolver::new(&config, Arc::new(theme)).unwrap()
}

#[tokio::test]
async fn test_remote_image_is_downloaded_and_removed_on_close() {
    let (addr, _) = spawn_server().await;
    let root = tempfile::tempdir().unwrap();
    let session = resolver(root.path()).session().unwrap();
    let uri = format!("http://{}/image.png", addr);

    let resolved = session
        .resolve(&uri, &ResolveOptions::default())
        .await
        .unwrap();
    let path = resolved.path().unwrap().to_path_buf();
    assert!(path.starts_with(root.path()));
    assert_eq!(std::fs::read(&path).unwrap(), PNG_BYTES);
    assert!(resolved.markup_value().starts_with("file:///"));

    session.close();
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_drop_removes_session_files() {
    let (addr, _) = spawn_server().await;
    let root = tempfile::tempdir().unwrap();
    let path = {
        let session = resolver(root.path()).session().unwrap();
        let resolved = session
            .resolve(&format!("http://{}/image.png", addr), &ResolveOptions::default())
            .await
            .unwrap();
        resolved.path().unwrap().to_path_buf()
    };
    assert!(!path.exists());
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (addr, _) = spawn_server().await;
    let root = tempfile::tempdir().unwrap();
    let resolver = resolver(root.path());
    let uri = format!("http://{}/image.png", addr);

    let first = resolver.session().unwrap();
    let second = resolver.session().unwrap();
    let a = first.resolve(&uri, &ResolveOptions::default()).await.unwrap();
    let b = second.resolve(&uri, &ResolveOptions::default()).await.unwrap();
    assert_ne!(a.path(), b.path());

    first.close();
    assert!(b.path().unwrap().exists());
}

#[tokio::test]
async fn test_query_params_are_appended() {
    let (addr, requests) = spawn_server().await;
    let root = tempfile::tempdir().unwrap();
    let session = resolver(root.path()).session().unwrap();
    let options = ResolveOptions {
        remote: true,
        query_params: true,
    };
    session
        .resolve(&format!("http://{}/image.png?size=large", addr), &options)
        .await
        .unwrap();

    let seen = requests.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec!["/image.png?size=large&ms-contrast=high&ms-lang=tr-tr&ms-theme=dark".to_string()]
    );
}

#[tokio::test]
async fn test_redirects_are_followed_and_capped() {
    let (addr, _) = spawn_server().await;
    let root = tempfile::tempdir().unwrap();
    let session = resolver(root.path()).session().unwrap();

    let resolved = session
        .resolve(&format!("http://{}/redirect", addr), &ResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(std::fs::read(resolved.path().unwrap()).unwrap(), PNG_BYTES);

    let looped = session
        .resolve(&format!("http://{}/loop", addr), &ResolveOptions::default())
        .await;
    assert!(matches!(looped, Err(ResourceError::Network(_))));
}

#[tokio::test]
async fn test_download_errors() {
    let (addr, _) = spawn_server().await;
    let root = tempfile::tempdir().unwrap();
    let session = resolver(root.path()).session().unwrap();

    let missing = session
        .resolve(&format!("http://{}/missing.png", addr), &ResolveOptions::default())
        .await;
    assert!(matches!(
        missing,
        Err(ResourceError::Status { status: 404, .. })
    ));

    let huge = session
        .resolve(&format!("http://{}/huge.png", addr), &ResolveOptions::default())
        .await;
    assert!(matches!(
        huge,
        Err(ResourceError::TooLarge { size: 5_000_000, .. })
    ));
}

#[tokio::test]
async fn test_resolve_all_fails_closed() {
    let (addr, _) = spawn_server().await;
    let root = tempfile::tempdir().unwrap();
    let session = resolver(root.path()).session().unwrap();
    let good = format!("http://{}/image.png", addr);
    let bad = format!("http://{}/missing.png", addr);

    let all = session
        .resolve_all([good.as_str(), "data:text/plain;base64,aGk="], &ResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    let values = markup_values(&all);
    assert!(values[&good].starts_with("file:///"));

    let failed = session
        .resolve_all([good.as_str(), bad.as_str()], &ResolveOptions::default())
        .await;
    assert!(failed.is_err());
}

#[tokio::test]
async fn test_data_uri_is_written_to_session() {
    let root = tempfile::tempdir().unwrap();
    let session = resolver(root.path()).session().unwrap();
    let resolved = session
        .resolve("data:image/png;base64,aGVsbG8=", &ResolveOptions::default())
        .await
        .unwrap();
    match resolved {
        ResolvedSource::File(path) => assert_eq!(std::fs::read(path).unwrap(), b"hello"),
        other => panic!("unexpected source: {:?}", other),
    }
}

#[tokio::test]
async fn test_data_uri_respects_size_limit() {
    let root = tempfile::tempdir().unwrap();
    let config = ResourceConfig {
        cache_dir: Some(root.path().to_path_buf()),
        max_download_bytes: 4,
        ..ResourceConfig::default()
    };
    let resolver = ResourceResolver::new(&config, Arc::new(StaticTheme::default())).unwrap();
    let session = resolver.session().unwrap();

    let result = session
        .resolve("data:image/png;base64,aGVsbG8=", &ResolveOptions::default())
        .await;
    match result {
        Err(ResourceError::TooLarge { uri, size, limit }) => {
            assert_eq!(uri, "data:image/png;base64");
            assert_eq!(size, 5);
            assert_eq!(limit, 4);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(
        session
            .resolve("data:image/png;base64,aGk=", &ResolveOptions::default())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_icon_is_rendered_once_per_session() {
    let root = tempfile::tempdir().unwrap();
    let config = ResourceConfig {
        cache_dir: Some(root.path().to_path_buf()),
        icon_font: Some(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/square.ttf")),
        icon_size: 48,
        ..ResourceConfig::default()
    };
    let resolver = ResourceResolver::new(&config, Arc::new(StaticTheme::default())).unwrap();
    let session = resolver.session().unwrap();
    let uri = "icon://E700?foreground=#FFFFFF&background=#0078D4&padding=16";

    let resolved = session
        .resolve_all([uri, uri], &ResolveOptions::default())
        .await
        .unwrap();
    let first = resolved[uri].path().unwrap().to_path_buf();
    let again = session.resolve(uri, &ResolveOptions::default()).await.unwrap();
    assert_eq!(again.path(), Some(first.as_path()));
    assert_eq!(std::fs::read_dir(session.path()).unwrap().count(), 1);

    let png = std::fs::read(&first).unwrap();
    assert!(png.starts_with(b"\x89PNG"));

    let other = session
        .resolve("icon://E700?padding=4", &ResolveOptions::default())
        .await
        .unwrap();
    assert_ne!(other.path(), Some(first.as_path()));
    assert_eq!(std::fs::read_dir(session.path()).unwrap().count(), 2);
}
