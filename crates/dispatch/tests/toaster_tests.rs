use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use toastbox_core::config::{IdentityConfig, ResourceConfig};
use toastbox_core::resource::error::ResourceError;
use toastbox_core::resource::port::StaticTheme;
use toastbox_core::toast::binding::Bindings;
use toastbox_core::toast::element::{Button, Image, Input, Progress, Text};
use toastbox_core::toast::entity::{
    DismissReason, NotificationMode, Outcome, Sound, Toast, UpdateStatus,
};
use toastbox_core::toast::error::ToastError;
use toastbox_core::toast::mock::MockPlatform;
use toastbox_dispatch::{SubmitOptions, Toaster};
use toastbox_resource::ResourceResolver;

const APP_ID: &str = "Toastbox.Tests";
// E_FAIL
const PLATFORM_FAILURE: i32 = -2_147_467_259;
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-body";

/// 只提供 /image.png 的极简 HTTP 服务器。
async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let found = request.starts_with("GET /image.png");
                let head = if found {
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        PNG_BYTES.len()
                    )
                } else {
                    "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_string()
                };
                socket.write_all(head.as_bytes()).await.ok();
                if found {
                    socket.write_all(PNG_BYTES).await.ok();
                }
                socket.shutdown().await.ok();
            });
        }
    });
    addr
}

fn setup(platform: &Arc<MockPlatform>, root: &Path) -> Arc<Toaster> {
    let config = ResourceConfig {
        cache_dir: Some(root.to_path_buf()),
        ..ResourceConfig::default()
    };
    let resolver =
        Arc::new(ResourceResolver::new(&config, Arc::new(StaticTheme::default())).unwrap());
    let identity = IdentityConfig {
        default_app_id: Some(APP_ID.to_string()),
        store_path: None,
    };
    Toaster::new(platform.clone(), resolver, &identity)
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

fn progress_toast() -> Toast {
    Toast::new()
        .with(Text::new("Hello"))
        .with(Progress::new("{p}").with_status("Loading"))
        .with_tag("download")
        .with_group("files")
}

#[tokio::test]
async fn test_bindings_reach_platform_and_update_same_toast() {
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let pending = toaster
        .submit(&progress_toast(), Bindings::new().with("p", "0.5"))
        .await
        .unwrap();
    let handle = pending.handle().clone();
    assert_eq!(handle.app_id, APP_ID);
    assert_eq!(handle.tag.as_deref(), Some("download"));
    assert_eq!(handle.group.as_deref(), Some("files"));

    // 文档保留占位符，数值只存在于绑定数据中
    let submission = platform.last_submission().unwrap();
    assert!(submission.document.contains("value=\"{p}\""));
    assert_eq!(
        platform.effective_data(&handle.id).unwrap().get("p"),
        Some("0.5")
    );

    let status = toaster
        .update(&handle, &Bindings::new().with("p", "0.8"))
        .unwrap();
    assert_eq!(status, UpdateStatus::Succeeded);
    assert_eq!(
        platform.effective_data(&handle.id).unwrap().get("p"),
        Some("0.8")
    );
    assert_eq!(platform.submissions().len(), 1);

    assert!(platform.dismiss(&handle.id, DismissReason::UserCanceled));
    let outcome = pending.outcome().await;
    assert_eq!(
        outcome,
        Outcome::Dismissed {
            reason: DismissReason::UserCanceled,
            data: Bindings::new().with("p", "0.8"),
        }
    );

    // 通知已关闭，之后的更新找不到目标
    let status = toaster
        .update(&handle, &Bindings::new().with("p", "1"))
        .unwrap();
    assert_eq!(status, UpdateStatus::NotFound);
    assert!(matches!(
        toaster.update_strict(&handle, &Bindings::new().with("p", "1")),
        Err(ToastError::NotShown)
    ));
}

#[tokio::test]
async fn test_activation_carries_inputs() {
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let toast = Toast::new()
        .with(Text::new("New message"))
        .with(Input::new("reply").with_placeholder("Type a reply"))
        .with(Button::new("Send", "action=send").with_input("reply"));
    let pending = toaster.submit(&toast, Bindings::new()).await.unwrap();
    let id = pending.handle().id;

    assert!(platform.activate(&id, "action=send", &[("reply", "on my way")]));
    // 终态只生效一次
    assert!(!platform.dismiss(&id, DismissReason::UserCanceled));

    match pending.outcome().await {
        Outcome::Activated {
            arguments, inputs, ..
        } => {
            assert_eq!(arguments, "action=send");
            assert_eq!(inputs.get("reply").map(String::as_str), Some("on my way"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(platform.active_listeners(), 0);
}

#[tokio::test]
async fn test_remote_image_is_local_until_outcome() {
    let addr = spawn_server().await;
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let uri = format!("http://{}/image.png", addr);
    let toast = Toast::new()
        .with(Text::new("Picture"))
        .with(Image::new(uri.clone()));
    let pending = toaster.submit(&toast, Bindings::new()).await.unwrap();

    let dir = pending.resource_dir().to_path_buf();
    let files: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(std::fs::read(&files[0]).unwrap(), PNG_BYTES);

    let document = platform.last_submission().unwrap().document;
    assert!(!document.contains(&uri));
    assert!(document.contains("src=\"file:///"));

    assert!(platform.dismiss(&pending.handle().id, DismissReason::TimedOut));
    pending.outcome().await;
    assert!(!dir.exists());
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_timeout_hides_and_cleans_up() {
    let addr = spawn_server().await;
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let toast = progress_toast().with(Image::new(format!("http://{}/image.png", addr)));
    let outcome = toaster
        .show_with_timeout(
            &toast,
            Bindings::new().with("p", "0.25"),
            Duration::from_millis(50),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Dismissed {
            reason: DismissReason::TimedOut,
            data: Bindings::new().with("p", "0.25"),
        }
    );
    assert_eq!(platform.live_count(), 0);
    assert_eq!(platform.active_listeners(), 0);
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_dropping_pending_toast_releases_everything() {
    let addr = spawn_server().await;
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let toast = Toast::new()
        .with(Text::new("Cancelled"))
        .with(Image::new(format!("http://{}/image.png", addr)));
    let pending = toaster.submit(&toast, Bindings::new()).await.unwrap();
    assert_eq!(platform.active_listeners(), 1);
    assert!(!is_empty_dir(root.path()));

    // 调用方放弃等待
    let waiting = tokio::time::timeout(Duration::from_millis(20), pending.outcome()).await;
    assert!(waiting.is_err());

    assert_eq!(platform.active_listeners(), 0);
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_hide_and_history_removal_resolve_as_hidden() {
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let pending = toaster
        .submit(&progress_toast(), Bindings::new().with("p", "0.1"))
        .await
        .unwrap();
    toaster.hide(pending.handle()).unwrap();
    assert_eq!(
        pending.outcome().await,
        Outcome::Dismissed {
            reason: DismissReason::ApplicationHidden,
            data: Bindings::new().with("p", "0.1"),
        }
    );

    let pending = toaster
        .submit(&progress_toast(), Bindings::new())
        .await
        .unwrap();
    let history = toaster.history(None);
    assert_eq!(history.app_id(), APP_ID);
    history.remove(pending.handle()).unwrap();
    assert_eq!(platform.live_count(), 0);
    assert!(pending.outcome().await.is_dismissed());
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_history_group_and_clear() {
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let grouped = toaster
        .submit(&progress_toast(), Bindings::new())
        .await
        .unwrap();
    let loose = toaster
        .submit(&Toast::new().with(Text::new("Loose")), Bindings::new())
        .await
        .unwrap();
    assert_eq!(platform.live_count(), 2);

    toaster.history(None).remove_group("files").unwrap();
    assert_eq!(platform.live_count(), 1);
    assert!(grouped.outcome().await.is_dismissed());

    let tagged = toaster
        .submit(&progress_toast(), Bindings::new())
        .await
        .unwrap();
    assert_eq!(platform.live_count(), 2);
    toaster.history(None).remove_tag("download", None).unwrap();
    toaster.history(None).remove_tag("download", Some("other")).unwrap();
    assert_eq!(platform.live_count(), 2);
    toaster
        .history(None)
        .remove_tag("download", Some("files"))
        .unwrap();
    assert_eq!(platform.live_count(), 1);
    assert!(tagged.outcome().await.is_dismissed());

    toaster.history(Some("Other.App")).clear().unwrap();
    assert_eq!(platform.live_count(), 1);
    toaster.history(None).clear().unwrap();
    assert_eq!(platform.live_count(), 0);
    assert!(loose.outcome().await.is_dismissed());

    let untagged = toaster
        .submit(&Toast::new().with(Text::new("No tag")), Bindings::new())
        .await
        .unwrap();
    assert!(matches!(
        toaster.history(None).remove(untagged.handle()),
        Err(ToastError::Validation(_))
    ));
}

#[tokio::test]
async fn test_platform_failure_is_an_outcome() {
    let platform = Arc::new(MockPlatform::new());
    platform.fail_with(PLATFORM_FAILURE);
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let outcome = toaster
        .show(&Toast::new().with(Text::new("Broken")), Bindings::new())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Failed {
            code: PLATFORM_FAILURE
        }
    );
    assert_eq!(platform.active_listeners(), 0);
}

#[tokio::test]
async fn test_unavailable_and_rejected_platforms() {
    let root = tempfile::tempdir().unwrap();

    let offline = Arc::new(MockPlatform::unavailable());
    let toaster = setup(&offline, root.path());
    let toast = Toast::new().with(Text::new("Hello"));
    assert!(matches!(
        toaster.submit(&toast, Bindings::new()).await,
        Err(ToastError::Unavailable(_))
    ));
    assert!(offline.submissions().is_empty());
    assert!(toaster.is_enabled(None).is_err());

    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_rejected_document_is_a_failed_outcome() {
    let addr = spawn_server().await;
    let platform = Arc::new(MockPlatform::new());
    platform.reject_submissions();
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let toast = Toast::new()
        .with(Text::new("Hello"))
        .with(Image::new(format!("http://{}/image.png", addr)));
    let pending = toaster.submit(&toast, Bindings::new()).await.unwrap();
    let dir = pending.resource_dir().to_path_buf();
    assert!(dir.exists());

    assert_eq!(pending.outcome().await, Outcome::Failed { code: -1 });
    assert!(!dir.exists());
    assert!(is_empty_dir(root.path()));
    assert!(platform.submissions().is_empty());
    assert_eq!(platform.active_listeners(), 0);

    let outcome = toaster.show(&toast, Bindings::new()).await.unwrap();
    assert_eq!(outcome, Outcome::Failed { code: -1 });
}

#[tokio::test]
async fn test_invalid_toasts_are_never_submitted() {
    let addr = spawn_server().await;
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let out_of_range = Toast::new().with(Progress::new("2"));
    assert!(matches!(
        toaster.submit(&out_of_range, Bindings::new()).await,
        Err(ToastError::Validation(_))
    ));

    let missing = Toast::new()
        .with(Text::new("Missing"))
        .with(Image::new(format!("http://{}/image.png", addr)))
        .with(Image::new(format!("http://{}/missing.png", addr)));
    let result = toaster.submit(&missing, Bindings::new()).await;
    assert!(matches!(
        result,
        Err(ToastError::Resource(ResourceError::Status { status: 404, .. }))
    ));

    assert!(platform.submissions().is_empty());
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_text_with_braces_is_shown_verbatim() {
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let toast = Toast::new()
        .with(Text::new("See you soon :}"))
        .with(Text::new("{draft saved"));
    let pending = toaster.submit(&toast, Bindings::new()).await.unwrap();

    let submissions = platform.submissions();
    assert_eq!(submissions.len(), 1);
    assert!(submissions[0].document.contains("<text>See you soon :}</text>"));
    assert!(submissions[0].document.contains("<text>{draft saved</text>"));
    drop(pending);
}

#[tokio::test]
async fn test_update_requires_tag() {
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let pending = toaster
        .submit(&Toast::new().with(Text::new("{title}")), Bindings::new())
        .await
        .unwrap();
    assert!(matches!(
        toaster.update(pending.handle(), &Bindings::new().with("title", "x")),
        Err(ToastError::Validation(_))
    ));
}

#[tokio::test]
async fn test_custom_sound_is_handed_to_platform() {
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    let toast = Toast::new()
        .with(Text::new("Ding"))
        .with_sound(Some(Sound::Custom(
            "data:audio/wav;base64,UklGRiQAAABXQVZF".to_string(),
        )))
        .looping();
    let pending = toaster.submit(&toast, Bindings::new()).await.unwrap();
    let submission = platform.last_submission().unwrap();
    let sound = submission.sound.unwrap();
    assert!(sound.starts_with(pending.resource_dir()));
    assert_eq!(&std::fs::read(&sound).unwrap()[..4], b"RIFF");
    assert!(submission.sound_loop);
    assert!(submission.document.contains("silent=\"true\""));

    let muted = toaster
        .submit_with(&toast, Bindings::new(), SubmitOptions { mute_sound: true })
        .await
        .unwrap();
    assert!(platform.last_submission().unwrap().sound.is_none());
    drop(muted);
    drop(pending);
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_settings_queries() {
    let platform = Arc::new(MockPlatform::new());
    let root = tempfile::tempdir().unwrap();
    let toaster = setup(&platform, root.path());

    assert_eq!(toaster.default_app_id(), APP_ID);
    assert!(toaster.is_enabled(None).unwrap());
    assert!(toaster.is_enabled(Some("Other.App")).unwrap());
    assert_eq!(
        toaster.notification_mode().unwrap(),
        NotificationMode::Unrestricted
    );

    let explicit = toaster
        .submit(
            &Toast::new().with(Text::new("Hi")).with_app_id("Other.App"),
            Bindings::new(),
        )
        .await
        .unwrap();
    assert_eq!(explicit.handle().app_id, "Other.App");
}
