mod cli;
mod showcase;

use clap::Parser;
use cli::{Cli, Command};
use config::{Config, Environment, File};
use showcase::{Showcase, file_progress};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use toastbox_core::config::AppConfig;
use toastbox_core::identity::error::IdentityError;
use toastbox_core::identity::port::IdentityStore;
use toastbox_core::resource::error::ResourceError;
use toastbox_core::resource::port::{StaticTheme, ThemeProvider};
use toastbox_core::toast::binding::Bindings;
use toastbox_core::toast::entity::{DismissReason, Outcome, Toast, UpdateStatus};
use toastbox_core::toast::error::ToastError;
use toastbox_core::toast::port::ToastPlatform;
use toastbox_dispatch::{IdentityManager, RegisterRequest, SubmitOptions, Toaster};
use toastbox_resource::{ResolveOptions, ResourceResolver};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// # Summary
/// 加载配置。
///
/// # Logic
/// 1. 读取指定的配置文件；未指定时读取可选的 `toastbox.toml`。
/// 2. 叠加 `TOASTBOX__<SECTION>__<KEY>` 环境变量。
fn load_config(path: Option<&Path>) -> Result<AppConfig, config::ConfigError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name("toastbox").required(false),
    };
    Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("TOASTBOX")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

#[cfg(windows)]
fn platform() -> Result<(Arc<dyn ToastPlatform>, Arc<dyn ThemeProvider>), ToastError> {
    Ok((
        Arc::new(toastbox_winrt::WinRtPlatform::new()),
        Arc::new(toastbox_winrt::WinRtTheme),
    ))
}

#[cfg(not(windows))]
fn platform() -> Result<(Arc<dyn ToastPlatform>, Arc<dyn ThemeProvider>), ToastError> {
    Err(ToastError::Unavailable(
        "toast notifications require Windows 10 or later".to_string(),
    ))
}

async fn identity_store(config: &AppConfig) -> Result<Arc<dyn IdentityStore>, IdentityError> {
    if let Some(path) = &config.identity.store_path {
        return Ok(Arc::new(
            toastbox_store::sqlite::SqliteIdentityStore::open(path).await?,
        ));
    }
    #[cfg(windows)]
    let store: Arc<dyn IdentityStore> =
        Arc::new(toastbox_store::registry::RegistryIdentityStore::new());
    #[cfg(not(windows))]
    let store: Arc<dyn IdentityStore> = {
        warn!("No registry on this platform, identities are kept in memory");
        Arc::new(toastbox_store::mem::MemIdentityStore::new())
    };
    Ok(store)
}

/// # Summary
/// 把远程 / 内联 / 图标字体形式的身份图标落盘为持久文件。
///
/// # Logic
/// 1. 在临时会话中解析图标。
/// 2. 本地路径原样返回；生成的文件复制到缓存根目录下的 `identities/<id>.png`，
///    id 中的路径分隔符等字符替换为 `_`。
async fn persist_icon(
    resolver: &ResourceResolver,
    id: &str,
    uri: &str,
) -> Result<String, ToastError> {
    let session = resolver.session()?;
    let resolved = session.resolve(uri, &ResolveOptions::default()).await?;
    let Some(source) = resolved.path() else {
        return Ok(uri.to_string());
    };
    let dir = resolver.root().join("identities");
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(ResourceError::from)?;
    let name: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let target = dir.join(format!("{}.png", name));
    tokio::fs::copy(source, &target)
        .await
        .map_err(ResourceError::from)?;
    session.close();
    Ok(target.to_string_lossy().into_owned())
}

/// # Summary
/// 显示通知并等待结果。
///
/// # Logic
/// 1. 提交通知；`progress` 为真时后台按秒推进进度条绑定。
/// 2. 等待终态、超时或 Ctrl-C，三者先到者生效。
/// 3. Ctrl-C 时隐藏通知；等待中的句柄被丢弃，临时文件随之删除。
async fn show(
    toaster: &Arc<Toaster>,
    toast: &Toast,
    data: Bindings,
    options: SubmitOptions,
    timeout: Option<Duration>,
    progress: bool,
) -> Result<Outcome, ToastError> {
    let pending = toaster.submit_with(toast, data, options).await?;
    let handle = pending.handle().clone();

    let updates = progress.then(|| {
        let toaster = toaster.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            for done in 5..=9 {
                tokio::time::sleep(Duration::from_secs(1)).await;
                match toaster.update(&handle, &file_progress(done)) {
                    Ok(UpdateStatus::Succeeded) => {}
                    Ok(status) => {
                        info!("Stopped progress updates: {:?}", status);
                        break;
                    }
                    Err(e) => {
                        warn!("Progress update failed: {}", e);
                        break;
                    }
                }
            }
        })
    });

    let wait = async move {
        match timeout {
            Some(timeout) => pending.outcome_within(timeout).await,
            None => pending.outcome().await,
        }
    };
    let outcome = tokio::select! {
        outcome = wait => outcome,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Interrupted, hiding {}", handle);
            toaster.hide(&handle)?;
            Outcome::Dismissed {
                reason: DismissReason::ApplicationHidden,
                data: Bindings::new(),
            }
        }
    };
    if let Some(task) = updates {
        task.abort();
    }
    Ok(outcome)
}

/// # Summary
/// 命令行入口，负责装配配置、日志与各层实现。
///
/// # Logic
/// 1. 初始化日志（`RUST_LOG`，默认 info）。
/// 2. 加载配置，命令行参数覆盖默认身份。
/// 3. 身份命令只依赖身份存储；通知命令还需要平台与资源解析器。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(app_id) = &cli.app_id {
        config.identity.default_app_id = Some(app_id.clone());
        #[cfg(windows)]
        toastbox_winrt::set_process_app_id(app_id)?;
    }
    let timeout = cli.timeout.map(Duration::from_secs);

    match cli.command {
        Command::Register {
            id,
            name,
            icon,
            background,
            hidden,
        } => {
            let identities = IdentityManager::new(identity_store(&config).await?);
            let mut request = RegisterRequest::new(id.clone());
            request.display_name = name;
            request.icon_background = background;
            request.show_in_settings = !hidden;
            if let Some(icon) = icon {
                let resolver =
                    ResourceResolver::new(&config.resource, Arc::new(StaticTheme::default()))?;
                request.icon_uri = Some(persist_icon(&resolver, &id, &icon).await?);
            }
            let id = identities.register(request).await?;
            println!("Registered {}", id);
        }
        Command::Unregister { id } => {
            let identities = IdentityManager::new(identity_store(&config).await?);
            if identities.unregister(&id).await? {
                println!("Unregistered {}", id);
            } else {
                println!("{} was not registered", id);
            }
        }
        Command::List => {
            let identities = IdentityManager::new(identity_store(&config).await?);
            for identity in identities.list().await? {
                println!(
                    "{} | {} | {}",
                    identity.id,
                    identity.display_name,
                    identity.icon_uri.as_deref().unwrap_or("-")
                );
            }
        }
        command => {
            let (platform, theme) = platform()?;
            let resolver = Arc::new(ResourceResolver::new(&config.resource, theme)?);
            let toaster = Toaster::new(platform, resolver, &config.identity);
            let app_id = toaster.default_app_id().to_string();

            match command {
                Command::Show { showcase, mute } => {
                    let (toast, data) = showcase.build(&app_id);
                    let options = SubmitOptions { mute_sound: mute };
                    let progress = showcase == Showcase::File;
                    let outcome =
                        show(&toaster, &toast, data, options, timeout, progress).await?;
                    println!("{:?}", outcome);
                }
                Command::Json { path } => {
                    let text = tokio::fs::read_to_string(&path).await?;
                    let toast = Toast::from_json(&text)?;
                    let outcome = show(
                        &toaster,
                        &toast,
                        Bindings::new(),
                        SubmitOptions::default(),
                        timeout,
                        false,
                    )
                    .await?;
                    println!("{:?}", outcome);
                }
                Command::Status => {
                    println!("app id: {}", app_id);
                    println!("enabled: {}", toaster.is_enabled(None)?);
                    println!("mode: {:?}", toaster.notification_mode()?);
                }
                Command::Clear => {
                    toaster.history(None).clear()?;
                    println!("Cleared notifications of {}", app_id);
                }
                Command::Register { .. } | Command::Unregister { .. } | Command::List => {}
            }
        }
    }

    Ok(())
}
