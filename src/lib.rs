// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod models;
pub mod remote;
pub mod scanner;
pub mod symbols;
pub mod ui;
pub mod utils;
pub mod workflows;

use crate::{
    cli::{Cli, Command, SettingsAction},
    config::{ConfigStore, resolve_api_key},
    error::AppResult,
};
use log::{debug, info};
use std::sync::{Arc, atomic::AtomicBool};

/// 库的公共入口点，由 `main.rs` 调用
pub async fn run_from_cli(args: Arc<Cli>, cancellation_token: Arc<AtomicBool>) -> AppResult<()> {
    debug!("CLI 参数: {:?}", args.resolved_command());

    let (api_key, source) = resolve_api_key(args.api_key.as_deref());
    if api_key.is_some() {
        info!("从 {} 加载 API Key", source);
    }
    let store = match &args.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_location()?,
    }
    .with_api_key_override(api_key);
    store.ensure_exists()?;
    debug!("使用配置文件 {}", store.path().display());

    match args.resolved_command() {
        Command::Sync { force } => workflows::sync(store, force, cancellation_token).await,
        Command::Scan => workflows::scan(store, cancellation_token).await,
        Command::Courses => workflows::courses(store).await,
        Command::Settings { action } => match action {
            None => workflows::settings_interactive(&store),
            Some(SettingsAction::Show) => workflows::settings_show(&store),
            Some(SettingsAction::Set { key, value }) => workflows::settings_set(&store, key, &value),
            Some(SettingsAction::Courses) => workflows::settings_courses(store).await,
            Some(SettingsAction::ApiKeyHelp) => {
                workflows::api_key_help();
                Ok(())
            }
        },
    }
}
