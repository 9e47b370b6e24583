// src/workflows.rs

use crate::{
    config::{self, ConfigKey, ConfigStore},
    constants,
    downloader::SyncEngine,
    error::{AppError, AppResult},
    models::CourseInfo,
    remote::RemoteSession,
    scanner::Scanner,
    symbols, ui, utils,
};
use colored::*;
use itertools::Itertools;
use futures::{
    TryStreamExt,
    stream::{BoxStream, StreamExt},
};
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// 读取配置并连接，失败时给出可操作的提示
pub async fn connect(store: ConfigStore) -> AppResult<RemoteSession> {
    let mut session = RemoteSession::new(store)?;
    let spinner = ui::new_spinner("连接");
    spinner.set_message(session.config().base_url.clone());
    let connected = session.connect().await;
    spinner.finish_and_clear();
    if !connected {
        return Err(AppError::ConnectionFailed);
    }
    let identity = session.connection()?.identity();
    println!(
        "{} 已连接到 {} (用户: {})",
        *symbols::OK,
        session.name().cyan(),
        identity.name.as_deref().unwrap_or("未知")
    );
    Ok(session)
}

pub async fn sync(
    store: ConfigStore,
    force: bool,
    cancellation_token: Arc<AtomicBool>,
) -> AppResult<()> {
    let session = connect(store).await?;
    ui::print_header(&format!(
        "同步 {} 门课程到 {} (按 {} 可中断)",
        session.config().course_ids.len(),
        session.config().storage_path.display(),
        *symbols::CTRL_C
    ));
    if session.config().course_ids.is_empty() {
        println!(
            "{} 尚未选择任何课程，可运行 `{} settings courses` 选择。",
            *symbols::WARN,
            clap::crate_name!()
        );
        return Ok(());
    }

    let mut engine = SyncEngine::new(&session, cancellation_token)?
        .force(force)
        .with_progress(ui::new_spinner("同步"));
    let result = engine.run().await;
    let stats = engine.into_stats();
    stats.print_report();
    result.map(|count| debug!("本次新下载 {} 个文件", count))
}

/// 与同步相同的遍历，只打印不下载
pub async fn scan(store: ConfigStore, cancellation_token: Arc<AtomicBool>) -> AppResult<()> {
    let session = connect(store).await?;
    ui::print_header("扫描课程内容 (不下载)");
    let check = || -> AppResult<()> {
        if cancellation_token.load(Ordering::Relaxed) {
            return Err(AppError::UserInterrupt);
        }
        Ok(())
    };

    let mut courses = session.get_courses();
    while let Some(course) = next_or_skip(&mut courses, "课程").await? {
        check()?;
        println!(
            "\n{} {} {}",
            *symbols::INFO,
            course.name().bold(),
            format!("({})", course.code().unwrap_or("-")).dimmed()
        );
        let mut modules = course.get_modules();
        while let Some(module) = next_or_skip(&mut modules, course.name()).await? {
            check()?;
            println!("  {} {}", "▸".cyan(), module.name());

            let mut attachments = module.get_attachments();
            while let Some(file) = next_or_skip(&mut attachments, module.name()).await? {
                println!("      {} {}", "附件".green(), file.filename);
            }
            let mut quizzes = module.get_quizzes();
            while let Some(quiz) = next_or_skip(&mut quizzes, module.name()).await? {
                println!("      {} {}", "测验".yellow(), quiz.title);
            }
            let mut pages = module.get_pages();
            while let Some(page) = next_or_skip(&mut pages, module.name()).await? {
                check()?;
                let marker = if page.is_empty() { " (空)".dimmed() } else { "".normal() };
                println!("      {} {}{}", "页面".cyan(), page.name(), marker);
                let mut files = page.get_files();
                while let Some(file) = next_or_skip(&mut files, page.name()).await? {
                    println!("          {} {}", "文件".green(), file.filename);
                }
                let mut quizzes = page.get_quizzes();
                while let Some(quiz) = next_or_skip(&mut quizzes, page.name()).await? {
                    println!("          {} {}", "测验".yellow(), quiz.title);
                }
            }
        }
    }
    Ok(())
}

async fn next_or_skip<T>(
    stream: &mut BoxStream<'_, AppResult<T>>,
    context: &str,
) -> AppResult<Option<T>> {
    loop {
        match stream.next().await {
            None => return Ok(None),
            Some(Ok(node)) => return Ok(Some(node)),
            Some(Err(e)) if e.is_missing_resource() => {
                warn!("'{}' 中的资源无法获取，跳过: {}", context, e);
                println!("      {} {}", *symbols::WARN, e.to_string().yellow());
            }
            Some(Err(e)) => return Err(e),
        }
    }
}

async fn fetch_courses_info(session: &RemoteSession) -> AppResult<Vec<CourseInfo>> {
    session.get_courses_info().try_collect().await
}

pub async fn courses(store: ConfigStore) -> AppResult<()> {
    let session = connect(store).await?;
    let courses = fetch_courses_info(&session).await?;
    ui::print_header(&format!("账号可见的课程 ({} 门)", courses.len()));
    if courses.is_empty() {
        println!("{} 没有可见的课程。", *symbols::INFO);
        return Ok(());
    }
    let configured = &session.config().course_ids;
    let names: Vec<String> = courses
        .iter()
        .map(|c| utils::short_name(&c.name, constants::COURSE_NAME_WIDTH).trim_end().to_string())
        .collect();
    for (course, name) in courses.iter().zip(utils::same_length(&names)) {
        let marker = if configured.contains(&course.id) {
            symbols::ENABLED.clone()
        } else {
            "   ".normal()
        };
        println!("  {} {}  {}", marker, name, course.id.to_string().dimmed());
    }
    println!(
        "\n{} 标记 {} 的课程会被同步，可运行 `{} settings courses` 修改。",
        *symbols::INFO,
        *symbols::ENABLED,
        clap::crate_name!()
    );
    Ok(())
}

fn display_value(key: ConfigKey, value: Option<&Value>) -> String {
    match (key, value) {
        (_, None) => "(未设置)".to_string(),
        (ConfigKey::ApiKey, Some(Value::String(s))) => mask_api_key(s),
        (ConfigKey::CourseIds, Some(Value::Array(ids))) => {
            if ids.is_empty() { "(无)".to_string() } else { ids.iter().join(", ") }
        }
        (_, Some(Value::String(s))) => s.clone(),
        (_, Some(other)) => other.to_string(),
    }
}

fn mask_api_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

pub fn settings_show(store: &ConfigStore) -> AppResult<()> {
    let raw = store.load_raw()?;
    ui::print_header(&format!("当前配置 ({})", store.path().display()));
    let labels: Vec<&str> = ConfigKey::ALL.iter().map(|k| k.label()).collect();
    for (key, label) in ConfigKey::ALL.iter().zip(utils::same_length(&labels)) {
        let value = raw.get(key.as_str());
        let ok = value.is_some_and(|v| config::valid_key(*key, v));
        let symbol = if ok { &*symbols::OK } else { &*symbols::ERROR };
        println!("  {} {}  {}", symbol, label.bold(), display_value(*key, value));
    }
    if !config::valid(&raw) {
        println!(
            "\n{} 配置尚不完整，可运行 `{} settings` 进行交互式设置。",
            *symbols::WARN,
            clap::crate_name!()
        );
    }
    Ok(())
}

/// 规范化并校验后写入单个配置项
pub fn settings_set(store: &ConfigStore, key: ConfigKey, input: &str) -> AppResult<()> {
    let value = key.parse_input(input)?;
    if !config::valid_key(key, &value) {
        return Err(AppError::UserInputError(format!(
            "'{}' 不是有效的 {}",
            input.trim(),
            key.label()
        )));
    }
    store.overwrite(key, value)?;
    println!("{} 已更新 {}", *symbols::OK, key.label());
    Ok(())
}

pub fn api_key_help() {
    ui::box_message(
        "获取 Canvas API Key 指南",
        constants::HELP_API_KEY_GUIDE
            .lines()
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .as_slice(),
        |s| s.cyan(),
    );
    println!(
        "\n{} 安全提醒: 请妥善保管你的 API Key，不要分享给他人。",
        *symbols::INFO
    );
}

/// 从可见课程中选择需要同步的课程
pub async fn settings_courses(store: ConfigStore) -> AppResult<()> {
    let writer = store.clone();
    let session = connect(store).await?;
    let courses = fetch_courses_info(&session).await?;
    if courses.is_empty() {
        println!("{} 没有可见的课程。", *symbols::INFO);
        return Ok(());
    }
    let configured = &session.config().course_ids;
    let options: Vec<String> = courses
        .iter()
        .map(|c| {
            let mark = if configured.contains(&c.id) { "*" } else { " " };
            format!(
                "{} {} ({})",
                mark,
                utils::short_name(&c.name, constants::COURSE_NAME_WIDTH).trim_end(),
                c.id
            )
        })
        .collect();
    let defaults: Vec<String> = courses
        .iter()
        .enumerate()
        .filter(|(_, c)| configured.contains(&c.id))
        .map(|(i, _)| (i + 1).to_string())
        .collect();
    let default_choice = if defaults.is_empty() { "all".to_string() } else { defaults.join(",") };

    let chosen = ui::get_user_choices_from_menu(&options, "选择要同步的课程 (* 为当前已选)", &default_choice);
    if chosen.is_empty() {
        println!("{} 未选择任何课程，配置保持不变。", *symbols::INFO);
        return Ok(());
    }
    let ids: Vec<Value> = chosen.iter().map(|&i| Value::from(courses[i].id)).collect();
    info!("选择了 {} 门课程", ids.len());
    writer.overwrite(ConfigKey::CourseIds, Value::Array(ids))?;
    println!("{} 已选择 {} 门课程。", *symbols::OK, chosen.len());
    Ok(())
}

/// 逐项修改配置，直接回车退出
pub fn settings_interactive(store: &ConfigStore) -> AppResult<()> {
    loop {
        settings_show(store)?;
        let options: Vec<String> = ConfigKey::ALL.iter().map(|k| k.label().to_string()).collect();
        let choice = ui::selection_menu(&options, "修改配置", "输入序号修改对应配置项 (直接回车退出)", "");
        if choice.is_empty() {
            return Ok(());
        }
        let Some(key) = choice
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| ConfigKey::ALL.get(i).copied())
        else {
            println!("{} 无效的选择 '{}'。", *symbols::ERROR, choice);
            continue;
        };

        let input = match key {
            ConfigKey::ApiKey => {
                println!("{}", constants::HELP_API_KEY_GUIDE.dimmed());
                ui::prompt_hidden(key.label())
            }
            ConfigKey::CourseIds => ui::prompt(&format!("{} (以逗号分隔)", key.label()), None),
            _ => ui::prompt(key.label(), None),
        }
        .map_err(|_| AppError::UserInterrupt)?;

        if input.trim().is_empty()
            && (key != ConfigKey::CourseIds || !ui::confirm("清空已选课程？", false))
        {
            println!("{} 未输入内容，保持不变。", *symbols::INFO);
            continue;
        }
        if let Err(e) = settings_set(store, key, &input) {
            println!("{} {}", *symbols::ERROR, e.to_string().red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key() {
        let key = format!("1234~{}", "a".repeat(60) + "wxyz");
        assert_eq!(mask_api_key(&key), "1234~****wxyz");
        assert_eq!(mask_api_key("short"), "*****");
        assert_eq!(mask_api_key(""), "");
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(ConfigKey::CourseIds, Some(&serde_json::json!([1, 2]))), "1, 2");
        assert_eq!(display_value(ConfigKey::CourseIds, Some(&serde_json::json!([]))), "(无)");
        assert_eq!(display_value(ConfigKey::Url, None), "(未设置)");
        assert_eq!(
            display_value(ConfigKey::Url, Some(&serde_json::json!("https://x.test"))),
            "https://x.test"
        );
    }

    #[test]
    fn test_settings_set_validates() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(tmp.path().join("config.json"));
        store.ensure_exists().unwrap();

        settings_set(&store, ConfigKey::Url, "canvas.example.edu/").unwrap();
        settings_set(&store, ConfigKey::CourseIds, "12, 34").unwrap();
        let raw = store.load_raw().unwrap();
        assert_eq!(raw["url"], "https://canvas.example.edu");
        assert_eq!(raw["course_ids"], serde_json::json!([12, 34]));

        assert!(matches!(
            settings_set(&store, ConfigKey::ApiKey, "nope"),
            Err(AppError::UserInputError(_))
        ));
        assert!(matches!(
            settings_set(&store, ConfigKey::CourseIds, "1,x"),
            Err(AppError::UserInputError(_))
        ));
    }
}
