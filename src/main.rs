// src/main.rs

use cansync::{
    cli::{Cli, LogLevel},
    constants,
    error::AppError,
    run_from_cli, symbols,
};
use clap::{CommandFactory, FromArgMatches};
use colored::*;
use fern::colors::{Color, ColoredLevelConfig};
use log::{error, info, warn};
use std::{
    env,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

fn setup_logging(level: LogLevel, echo_to_stderr: bool) {
    let app_name = clap::crate_name!();

    // 优先写入主目录下的配置目录，否则回退到临时目录
    let log_file_path = match dirs::home_dir() {
        Some(home) => home
            .join(constants::CONFIG_DIR_NAME)
            .join(constants::LOG_FILE_NAME),
        None => {
            eprintln!("警告: 无法获取用户主目录，日志将写入临时目录。");
            env::temp_dir().join(app_name).join(constants::LOG_FILE_NAME)
        }
    };
    if let Some(dir) = log_file_path.parent()
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("警告: 无法创建日志目录 {:?}: {}", dir, e);
    }

    let file_appender = match fern::log_file(&log_file_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!(
                "警告: 无法打开主日志文件 {:?} : {}。将尝试使用备用日志文件。",
                log_file_path, e
            );
            let fallback_path = env::temp_dir().join(format!(
                "{}-{}",
                app_name,
                constants::LOG_FALLBACK_FILE_NAME
            ));
            match fern::log_file(&fallback_path) {
                Ok(file) => file,
                Err(e) => {
                    eprintln!("警告: 无法创建备用日志文件 {:?}: {}。日志将不会被记录。", fallback_path, e);
                    return;
                }
            }
        }
    };

    let file_dispatch = fern::Dispatch::new()
        .level(level.into())
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{:<5}] [{}:{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                message
            ))
        })
        .chain(file_appender);

    let mut dispatch = fern::Dispatch::new().chain(file_dispatch);
    if echo_to_stderr {
        let colors = ColoredLevelConfig::new()
            .error(Color::Red)
            .warn(Color::Yellow)
            .info(Color::Cyan)
            .debug(Color::BrightBlack);
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Debug)
                .format(move |out, message, record| {
                    out.finish(format_args!(
                        "[{:<5}] {}",
                        colors.color(record.level()),
                        message
                    ))
                })
                .chain(std::io::stderr()),
        );
    }

    if let Err(e) = dispatch.apply() {
        eprintln!("警告: 日志系统初始化失败: {}", e);
    }
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    {
        colored::control::set_virtual_terminal(true).ok();
    }

    let after_help = format!(
        "示例:\n  # 首次使用，交互式填写网址、API Key、存储路径\n  {bin} settings\n\n  # 选择要同步的课程\n  {bin} settings courses\n\n  # 同步 (已存在的文件会跳过)\n  {bin}\n\n  # 强制重新下载并在终端显示调试日志\n  {bin} sync --force -l",
        bin = clap::crate_name!()
    );
    let cmd = Cli::command().after_help(after_help);
    let args = match Cli::from_arg_matches(&cmd.get_matches()) {
        Ok(args) => Arc::new(args),
        Err(e) => e.exit(),
    };
    setup_logging(args.log_level, args.logs);

    let cancellation_token = Arc::new(AtomicBool::new(false));
    let handler_token = cancellation_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("无法监听 Ctrl-C 信号: {}", e);
            return;
        }
        if handler_token.load(Ordering::Relaxed) {
            println!("\n第二次中断，强制退出... 未完成的临时文件会在下次同步时清理。");
            warn!("用户第二次按下 Ctrl+C，强制退出。");
            std::process::exit(130);
        }
        println!(
            "\n{} 正在停止... 请等待当前请求完成。再按一次 {} 可强制退出。",
            *symbols::WARN,
            *symbols::CTRL_C
        );
        warn!("用户通过 Ctrl+C 请求中断程序。");
        handler_token.store(true, Ordering::Relaxed);
    });

    if let Err(e) = run_from_cli(args, cancellation_token).await {
        match e {
            AppError::UserInterrupt => {
                warn!("程序被用户中断。");
                eprintln!("\n{} 已中断，已下载的文件会保留。", *symbols::WARN);
                std::process::exit(130);
            }
            AppError::TokenInvalid => {
                error!("程序因 API Key 无效而退出: {}", e);
                eprintln!("\n{} {}", *symbols::ERROR, e.to_string().red());
                eprintln!(
                    "{} 请运行 `{} settings api-key-help` 查看如何获取新的 API Key。",
                    *symbols::INFO,
                    clap::crate_name!()
                );
                std::process::exit(1);
            }
            _ => {
                error!("程序执行出错: {}", e);
                eprintln!("\n{} {}", *symbols::ERROR, format!("程序执行出错: {}", e).red());
                std::process::exit(1);
            }
        }
    }
    info!("程序正常退出。");
}
