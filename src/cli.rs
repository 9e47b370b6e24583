// src/cli.rs

use crate::config::ConfigKey;
use clap::{Parser, Subcommand, ValueEnum, crate_name, crate_version};
use std::path::PathBuf;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = crate_name!(),
    version = crate_version!(),
    about = "将 Canvas 课程模块中的文件同步到本地目录",
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// 指定配置文件路径
    #[arg(long, value_name = "PATH", global = true, help_heading = "General")]
    pub config: Option<PathBuf>,
    /// 提供 API Key，优先级高于环境变量和配置文件
    #[arg(long, value_name = "KEY", global = true, help_heading = "General")]
    pub api_key: Option<String>,
    /// 同时把调试日志输出到终端
    #[arg(short = 'l', long, action = clap::ArgAction::SetTrue, global = true, help_heading = "General")]
    pub logs: bool,
    /// (隐藏参数) 设置日志文件的输出级别，用于调试
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true, hide = true)]
    pub log_level: LogLevel,
}

impl Cli {
    /// 未指定子命令时执行同步
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Sync { force: false })
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 同步已配置课程中的文件 (默认)
    Sync {
        /// 强制重新下载已存在的文件
        #[arg(short, long, action = clap::ArgAction::SetTrue)]
        force: bool,
    },
    /// 只扫描并列出将要同步的内容，不下载
    Scan,
    /// 列出账号可见的全部课程
    Courses,
    /// 查看或修改配置 (不带参数时进入交互式设置)
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SettingsAction {
    /// 显示当前配置
    Show,
    /// 修改单个配置项
    Set {
        #[arg(value_enum)]
        key: ConfigKey,
        value: String,
    },
    /// 从账号可见的课程中选择要同步的课程
    Courses,
    /// 显示如何获取 API Key 的指南
    ApiKeyHelp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_sync() {
        let cli = Cli::try_parse_from(["cansync"]).unwrap();
        assert_eq!(cli.resolved_command(), Command::Sync { force: false });
        assert_eq!(cli.log_level, LogLevel::Info);
    }

    #[test]
    fn test_parse_settings_set() {
        let cli = Cli::try_parse_from([
            "cansync",
            "--config",
            "/tmp/c.json",
            "settings",
            "set",
            "course-ids",
            "1,2",
        ])
        .unwrap();
        assert_eq!(
            cli.resolved_command(),
            Command::Settings {
                action: Some(SettingsAction::Set {
                    key: ConfigKey::CourseIds,
                    value: "1,2".into()
                })
            }
        );
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cansync", "sync", "-f", "-l"]).unwrap();
        assert_eq!(cli.resolved_command(), Command::Sync { force: true });
        assert!(cli.logs);
    }
}
