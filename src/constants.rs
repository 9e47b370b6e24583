// src/constants.rs

pub const UI_WIDTH: usize = 88;
pub const COURSE_NAME_WIDTH: usize = 60;
pub const MAX_FILENAME_BYTES: usize = 200;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = "cansync.log";
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";
pub const API_KEY_ENV: &str = "CANVAS_API_KEY";
pub const USER_AGENT: &str = concat!(clap::crate_name!(), "/", clap::crate_version!());
pub const PER_PAGE: u32 = 100;
pub const TEMP_FILE_PREFIX: &str = ".cansync-";
pub const TEMP_FILE_SUFFIX: &str = ".part";

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// 默认下载目录，相对于用户主目录
pub const DEFAULT_STORAGE_DIR: [&str; 2] = ["Documents", "Cansync"];

pub const HELP_API_KEY_GUIDE: &str = r#"
1. 登录你所在学校的 Canvas 网站。
2. 点击左侧导航栏的 "Account" -> "Settings"。
3. 找到 "Approved Integrations"，点击 "+ New Access Token"。
4. 填写用途 (例如 cansync) 后生成，复制显示的 Token。
   (Token 形如 1234~xxxxxxxx...，只会显示一次)
5. 运行 `cansync settings set api-key <TOKEN>` 保存。"#;

pub mod api {
    pub const CURRENT_USER: &str = "api/v1/users/self";
    pub const COURSES: &str = "api/v1/courses";
    pub const FILES: &str = "api/v1/files";

    pub mod item_types {
        pub const HEADER: &str = "SubHeader";
        pub const PAGE: &str = "Page";
        pub const QUIZ: &str = "Quiz";
        pub const EXTERNAL_TOOL: &str = "ExternalTool";
        pub const EXTERNAL_URL: &str = "ExternalUrl";
        pub const ATTACHMENT: &str = "File";
        pub const DISCUSSION: &str = "Discussion";
        pub const ASSIGNMENT: &str = "Assignment";
    }

    pub mod resource_kinds {
        pub const FILES: &str = "files";
        pub const QUIZZES: &str = "quizzes";
    }
}
