// src/utils.rs

use crate::{constants, error::*};
use anyhow::Context;
use log::{debug, warn};
use regex::Regex;
use std::{
    collections::BTreeSet,
    ffi::OsStr,
    fs,
    path::{Component, Path, PathBuf},
    sync::LazyLock,
};

static ILLEGAL_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
// 课程名末尾的 "(12345, 67890)" 之类的 ID 列表
static COURSE_ID_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \((\d,? ?)+\)$").unwrap());

pub fn sanitize_filename(name: &str) -> String {
    let original_name = name.trim();
    if original_name.is_empty() { return "unknown".to_string(); }

    let stem = Path::new(original_name)
        .file_stem()
        .unwrap_or_else(|| OsStr::new(original_name))
        .to_string_lossy()
        .to_uppercase();
    let windows_reserved = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
        "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];

    let mut name = if windows_reserved.contains(&stem.as_ref()) {
        format!("_{}", original_name)
    } else {
        original_name.to_string()
    };

    name = ILLEGAL_CHARS_RE.replace_all(&name, " ").into_owned();
    name = WHITESPACE_RE.replace_all(&name, " ").trim().to_string();
    name = name.trim_matches(|c: char| c == '.' || c.is_whitespace()).to_string();
    if name.is_empty() { return "unnamed".to_string(); }

    if name.len() > constants::MAX_FILENAME_BYTES {
        if let (Some(stem_part), Some(ext)) = (Path::new(&name).file_stem(), Path::new(&name).extension()) {
            let stem_part_str = stem_part.to_string_lossy();
            let ext_str = format!(".{}", ext.to_string_lossy());
            let max_stem_bytes = constants::MAX_FILENAME_BYTES.saturating_sub(ext_str.len());
            let truncated_stem = safe_truncate_utf8(&stem_part_str, max_stem_bytes);
            name = format!("{}{}", truncated_stem, ext_str);
        } else {
            name = safe_truncate_utf8(&name, constants::MAX_FILENAME_BYTES).to_string();
        }
    }
    name
}

fn safe_truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes { return s; }
    let mut i = max_bytes;
    while i > 0 && !s.is_char_boundary(i) { i -= 1; }
    &s[..i]
}

/// 把名字变成恰好 `max_length` 个字符：短的右侧补空格，长的截断并以 ".." 结尾。
pub fn short_name(name: &str, max_length: usize) -> String {
    let len = name.chars().count();
    if len <= max_length {
        format!("{:<width$}", name, width = max_length)
    } else if max_length < 2 {
        ".".repeat(max_length)
    } else {
        let head: String = name.chars().take(max_length - 2).collect();
        format!("{}..", head)
    }
}

/// 将所有字符串补齐到其中最长者的长度
pub fn same_length<S: AsRef<str>>(strings: &[S]) -> Vec<String> {
    let max_length = strings
        .iter()
        .map(|s| s.as_ref().chars().count())
        .max()
        .unwrap_or(0);
    strings
        .iter()
        .map(|s| short_name(s.as_ref(), max_length))
        .collect()
}

/// 去掉课程标题末尾附带的 ID 编号，例如 "Intro to X (12345, 67890)" -> "Intro to X"
pub fn better_course_name(name: &str) -> String {
    COURSE_ID_SUFFIX_RE.replace(name, "").into_owned()
}

pub fn create_dir(directory: &Path) -> AppResult<()> {
    debug!("创建目录 (如不存在): {}", directory.display());
    fs::create_dir_all(directory)
        .with_context(|| format!("创建目录 '{}' 失败", directory.display()))?;
    Ok(())
}

/// 检查当前用户能否使用该目录：已存在则必须可写，不存在则必须能创建。
pub fn verify_accessible_path(path: &Path) -> bool {
    if path.exists() {
        if !path.is_dir() {
            warn!("存储路径 '{}' 不是目录", path.display());
            return false;
        }
        return match tempfile::tempfile_in(path) {
            Ok(_) => true,
            Err(e) => {
                warn!("存储路径 '{}' 不可写: {}", path.display(), e);
                false
            }
        };
    }

    match fs::create_dir_all(path) {
        Ok(()) => true,
        Err(e) => {
            warn!("无法创建存储路径 '{}': {}", path.display(), e);
            false
        }
    }
}

/// 展开开头的 `~`
pub fn expand_home(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('~')
        && (rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\'))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest.trim_start_matches(['/', '\\']));
    }
    PathBuf::from(trimmed)
}

pub fn parse_selection_indices(selection_str: &str, total_items: usize) -> Vec<usize> {
    if selection_str.to_lowercase() == "all" { return (0..total_items).collect(); }
    let mut indices = BTreeSet::new();
    for part in selection_str.split(',').map(|s| s.trim()) {
        if part.is_empty() { continue; }
        if let Some(range_part) = part.split_once('-') {
            if let (Ok(start), Ok(end)) = (range_part.0.parse::<usize>(), range_part.1.parse::<usize>()) {
                if start == 0 || end == 0 { continue; }
                let (min, max) = (start.min(end), start.max(end));
                for i in min..=max {
                    if i > 0 && i <= total_items { indices.insert(i - 1); }
                }
            }
        } else if let Ok(num) = part.parse::<usize>() {
            if num > 0 && num <= total_items { indices.insert(num - 1); }
        }
    }
    indices.into_iter().collect()
}

pub fn secure_join_path(base_dir: &Path, relative_path: &Path) -> AppResult<PathBuf> {
    let resolved_base = dunce::canonicalize(base_dir).with_context(|| format!("基础目录 '{:?}' 不存在或无法访问", base_dir))?;
    let mut final_path = resolved_base.clone();
    for component in relative_path.components() {
        match component {
            Component::Normal(part) => final_path.push(part),
            Component::ParentDir => return Err(AppError::Security("检测到路径遍历 '..' ".to_string())),
            _ => continue,
        }
    }
    if !final_path.starts_with(&resolved_base) {
        return Err(AppError::Security(format!("路径遍历攻击检测: '{:?}'", relative_path)));
    }
    Ok(final_path)
}


/// 递归删除上次强制退出时残留的下载临时文件，返回删除的数量。目录不存在时什么都不做。
pub fn remove_partial_downloads(root: &Path) -> AppResult<usize> {
    if !root.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries =
            fs::read_dir(&dir).with_context(|| format!("读取目录 '{}' 失败", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(constants::TEMP_FILE_PREFIX)
                && name.ends_with(constants::TEMP_FILE_SUFFIX)
            {
                debug!("删除残留的临时文件: {}", path.display());
                fs::remove_file(&path)
                    .with_context(|| format!("删除临时文件 '{}' 失败", path.display()))?;
                removed += 1;
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        let long = "Very Super Long Course Name (Longer now!!!)";
        assert_eq!(short_name(long, 5), "Ver..");
        assert_eq!(short_name(long, long.len()), long);

        // 短名字补齐到指定长度
        assert_eq!(short_name("abc", 6), "abc   ");

        for n in 0..50 {
            assert_eq!(short_name(long, n).chars().count(), n);
        }
    }

    #[test]
    fn test_same_length() {
        let padded = same_length(&["Canvas URL", "API Token", "Storage Path"]);
        assert!(padded.iter().all(|s| s.len() == "Storage Path".len()));
        assert_eq!(padded[0], "Canvas URL  ");
        assert!(same_length::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_better_course_name() {
        assert_eq!(better_course_name("Brilliant Course (212381, 378182)"), "Brilliant Course");
        assert_eq!(
            better_course_name("Brilliant Course (By Bob and John) (918212, )"),
            "Brilliant Course (By Bob and John)"
        );
        // 只去掉末尾的纯数字括号
        assert_eq!(better_course_name("Course (12) Extra"), "Course (12) Extra");
        assert_eq!(better_course_name("Plain Course"), "Plain Course");
    }

    #[test]
    fn test_create_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test2").join("test3");
        create_dir(&path).unwrap();
        assert!(path.is_dir());
        // 重复创建不是错误
        create_dir(&path).unwrap();
    }

    #[test]
    fn test_verify_accessible_path() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(verify_accessible_path(tmp.path()));

        let nested = tmp.path().join("a").join("b");
        assert!(verify_accessible_path(&nested));
        assert!(nested.is_dir());

        let file = tmp.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();
        assert!(!verify_accessible_path(&file));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/tmp/x"), PathBuf::from("/tmp/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/Canvas"), home.join("Canvas"));
            assert_eq!(expand_home("~"), home);
        }
        // "~user" 不做展开
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
    }

    #[test]
    fn test_parse_selection_indices() {
        assert_eq!(parse_selection_indices("1,3,5", 5), vec![0, 2, 4]);
        assert_eq!(parse_selection_indices("2-4", 5), vec![1, 2, 3]);
        assert_eq!(parse_selection_indices("All", 3), vec![0, 1, 2]);
        assert_eq!(parse_selection_indices("5, 1-2, 1", 5), vec![0, 1, 4]);
        assert_eq!(parse_selection_indices("1,10,foo,-2", 5), vec![0]);
        assert_eq!(parse_selection_indices("", 5), Vec::<usize>::new());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a\\b/c:d*e?f\"g<h>i|j"), "a b c d e f g h i j".to_string());
        assert_eq!(sanitize_filename(" . my file. "), "my file".to_string());
        assert_eq!(sanitize_filename("CON.txt"), "_CON.txt".to_string());
        assert_eq!(sanitize_filename(""), "unknown".to_string());
        assert_eq!(sanitize_filename("<>|"), "unnamed".to_string());
        // 路径遍历片段被清理掉
        assert_eq!(sanitize_filename(".."), "unnamed".to_string());
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc passwd".to_string());

        let very_long_name = format!("{}.pdf", "讲义".repeat(100));
        let truncated = sanitize_filename(&very_long_name);
        assert!(truncated.len() <= constants::MAX_FILENAME_BYTES);
        assert!(truncated.ends_with(".pdf"));
    }

    #[test]
    fn test_secure_join_path_rejects_parent_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(secure_join_path(tmp.path(), Path::new("a/b")).is_ok());
        assert!(matches!(
            secure_join_path(tmp.path(), Path::new("a/../../b")),
            Err(AppError::Security(_))
        ));
    }

    #[test]
    fn test_remove_partial_downloads() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("Course").join("Week 1");
        fs::create_dir_all(&nested).unwrap();
        let stale = nested.join(format!(
            "{}abc123{}",
            constants::TEMP_FILE_PREFIX,
            constants::TEMP_FILE_SUFFIX
        ));
        fs::write(&stale, b"half").unwrap();
        fs::write(nested.join("slides.pdf"), b"done").unwrap();
        fs::write(nested.join("notes.part"), b"keep").unwrap();

        assert_eq!(remove_partial_downloads(tmp.path()).unwrap(), 1);
        assert!(!stale.exists());
        assert!(nested.join("slides.pdf").exists());
        assert!(nested.join("notes.part").exists());

        assert_eq!(remove_partial_downloads(&tmp.path().join("missing")).unwrap(), 0);
    }
}
