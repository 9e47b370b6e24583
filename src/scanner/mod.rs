// src/scanner/mod.rs

mod course;
mod matcher;
mod module;
mod page;

pub use course::CourseScan;
pub use matcher::{ResourceKind, ResourceMatcher};
pub use module::{ModuleItemType, ModuleScan};
pub use page::PageScan;

/// 遍历树上的一个节点
pub trait Scanner {
    /// 用于显示和目录命名的名称
    fn name(&self) -> &str;
    fn id(&self) -> u64;
}
