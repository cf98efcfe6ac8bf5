//! # DAMOS Translator Library
//!
//! 用于翻译DAMOS标定文件中的参数描述文本的工具库，
//! 翻译过程中严格保持文件的其余字节不变。
//!
//! ## 模块组织
//!
//! - `core` - 核心流水线（解析 → 翻译 → 重建）
//! - `parser` - DAMOS记录解析器和编码检测
//! - `reconstructor` - 基于span的替换和结构校验
//! - `report` - 翻译报告生成
//! - `translation` - 翻译调度器（后端、缓存、语言检测）

pub mod core;
pub mod parser;
pub mod reconstructor;
pub mod report;
pub mod translation;

// Re-export commonly used items for convenience
pub use crate::core::*;
pub use parser::{FileStructureSnapshot, ParseMode, ParsedDamos, ParserError, Record, Span};
pub use reconstructor::{ReconstructionReport, ValidationSummary};
