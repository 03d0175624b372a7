// ==========================================
// Excel 导入系统 - 文件定位器
// ==========================================
// 职责: 文件引用 → 本地可读路径，并校验扩展名
// 查找顺序:
//   1. 引用以 private/files/ 或 files/ 开头 → <site>/<引用>
//      否则 → <site>/private/files/<文件名>
//   2. 上一步不存在 → <site>/public/files/<文件名>
// 无副作用
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// 支持的扩展名（比较时不区分大小写）
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

#[derive(Debug, Clone)]
pub struct FileResolver {
    site_root: PathBuf,
}

impl FileResolver {
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
        }
    }

    pub fn site_root(&self) -> &Path {
        &self.site_root
    }

    /// 解析文件引用
    ///
    /// # 返回
    /// - Ok(path): 存在且扩展名受支持的本地文件路径
    /// - Err(InvalidArgument): 引用为空或包含 `..`
    /// - Err(FileNotFound): 所有候选路径都不存在
    /// - Err(InvalidFormat): 扩展名不是 .xlsx/.xls
    pub fn resolve(&self, file_reference: &str) -> ImportResult<PathBuf> {
        let reference = file_reference.trim().trim_start_matches('/');
        if reference.is_empty() {
            return Err(ImportError::InvalidArgument(
                "file reference is required".to_string(),
            ));
        }

        let relative = Path::new(reference);
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ImportError::InvalidArgument(format!(
                "file reference must not leave the site directory: {}",
                file_reference
            )));
        }

        let file_name = relative
            .file_name()
            .ok_or_else(|| ImportError::InvalidArgument(file_reference.to_string()))?;

        let primary = if reference.starts_with("private/files/") || reference.starts_with("files/")
        {
            self.site_root.join(relative)
        } else {
            self.site_root.join("private").join("files").join(file_name)
        };
        let fallback = self.site_root.join("public").join("files").join(file_name);

        let path = [primary, fallback]
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ImportError::FileNotFound(file_reference.to_string()))?;

        check_extension(&path)?;

        debug!(reference = %file_reference, path = %path.display(), "文件引用已解析");
        Ok(path)
    }
}

/// 校验扩展名
pub fn check_extension(path: &Path) -> ImportResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ImportError::InvalidFormat(path.display().to_string()))
    }
}
