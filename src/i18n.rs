// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库，支持英文（默认）和中文
// 导入任务在后台执行，语言由调用方显式传入，不依赖全局 locale
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 默认语言
pub const DEFAULT_LOCALE: &str = "en";

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "zh-CN"];

/// 是否为支持的语言
pub fn is_supported(locale: &str) -> bool {
    SUPPORTED_LOCALES.contains(&locale)
}

/// 翻译消息（指定语言，带参数）
///
/// 未知语言回退到英文；参数按 `%{name}` 占位符替换
///
/// # 示例
/// ```no_run
/// use excel_import::i18n::translate;
/// let msg = translate("en", "import.processing_row", &[("current", "10"), ("total", "20")]);
/// ```
pub fn translate(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key, locale = locale).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_simple() {
        assert_eq!(translate("en", "import.no_data", &[]), "No data found in Excel file");
        assert_eq!(translate("zh-CN", "import.no_data", &[]), "Excel 文件中没有数据");
    }

    #[test]
    fn test_translate_with_args() {
        let msg = translate("en", "import.processing_row", &[("current", "10"), ("total", "25")]);
        assert_eq!(msg, "Processing row 10 of 25");

        let msg = translate("zh-CN", "import.failed", &[("error", "boom")]);
        assert!(msg.contains("boom"));
        assert!(msg.contains("导入失败"));
    }

    #[test]
    fn test_unknown_locale_falls_back_to_english() {
        assert!(!is_supported("fr"));
        assert_eq!(translate("fr", "import.started", &[]), "Import started successfully");
    }
}
