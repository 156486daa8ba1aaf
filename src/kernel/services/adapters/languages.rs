//! 内置语言模板提供者

use crate::kernel::language::LanguageId;
use crate::kernel::services::ports::language::TemplateProvider;

/// Starter templates bundled with the crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinLanguages;

impl BuiltinLanguages {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateProvider for BuiltinLanguages {
    fn starter(&self, language: &str, version: &str) -> Option<String> {
        let lang = LanguageId::from_id(language)?;
        lang.version(version).map(|v| v.starter.to_string())
    }

    fn extension(&self, language: &str) -> &str {
        LanguageId::from_id(language)
            .unwrap_or(LanguageId::PlainText)
            .extension()
    }

    fn default_stem(&self, language: &str) -> &str {
        LanguageId::from_id(language)
            .unwrap_or(LanguageId::PlainText)
            .default_stem()
    }
}
