//! Language provider contract: starter templates and file naming.

pub trait TemplateProvider: Send + Sync {
    /// Starter text for `(language, version)`, `None` when unknown.
    fn starter(&self, language: &str, version: &str) -> Option<String>;

    /// File extension including the dot, empty when the language has none.
    fn extension(&self, language: &str) -> &str;

    /// Base name for new files, e.g. `Main` for Java.
    fn default_stem(&self, language: &str) -> &str;

    fn default_file_name(&self, language: &str) -> String {
        format!("{}{}", self.default_stem(language), self.extension(language))
    }
}
