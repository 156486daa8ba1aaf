#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LanguageId {
    Java,
    Python,
    JavaScript,
    PlainText,
}

/// One selectable runtime version and its starter text.
#[derive(Debug, Clone, Copy)]
pub struct LanguageVersion {
    pub id: &'static str,
    pub starter: &'static str,
}

const JAVA_VERSIONS: &[LanguageVersion] = &[
    LanguageVersion {
        id: "17",
        starter: include_str!("../../languages/java/starters/java17.java"),
    },
    LanguageVersion {
        id: "11",
        starter: include_str!("../../languages/java/starters/java11.java"),
    },
];

const PYTHON_VERSIONS: &[LanguageVersion] = &[LanguageVersion {
    id: "3",
    starter: include_str!("../../languages/python/starters/python3.py"),
}];

const JAVASCRIPT_VERSIONS: &[LanguageVersion] = &[LanguageVersion {
    id: "es2022",
    starter: include_str!("../../languages/javascript/starters/es2022.js"),
}];

impl LanguageId {
    pub const ALL: [LanguageId; 4] = [
        LanguageId::Java,
        LanguageId::Python,
        LanguageId::JavaScript,
        LanguageId::PlainText,
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.language_id() == id)
    }

    pub fn language_id(self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::PlainText => "plaintext",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Java => ".java",
            Self::Python => ".py",
            Self::JavaScript => ".js",
            Self::PlainText => ".txt",
        }
    }

    /// Java 要求公共类与文件同名
    pub fn default_stem(self) -> &'static str {
        match self {
            Self::Java => "Main",
            Self::Python | Self::JavaScript => "main",
            Self::PlainText => "untitled",
        }
    }

    pub fn versions(self) -> &'static [LanguageVersion] {
        match self {
            Self::Java => JAVA_VERSIONS,
            Self::Python => PYTHON_VERSIONS,
            Self::JavaScript => JAVASCRIPT_VERSIONS,
            Self::PlainText => &[],
        }
    }

    pub fn version(self, id: &str) -> Option<&'static LanguageVersion> {
        self.versions().iter().find(|v| v.id == id)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/language.rs"]
mod tests;
