use crate::kernel::language::LanguageId;

#[test]
fn language_ids_roundtrip() {
    for lang in LanguageId::ALL {
        assert_eq!(LanguageId::from_id(lang.language_id()), Some(lang));
    }
    assert_eq!(LanguageId::from_id("cobol"), None);
}

#[test]
fn starters_are_bundled_per_version() {
    let java17 = LanguageId::Java.version("17").expect("java 17");
    assert!(java17.starter.contains("Hello, Java 17!"));

    let java11 = LanguageId::Java.version("11").expect("java 11");
    assert!(java11.starter.contains("Hello, Java 11!"));

    let python = LanguageId::Python.version("3").expect("python 3");
    assert!(python.starter.starts_with("# Python 3.x"));

    assert!(LanguageId::Java.version("8").is_none());
    assert!(LanguageId::PlainText.versions().is_empty());
}

#[test]
fn default_file_names_follow_language_conventions() {
    assert_eq!(LanguageId::Java.default_stem(), "Main");
    assert_eq!(LanguageId::Java.extension(), ".java");
    assert_eq!(LanguageId::JavaScript.default_stem(), "main");
    assert_eq!(LanguageId::Python.extension(), ".py");
}
