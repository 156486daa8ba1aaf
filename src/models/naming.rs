//! 文件名处理

/// Splits `name` into stem and extension (with the dot). Leading-dot names
/// such as `.env` have no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(idx) => name.split_at(idx),
    }
}

/// Returns `name` if no sibling uses it, otherwise `stem_1.ext`, `stem_2.ext`, …
pub fn unique_name<'a, I>(name: &str, siblings: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: Vec<&str> = siblings.into_iter().collect();
    if !taken.contains(&name) {
        return name.to_string();
    }

    let (stem, ext) = split_extension(name);
    let mut counter = 1usize;
    loop {
        let candidate = format!("{stem}_{counter}{ext}");
        if !taken.contains(&candidate.as_str()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Keeps the stem of `name` and swaps the extension.
pub fn with_extension(name: &str, ext: &str) -> String {
    let (stem, _) = split_extension(name);
    if ext.is_empty() {
        return stem.to_string();
    }
    if ext.starts_with('.') {
        format!("{stem}{ext}")
    } else {
        format!("{stem}.{ext}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/naming.rs"]
mod tests;
