//! Helpers for dotted qualified names (`com.example.Foo`).

/// Package part of a qualified name; empty for the default package.
pub fn package_of(fqn: &str) -> &str {
    match fqn.rfind('.') {
        Some(idx) => &fqn[..idx],
        None => "",
    }
}

/// Last segment of a qualified name.
pub fn simple_name(fqn: &str) -> &str {
    match fqn.rfind('.') {
        Some(idx) => &fqn[idx + 1..],
        None => fqn,
    }
}

/// Joins a package and a simple name, honoring the default package.
pub fn join(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

/// Iterates the dot separated segments of `fqn`. An empty name has no segments.
pub fn segments(fqn: &str) -> impl Iterator<Item = &str> {
    fqn.split('.').filter(|segment| !segment.is_empty())
}

/// Converts a binary name (`a.B$C`) to its source form (`a.B.C`).
pub fn binary_to_source(name: &str) -> String {
    name.replace('$', ".")
}

/// Strips the last `.ext` from a file name; names without an extension are returned unchanged.
pub fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    }
}

/// Returns `true` if `fqn` is `package` itself or nested somewhere below it.
pub fn is_within(fqn: &str, package: &str) -> bool {
    if package.is_empty() || fqn == package {
        return true;
    }
    fqn.len() > package.len() && fqn.starts_with(package) && fqn.as_bytes()[package.len()] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_package_and_simple_name() {
        assert_eq!(package_of("com.example.Foo"), "com.example");
        assert_eq!(simple_name("com.example.Foo"), "Foo");
        assert_eq!(package_of("Foo"), "");
        assert_eq!(simple_name("Foo"), "Foo");
        assert_eq!(join("", "Foo"), "Foo");
        assert_eq!(join("a.b", "Foo"), "a.b.Foo");
    }

    #[test]
    fn within_requires_segment_boundary() {
        assert!(is_within("com.example.Foo", "com.example"));
        assert!(is_within("com.example", "com.example"));
        assert!(!is_within("com.examples.Foo", "com.example"));
        assert!(is_within("anything", ""));
    }

    #[test]
    fn binary_names_use_dots_in_source_form() {
        assert_eq!(binary_to_source("a.Outer$Inner"), "a.Outer.Inner");
        assert_eq!(strip_extension("Foo.widget"), "Foo");
        assert_eq!(strip_extension("Makefile"), "Makefile");
    }
}
