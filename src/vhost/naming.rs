//! Virtual host directory naming.
//!
//! A vhost directory is named `<name><separator><marker>`, e.g. `shop.vhost`.

/// Result of matching one directory name against the vhost convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VhostName {
    /// The name before the separator; empty when not matched.
    pub name: String,
    pub matched: bool,
}

impl VhostName {
    fn unmatched() -> Self {
        Self {
            name: String::new(),
            matched: false,
        }
    }
}

/// Match `dir_name` against `<name><separator><marker>` with a non-empty name.
pub fn parse_vhost_dir(dir_name: &str, separator: &str, marker: &str) -> VhostName {
    let suffix = format!("{separator}{marker}");
    match dir_name.strip_suffix(suffix.as_str()) {
        Some(name) if !name.is_empty() => VhostName {
            name: name.to_string(),
            matched: true,
        },
        _ => VhostName::unmatched(),
    }
}

/// The hostname a vhost answers: `<name>.<base>`, lowercased.
pub fn hostname_for(name: &str, base: &str) -> String {
    let base = base.trim_start_matches('.');
    if base.is_empty() {
        return name.to_ascii_lowercase();
    }
    format!("{name}.{base}").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_convention() {
        let parsed = parse_vhost_dir("shop.vhost", ".", "vhost");
        assert!(parsed.matched);
        assert_eq!(parsed.name, "shop");

        let dotted = parse_vhost_dir("api.v2.vhost", ".", "vhost");
        assert_eq!(dotted.name, "api.v2");
    }

    #[test]
    fn test_rejects_other_names() {
        assert!(!parse_vhost_dir("shop", ".", "vhost").matched);
        assert!(!parse_vhost_dir(".vhost", ".", "vhost").matched);
        assert!(!parse_vhost_dir("shop.vhosts", ".", "vhost").matched);
        assert!(!parse_vhost_dir("shop-vhost", ".", "vhost").matched);
        assert!(parse_vhost_dir("shop-vhost", "-", "vhost").matched);
    }

    #[test]
    fn test_hostname() {
        assert_eq!(hostname_for("Shop", "example.com"), "shop.example.com");
        assert_eq!(hostname_for("shop", ".example.com"), "shop.example.com");
        assert_eq!(hostname_for("shop", ""), "shop");
    }
}
