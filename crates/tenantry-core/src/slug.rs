//! Organization slug derivation
//!
//! A slug is the canonical identifier derived from an organization's display
//! name. It doubles as the name of the organization's storage region, so it is
//! namespaced with [`SLUG_NAMESPACE`] to keep tenant regions apart from any
//! other region in the store.

/// Prefix carried by every derived slug.
pub const SLUG_NAMESPACE: &str = "org_";

/// Derive the slug for an organization name.
///
/// Lower-cases, transliterates to ASCII, collapses every run of characters
/// outside `[a-z0-9]` into a single hyphen, trims hyphens from both ends and
/// prefixes [`SLUG_NAMESPACE`]. Total: a name with no usable characters
/// yields the bare namespace (`org_`).
pub fn derive(name: &str) -> String {
    let ascii = deunicode::deunicode(name).to_lowercase();

    let mut body = String::with_capacity(ascii.len());
    let mut pending_hyphen = false;
    for c in ascii.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !body.is_empty() {
                body.push('-');
            }
            pending_hyphen = false;
            body.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    format!("{SLUG_NAMESPACE}{body}")
}

/// The part of a slug after the namespace prefix, if it carries one.
pub fn body(slug: &str) -> Option<&str> {
    slug.strip_prefix(SLUG_NAMESPACE)
}

/// Whether a region name looks like it was produced by [`derive`].
pub fn is_tenant_slug(name: &str) -> bool {
    body(name).is_some_and(|b| {
        b.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_name() {
        assert_eq!(derive("Acme Inc"), "org_acme-inc");
    }

    #[test]
    fn test_punctuation_runs_collapse() {
        assert_eq!(derive("  Acme,   Inc.!! "), "org_acme-inc");
        assert_eq!(derive("a--b__c"), "org_a-b-c");
    }

    #[test]
    fn test_transliteration() {
        assert_eq!(derive("Café Zürich"), "org_cafe-zurich");
        assert_eq!(derive("ÅNGSTRÖM"), "org_angstrom");
    }

    #[test]
    fn test_degenerate_names_are_total() {
        assert_eq!(derive(""), "org_");
        assert_eq!(derive("!!!"), "org_");
        assert_eq!(derive("   "), "org_");
    }

    #[test]
    fn test_distinct_names_can_collide() {
        assert_eq!(derive("Acme Inc"), derive("acme-inc"));
        assert_eq!(derive("Acme Inc"), derive("ACME   INC."));
    }

    #[test]
    fn test_derive_is_idempotent_on_slug_body() {
        for name in ["Acme Inc", "Café Zürich", "x", "123 Go!", "!!!"] {
            let slug = derive(name);
            let body = body(&slug).unwrap();
            assert_eq!(derive(body), slug, "name: {name}");
        }
    }

    #[test]
    fn test_output_alphabet() {
        let slug = derive("Ünïcödé & <script>alert(1)</script> 日本");
        let body = body(&slug).unwrap();
        assert!(
            body.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        );
        assert!(!body.starts_with('-'));
        assert!(!body.ends_with('-'));
    }

    #[test]
    fn test_is_tenant_slug() {
        assert!(is_tenant_slug("org_acme-inc"));
        assert!(is_tenant_slug("org_"));
        assert!(!is_tenant_slug("organizations"));
        assert!(!is_tenant_slug("org_Bad"));
    }
}
