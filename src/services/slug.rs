// URL slug generation for restaurant profiles

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Slugs are stored in a VARCHAR(80) column
const MAX_SLUG_LEN: usize = 80;

/// Uniqueness suffix attempts before giving up
const MAX_SUFFIX_ATTEMPTS: u32 = 50;

/// Path segments the router owns; a restaurant can never claim these
const RESERVED_SLUGS: &[&str] = &[
    "admin", "api", "auth", "contact", "docs", "health", "imprint", "login", "onboarding",
    "pages", "privacy", "register", "restaurant", "restaurants", "tables", "uploads", "www",
];

static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$").expect("valid slug regex"));

#[derive(Debug, Error)]
pub enum SlugError {
    #[error("Name produces an empty slug")]
    EmptySlug,

    #[error("Could not find a free slug for '{0}'")]
    Exhausted(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Turn a restaurant name into a URL-safe slug: German transliteration,
/// lowercase ASCII, hyphen-separated.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    for c in name.to_lowercase().chars() {
        match c {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            'à' | 'á' | 'â' | 'å' => out.push('a'),
            'è' | 'é' | 'ê' | 'ë' => out.push('e'),
            'ì' | 'í' | 'î' | 'ï' => out.push('i'),
            'ò' | 'ó' | 'ô' => out.push('o'),
            'ù' | 'ú' | 'û' => out.push('u'),
            'ç' => out.push('c'),
            'ñ' => out.push('n'),
            c if c.is_ascii_alphanumeric() => out.push(c),
            _ => out.push('-'),
        }
    }

    // Collapse runs of hyphens and trim them from the ends
    let mut collapsed = String::with_capacity(out.len());
    let mut previous_hyphen = true;
    for c in out.chars() {
        if c == '-' {
            if !previous_hyphen {
                collapsed.push('-');
            }
            previous_hyphen = true;
        } else {
            collapsed.push(c);
            previous_hyphen = false;
        }
    }
    while collapsed.ends_with('-') {
        collapsed.pop();
    }

    collapsed.chars().take(MAX_SLUG_LEN).collect()
}

/// Whether a slug is syntactically valid and not reserved
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && SLUG_REGEX.is_match(slug)
        && !RESERVED_SLUGS.contains(&slug)
}

pub fn is_reserved(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}

async fn slug_exists(
    conn: &mut AsyncPgConnection,
    candidate: &str,
    exclude: Option<uuid::Uuid>,
) -> Result<bool, SlugError> {
    use crate::schema::restaurants::dsl::*;

    let mut query = restaurants.filter(slug.eq(candidate)).into_boxed();
    if let Some(own_id) = exclude {
        query = query.filter(id.ne(own_id));
    }

    let count: i64 = query.count().get_result(conn).await?;
    Ok(count > 0)
}

/// Generate a unique slug from a restaurant name. Collisions and
/// reserved words get numeric suffixes: `-2`, `-3`, ...
/// `exclude` keeps a restaurant's own row out of the uniqueness check
/// when re-slugging after a rename.
pub async fn generate_unique_slug(
    conn: &mut AsyncPgConnection,
    name: &str,
    exclude: Option<uuid::Uuid>,
) -> Result<String, SlugError> {
    let base = slugify(name);
    if base.is_empty() {
        return Err(SlugError::EmptySlug);
    }

    if !is_reserved(&base) && !slug_exists(conn, &base, exclude).await? {
        return Ok(base);
    }

    for n in 2..=MAX_SUFFIX_ATTEMPTS {
        let suffix = format!("-{}", n);
        let mut candidate: String = base.chars().take(MAX_SLUG_LEN - suffix.len()).collect();
        while candidate.ends_with('-') {
            candidate.pop();
        }
        candidate.push_str(&suffix);

        if !slug_exists(conn, &candidate, exclude).await? {
            return Ok(candidate);
        }
    }

    Err(SlugError::Exhausted(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Zur Goldenen Gabel"), "zur-goldenen-gabel");
        assert_eq!(slugify("Trattoria Bella Vita"), "trattoria-bella-vita");
    }

    #[test]
    fn test_slugify_german_transliteration() {
        assert_eq!(slugify("Gasthaus Müller"), "gasthaus-mueller");
        assert_eq!(slugify("Café Björk & Söhne"), "cafe-bjoerk-soehne");
        assert_eq!(slugify("Weißes Rössl"), "weisses-roessl");
    }

    #[test]
    fn test_slugify_collapses_and_trims_separators() {
        assert_eq!(slugify("  -- Chez   Marie --  "), "chez-marie");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_output_is_url_safe() {
        let names = [
            "Zur Goldenen Gabel",
            "Gasthaus Müller",
            "L'Osteria (Mitte)",
            "100% Taqueria!",
        ];
        for name in names {
            let slug = slugify(name);
            assert!(
                slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "slug '{}' contains unsafe characters",
                slug
            );
            assert!(is_valid_slug(&slug), "slug '{}' failed validation", slug);
        }
    }

    #[test]
    fn test_slugify_respects_max_length() {
        let long_name = "a".repeat(300);
        assert_eq!(slugify(&long_name).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn test_reserved_slugs_rejected() {
        assert!(is_reserved("admin"));
        assert!(is_reserved("api"));
        assert!(!is_valid_slug("admin"));
        assert!(is_valid_slug("admiral-restaurant"));
    }

    #[test]
    fn test_slug_format_validation() {
        assert!(is_valid_slug("zur-goldenen-gabel"));
        assert!(is_valid_slug("gabel-2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("-leading-hyphen"));
        assert!(!is_valid_slug("trailing-hyphen-"));
        assert!(!is_valid_slug("Uppercase"));
        assert!(!is_valid_slug("umlaut-ü"));
    }
}
