use glob::{MatchOptions, Pattern};

use crate::error::{LedgerError, LedgerResult, RecordKind};
use crate::models::{Catalog, CatalogRecord, NutrientProfile, normalize_name};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Case-insensitive shell-style name filter. An empty pattern matches
/// everything.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    source: String,
    pattern: Option<Pattern>,
}

impl NameFilter {
    pub fn new(pattern: &str) -> LedgerResult<Self> {
        let source = pattern.trim().to_lowercase();
        if source.is_empty() {
            return Ok(Self::default());
        }
        let compiled = Pattern::new(&collapse_stars(&source)).map_err(|e| {
            LedgerError::validation(format!("Invalid filter pattern '{source}': {e}"))
        })?;
        Ok(Self {
            source,
            pattern: Some(compiled),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }

    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match &self.pattern {
            Some(p) => p.matches_with(&name.trim().to_lowercase(), MATCH_OPTIONS),
            None => true,
        }
    }
}

/// `glob` only accepts `**` as a whole path component; in a flat name a run
/// of stars means the same as one.
fn collapse_stars(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && out.ends_with('*') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Records of `catalog` whose names match `pattern`, sorted by name.
pub fn list(catalog: &Catalog, pattern: Option<&str>) -> LedgerResult<Vec<CatalogRecord>> {
    let filter = NameFilter::new(pattern.unwrap_or(""))?;
    Ok(catalog
        .iter()
        .filter(|(name, _)| filter.matches(name))
        .map(|(name, profile)| CatalogRecord {
            name: name.clone(),
            profile: *profile,
        })
        .collect())
}

/// Insert a new record. Existing names are never overwritten.
pub fn insert(
    catalog: &mut Catalog,
    kind: RecordKind,
    name: &str,
    profile: NutrientProfile,
) -> LedgerResult<String> {
    let name = normalize_name(name)?;
    profile.validate()?;
    if catalog.contains_key(&name) {
        return Err(LedgerError::already_exists(kind, name));
    }
    catalog.insert(name.clone(), profile);
    Ok(name)
}

pub fn remove(catalog: &mut Catalog, kind: RecordKind, name: &str) -> LedgerResult<String> {
    let name = normalize_name(name)?;
    if catalog.remove(&name).is_none() {
        return Err(LedgerError::not_found(kind, name));
    }
    Ok(name)
}
