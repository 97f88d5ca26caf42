//! Effective policy resolution and category governance checks.
//!
//! Walks a store's declared category tree from root to target, merging
//! policy blocks with child-overrides-parent semantics onto the system
//! defaults. Pure: consults only the already-loaded store configuration.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::config::{declared_paths, is_declared, CategoryConfig, CategoryMode, PolicyConfig};
use crate::error::DomainError;
use crate::types::CategoryPath;

/// Resolved permission set. System default: everything allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions {
            create: true,
            update: true,
            delete: true,
        }
    }
}

/// The field-wise merge of declared policies from root to a target
/// category, with system defaults for fields no level sets.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivePolicy {
    pub default_ttl_days: Option<u32>,
    pub max_content_length: Option<usize>,
    pub permissions: Permissions,
    pub subcategory_creation: bool,
}

impl Default for EffectivePolicy {
    fn default() -> Self {
        EffectivePolicy {
            default_ttl_days: None,
            max_content_length: None,
            permissions: Permissions::default(),
            subcategory_creation: true,
        }
    }
}

impl EffectivePolicy {
    fn merge(&mut self, declared: &PolicyConfig) {
        if let Some(days) = declared.default_ttl_days {
            self.default_ttl_days = Some(days);
        }
        if let Some(limit) = declared.max_content_length {
            self.max_content_length = Some(limit);
        }
        if let Some(permissions) = &declared.permissions {
            if let Some(create) = permissions.create {
                self.permissions.create = create;
            }
            if let Some(update) = permissions.update {
                self.permissions.update = update;
            }
            if let Some(delete) = permissions.delete {
                self.permissions.delete = delete;
            }
        }
        if let Some(subcategory_creation) = declared.subcategory_creation {
            self.subcategory_creation = subcategory_creation;
        }
    }
}

/// Resolve the effective policy for a category. Categories absent from
/// the declared tree contribute nothing; inheritance walks past them.
pub fn resolve_effective(
    categories: &BTreeMap<String, CategoryConfig>,
    path: &CategoryPath,
) -> EffectivePolicy {
    let mut effective = EffectivePolicy::default();
    let mut level = categories;
    for segment in path.segments() {
        match level.get(segment.as_str()) {
            Some(node) => {
                if let Some(policies) = &node.policies {
                    effective.merge(policies);
                }
                level = &node.subcategories;
            }
            None => break,
        }
    }
    effective
}

/// Apply the TTL ceiling to a requested expiry.
///
/// With a `default_ttl_days` of D in effect: a missing request becomes
/// `now + D`; a request below the ceiling is used as-is; a request above
/// it is silently capped. Without a TTL the request passes through.
pub fn apply_ttl_ceiling(
    policy: &EffectivePolicy,
    requested: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match policy.default_ttl_days {
        Some(days) => {
            let ceiling = now + Duration::days(i64::from(days));
            Some(match requested {
                Some(requested) if requested < ceiling => requested,
                _ => ceiling,
            })
        }
        None => requested,
    }
}

/// Enforce the store's category mode for `create_category`.
pub fn check_category_creation(
    mode: CategoryMode,
    categories: &BTreeMap<String, CategoryConfig>,
    path: &CategoryPath,
) -> Result<(), DomainError> {
    match mode {
        CategoryMode::Free => Ok(()),
        CategoryMode::Subcategories => {
            let root = match path.segments().first() {
                Some(root) => root,
                None => return Ok(()),
            };
            if categories.contains_key(root.as_str()) {
                Ok(())
            } else {
                Err(DomainError::RootCategoryNotAllowed {
                    category: root.to_string(),
                })
            }
        }
        CategoryMode::Strict => {
            if is_declared(categories, path) {
                Ok(())
            } else {
                Err(DomainError::CategoryProtected {
                    category: path.to_string(),
                })
            }
        }
    }
}

/// Whether deleting `path` would touch a config-declared category or an
/// ancestor of one.
pub fn check_category_deletable(
    categories: &BTreeMap<String, CategoryConfig>,
    path: &CategoryPath,
) -> Result<(), DomainError> {
    let protected = declared_paths(categories)
        .iter()
        .any(|declared| declared.is_child_of(path));
    if protected {
        Err(DomainError::CategoryProtected {
            category: path.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Declared categories reject description changes regardless of mode.
pub fn check_description_allowed(
    categories: &BTreeMap<String, CategoryConfig>,
    path: &CategoryPath,
) -> Result<(), DomainError> {
    if is_declared(categories, path) {
        Err(DomainError::CategoryProtected {
            category: path.to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_registry;
    use crate::error::ErrorCode;
    use crate::types::Slug;
    use chrono::TimeZone;

    fn sample_categories() -> BTreeMap<String, CategoryConfig> {
        let registry = parse_registry(
            r#"
stores:
  default:
    categories:
      standards:
        policies:
          max_content_length: 5000
          permissions:
            delete: false
        subcategories:
          typescript:
            policies:
              max_content_length: 2000
              subcategory_creation: false
      standup:
        policies:
          default_ttl_days: 7
"#,
        )
        .unwrap();
        registry
            .get(&Slug::new("default").unwrap())
            .unwrap()
            .categories
            .clone()
    }

    #[test]
    fn root_gets_system_defaults() {
        let policy = resolve_effective(&sample_categories(), &CategoryPath::root());
        assert_eq!(policy, EffectivePolicy::default());
        assert!(policy.permissions.create);
        assert!(policy.subcategory_creation);
    }

    #[test]
    fn child_overrides_parent_field_wise() {
        let categories = sample_categories();
        let parent = resolve_effective(
            &categories,
            &CategoryPath::parse("standards").unwrap(),
        );
        assert_eq!(parent.max_content_length, Some(5000));
        assert!(!parent.permissions.delete);

        let child = resolve_effective(
            &categories,
            &CategoryPath::parse("standards/typescript").unwrap(),
        );
        // Overridden by the child.
        assert_eq!(child.max_content_length, Some(2000));
        assert!(!child.subcategory_creation);
        // Inherited from the parent.
        assert!(!child.permissions.delete);
        assert!(child.permissions.create);
    }

    #[test]
    fn undeclared_categories_inherit_through() {
        let categories = sample_categories();
        let deep = resolve_effective(
            &categories,
            &CategoryPath::parse("standards/go/style").unwrap(),
        );
        assert_eq!(deep.max_content_length, Some(5000));
        assert!(!deep.permissions.delete);
    }

    #[test]
    fn ttl_ceiling_caps_and_defaults() {
        let categories = sample_categories();
        let policy = resolve_effective(&categories, &CategoryPath::parse("standup").unwrap());
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let ceiling = Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap();

        // No request: ceiling becomes the expiry.
        assert_eq!(apply_ttl_ceiling(&policy, None, now), Some(ceiling));

        // A smaller request wins.
        let earlier = Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap();
        assert_eq!(apply_ttl_ceiling(&policy, Some(earlier), now), Some(earlier));

        // A larger request is capped.
        let later = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(apply_ttl_ceiling(&policy, Some(later), now), Some(ceiling));
    }

    #[test]
    fn no_ttl_passes_requests_through() {
        let policy = EffectivePolicy::default();
        let now = Utc::now();
        assert_eq!(apply_ttl_ceiling(&policy, None, now), None);
        let later = now + Duration::days(30);
        assert_eq!(apply_ttl_ceiling(&policy, Some(later), now), Some(later));
    }

    #[test]
    fn subcategories_mode_rejects_undeclared_roots() {
        let categories = sample_categories();
        let err = check_category_creation(
            CategoryMode::Subcategories,
            &categories,
            &CategoryPath::parse("legacy").unwrap(),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::RootCategoryNotAllowed);

        check_category_creation(
            CategoryMode::Subcategories,
            &categories,
            &CategoryPath::parse("standards/new").unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn strict_mode_rejects_undeclared_paths() {
        let categories = sample_categories();
        let err = check_category_creation(
            CategoryMode::Strict,
            &categories,
            &CategoryPath::parse("standards/new").unwrap(),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CategoryProtected);

        check_category_creation(
            CategoryMode::Strict,
            &categories,
            &CategoryPath::parse("standards/typescript").unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn declared_categories_and_ancestors_are_protected() {
        let categories = sample_categories();
        for path in ["standards", "standards/typescript", "standup"] {
            let err = check_category_deletable(
                &categories,
                &CategoryPath::parse(path).unwrap(),
            )
            .unwrap_err();
            assert_eq!(err.code(), ErrorCode::CategoryProtected, "path {path}");
        }
        check_category_deletable(&categories, &CategoryPath::parse("scratch").unwrap()).unwrap();
    }

    #[test]
    fn descriptions_are_locked_for_declared_categories() {
        let categories = sample_categories();
        assert!(check_description_allowed(
            &categories,
            &CategoryPath::parse("standards").unwrap()
        )
        .is_err());
        assert!(check_description_allowed(
            &categories,
            &CategoryPath::parse("scratch").unwrap()
        )
        .is_ok());
        assert!(check_description_allowed(&categories, &CategoryPath::root()).is_ok());
    }
}
