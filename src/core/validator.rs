//! Shared validation helpers used by the core modules before they write.

use crate::errors::{Error, Result};
use sea_orm::prelude::Uuid;

/// Fails with [`Error::DifferentTenants`] unless `actual` is `expected`.
pub fn ensure_same_tenant(resource: &'static str, expected: Uuid, actual: Uuid) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::DifferentTenants {
            resource,
            tenant_uuid: expected,
        })
    }
}

/// Trims `value` and fails if nothing is left.
pub fn non_blank(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid(field, "cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Fails unless `value` lies within `min..=max`.
pub fn in_range(field: &'static str, value: i32, min: i32, max: i32) -> Result<i32> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(Error::invalid(field, format!("{value} is outside {min}-{max}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_same_tenant() {
        let tenant = Uuid::new_v4();
        assert!(ensure_same_tenant("User", tenant, tenant).is_ok());
        assert!(matches!(
            ensure_same_tenant("User", tenant, Uuid::new_v4()),
            Err(Error::DifferentTenants { resource: "User", tenant_uuid }) if tenant_uuid == tenant
        ));
    }

    #[test]
    fn test_non_blank_trims() {
        assert_eq!(non_blank("name", "  sales ").ok(), Some("sales".to_string()));
        assert!(matches!(
            non_blank("name", "   "),
            Err(Error::InvalidInput { field: "name", .. })
        ));
    }

    #[test]
    fn test_in_range() {
        assert!(in_range("max_tries", 3, 1, 10).is_ok());
        assert!(in_range("max_tries", 0, 1, 10).is_err());
    }
}
