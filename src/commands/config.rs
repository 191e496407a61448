use crate::db::DbPool;
use crate::error::StoreError;
use crate::types::config::DetectorConfig;

const DETECTORS_KEY: &str = "detectors";

fn raw_config_get(pool: &DbPool) -> Result<serde_json::Value, StoreError> {
    let conn = pool.get()?;
    let stored: Option<String> = match conn.query_row(
        "SELECT value FROM config WHERE key = ?1",
        [DETECTORS_KEY],
        |row| row.get(0),
    ) {
        Ok(json) => Some(json),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };
    match stored {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(serde_json::Value::Object(Default::default())),
    }
}

/// Stored detector thresholds, with defaults for anything not stored.
pub fn config_get_db(pool: &DbPool) -> Result<DetectorConfig, StoreError> {
    Ok(serde_json::from_value(raw_config_get(pool)?)?)
}

pub fn config_set_db(pool: &DbPool, config: &DetectorConfig) -> Result<(), StoreError> {
    config.validate().map_err(StoreError::InvalidConfig)?;
    let json = serde_json::to_string(config)?;
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO config (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        [DETECTORS_KEY, json.as_str()],
    )?;
    Ok(())
}

/// Merge a JSON patch into the stored thresholds and persist the result.
/// Patches that would produce an invalid config are rejected unchanged.
pub fn config_update_db(pool: &DbPool, patch_json: &str) -> Result<DetectorConfig, StoreError> {
    let mut current = serde_json::to_value(config_get_db(pool)?)?;
    let patch: serde_json::Value = serde_json::from_str(patch_json)?;

    merge_json(&mut current, &patch);
    let merged: DetectorConfig = serde_json::from_value(current)?;
    config_set_db(pool, &merged)?;
    Ok(merged)
}

fn merge_json(base: &mut serde_json::Value, patch: &serde_json::Value) {
    if let (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) =
        (base, patch)
    {
        for (key, value) in patch_map {
            if let Some(existing) = base_map
                .get_mut(key)
                .filter(|existing| existing.is_object() && value.is_object())
            {
                merge_json(existing, value);
                continue;
            }
            base_map.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::open(&dir.path().join("test.sqlite")).unwrap();
        (dir, pool)
    }

    #[test]
    fn get_returns_defaults_when_unset() {
        let (_dir, pool) = test_pool();
        assert_eq!(config_get_db(&pool).unwrap(), DetectorConfig::default());
    }

    #[test]
    fn update_merges_nested_fields() {
        let (_dir, pool) = test_pool();
        config_update_db(&pool, r#"{"location": {"maxNormalDistanceKm": 80.0}}"#).unwrap();
        let updated = config_update_db(&pool, r#"{"amount": {"neighbors": 7}}"#).unwrap();

        assert_eq!(updated.location.max_normal_distance_km, 80.0);
        assert_eq!(updated.location.max_normal_hours, 24.0);
        assert_eq!(updated.amount.neighbors, 7);
        assert_eq!(config_get_db(&pool).unwrap(), updated);
    }

    #[test]
    fn invalid_patch_is_rejected_and_not_stored() {
        let (_dir, pool) = test_pool();
        let err = config_update_db(&pool, r#"{"amount": {"contamination": 0.9}}"#).unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
        assert_eq!(config_get_db(&pool).unwrap(), DetectorConfig::default());
    }

    #[test]
    fn malformed_json_is_error() {
        let (_dir, pool) = test_pool();
        assert!(matches!(
            config_update_db(&pool, "not json").unwrap_err(),
            StoreError::Json(_)
        ));
    }

    #[test]
    fn merge_json_replaces_scalars() {
        let mut base = serde_json::json!({"a": {"b": 1, "c": 2}, "d": 3});
        merge_json(&mut base, &serde_json::json!({"a": {"b": 10}, "d": {"e": 4}}));
        assert_eq!(base, serde_json::json!({"a": {"b": 10, "c": 2}, "d": {"e": 4}}));
    }
}
