use crate::error::SyncError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Changed fields, keyed by their wire name.
pub type Diff = Map<String, Value>;

/// Fields of `data` whose value differs from `data_old`.
///
/// Fields are paired by name, so declaration or insertion order never
/// matters. A field present in `data` but missing from `data_old` counts as
/// changed; a field missing from `data` is never reported (partial updates
/// only, no deletions). An empty result means there is nothing to send.
pub fn diff<T, U>(data: &T, data_old: &U) -> Result<Diff, SyncError>
where
    T: Serialize + ?Sized,
    U: Serialize + ?Sized,
{
    let new = serde_json::to_value(data)?;
    let old = serde_json::to_value(data_old)?;
    Ok(diff_values(&new, &old))
}

pub fn diff_values(data: &Value, data_old: &Value) -> Diff {
    let Some(new) = data.as_object() else {
        return Diff::new();
    };
    let old = data_old.as_object();

    new.iter()
        .filter(|(key, value)| old.and_then(|old| old.get(key.as_str())) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Post;
    use serde_json::json;

    #[test]
    fn identical_records_have_no_diff() {
        let post = Post {
            id: Some("x".into()),
            title: Some("A".into()),
            content: Some("B".into()),
            author: None,
        };
        assert!(diff(&post, &post).unwrap().is_empty());
    }

    #[test]
    fn only_changed_fields_are_reported() {
        let data = Post {
            id: Some("x".into()),
            title: Some("A".into()),
            content: Some("B".into()),
            author: None,
        };
        let data_old = Post {
            id: Some("x".into()),
            title: Some("A".into()),
            content: Some("C".into()),
            author: None,
        };

        let changes = diff(&data, &data_old).unwrap();
        assert_eq!(Value::Object(changes), json!({"content": "B"}));
    }

    #[test]
    fn field_order_does_not_matter() {
        let data = json!({"title": "A", "content": "B", "_id": "x"});
        let data_old: Value =
            serde_json::from_str(r#"{"_id": "x", "content": "C", "title": "A"}"#).unwrap();

        let changes = diff_values(&data, &data_old);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["content"], "B");
    }

    #[test]
    fn new_fields_are_included_and_missing_ones_ignored() {
        let data = json!({"_id": "x", "title": "A"});
        let data_old = json!({"_id": "x", "content": "old"});

        let changes = diff_values(&data, &data_old);
        assert_eq!(Value::Object(changes), json!({"title": "A"}));
    }

    #[test]
    fn empty_snapshot_reports_every_field() {
        let data = Post::draft("A", "B");
        let changes = diff(&data, &Post::default()).unwrap();
        assert_eq!(changes.len(), 2);
    }
}
