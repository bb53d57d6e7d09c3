//! Dynamic field/value rows for interactive input.
//!
//! The session is plain data owned by the caller. Every edit goes through
//! [`reduce`], which returns the next session.

use crate::coerce::{CoercionError, FeatureRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRow {
    pub field: Option<String>,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSession {
    pub rows: Vec<FilterRow>,
}

impl Default for FormSession {
    fn default() -> Self {
        FormSession {
            rows: vec![FilterRow::default()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FormAction {
    AddRow,
    RemoveRow { index: usize },
    SetField { index: usize, field: String },
    SetValue { index: usize, value: String },
}

/// Apply one action. Indices past the end leave the session unchanged.
pub fn reduce(mut session: FormSession, action: FormAction) -> FormSession {
    let len = session.rows.len();
    match action {
        FormAction::AddRow => session.rows.push(FilterRow::default()),
        FormAction::RemoveRow { index } if index < len => {
            session.rows.remove(index);
        }
        FormAction::SetField { index, field } if index < len => {
            session.rows[index].field = Some(field).filter(|f| !f.is_empty());
        }
        FormAction::SetValue { index, value } if index < len => {
            session.rows[index].value = value;
        }
        other => debug!(?other, rows = len, "ignoring form action for a missing row"),
    }
    session
}

/// Coerce every filled-in row. Rows without a field or with an empty value
/// are skipped; a later row for the same field wins.
pub fn collect_features(session: &FormSession) -> Result<FeatureRecord, CoercionError> {
    let mut record = FeatureRecord::new();
    for row in &session.rows {
        match &row.field {
            Some(field) if !row.value.is_empty() => record.set(field, &row.value)?,
            _ => {}
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::FeatureValue;

    fn set(session: FormSession, index: usize, field: &str, value: &str) -> FormSession {
        let session = reduce(
            session,
            FormAction::SetField {
                index,
                field: field.to_string(),
            },
        );
        reduce(
            session,
            FormAction::SetValue {
                index,
                value: value.to_string(),
            },
        )
    }

    #[test]
    fn test_starts_with_one_empty_row() {
        let s = FormSession::default();
        assert_eq!(s.rows, vec![FilterRow::default()]);
        assert!(collect_features(&s).unwrap().is_empty());
    }

    #[test]
    fn test_fill_add_and_remove_rows() {
        let s = set(FormSession::default(), 0, "year_built", "2008");
        let s = reduce(s, FormAction::AddRow);
        let s = set(s, 1, "garage_cars", "3");
        assert_eq!(s.rows.len(), 2);
        assert_eq!(s.rows[1].field.as_deref(), Some("garage_cars"));

        let s = reduce(s, FormAction::RemoveRow { index: 1 });
        assert_eq!(s.rows.len(), 1);
        assert_eq!(s.rows[0].field.as_deref(), Some("year_built"));
        assert_eq!(s.rows[0].value, "2008");

        let unchanged = reduce(s.clone(), FormAction::RemoveRow { index: 5 });
        assert_eq!(unchanged, s);
    }

    #[test]
    fn test_invalid_value_names_the_field() {
        let s = set(FormSession::default(), 0, "year_built", "not a valid year");
        let err = collect_features(&s).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for year_built");
    }

    #[test]
    fn test_later_rows_override_and_blanks_are_skipped() {
        let s = set(FormSession::default(), 0, "year_built", "1990");
        let s = reduce(s, FormAction::AddRow);
        let s = set(s, 1, "year_built", "2008");
        let s = reduce(s, FormAction::AddRow);
        let s = set(s, 2, "garage_cars", "");

        let record = collect_features(&s).unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("year_built"), Some(&FeatureValue::Integer(2008)));
    }

    #[test]
    fn test_action_json_shape() {
        let action: FormAction =
            serde_json::from_str(r#"{"action":"set_value","index":0,"value":"2008"}"#).unwrap();
        assert_eq!(
            action,
            FormAction::SetValue {
                index: 0,
                value: "2008".to_string()
            }
        );
    }
}
