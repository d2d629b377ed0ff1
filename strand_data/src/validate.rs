use std::collections::HashSet;
use std::fmt;

use crate::*;

/// Validation error for a malformed persisted string table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName { index: usize },
    NameTooLong { name: String, length: usize },
    ValueTooLong { name: String, length: usize },
    DuplicateName { name: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyName { index } => {
                write!(f, "string record {index} has an empty name")
            },
            ValidationError::NameTooLong { name, length } => {
                write!(f, "string name '{name}' is {length} bytes (max {MAX_NAME_LEN})")
            },
            ValidationError::ValueTooLong { name, length } => {
                write!(f, "string '{name}' holds {length} bytes (max {MAX_STRING_LEN})")
            },
            ValidationError::DuplicateName { name } => {
                write!(f, "duplicate string name '{name}' (names are case-insensitive)")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate basic invariants of a persisted string table.
///
/// ```
/// use strand_data::{StringRecord, StringTableDef, validate_table};
///
/// let table = StringTableDef {
///     version: "2.93".into(),
///     strings: vec![StringRecord::new("greeting", "hello"), StringRecord::new("name", "")],
/// };
/// assert!(validate_table(&table).is_empty());
/// ```
pub fn validate_table(table: &StringTableDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, record) in table.strings.iter().enumerate() {
        let display = String::from_utf8_lossy(&record.name).into_owned();

        if record.name.is_empty() {
            errors.push(ValidationError::EmptyName { index });
            continue;
        }
        if record.name_length() > MAX_NAME_LEN {
            errors.push(ValidationError::NameTooLong {
                name: display.clone(),
                length: record.name_length(),
            });
        }
        if record.length() > MAX_STRING_LEN {
            errors.push(ValidationError::ValueTooLong {
                name: display.clone(),
                length: record.length(),
            });
        }
        if !seen.insert(record.name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateName { name: display });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(records: Vec<StringRecord>) -> StringTableDef {
        StringTableDef {
            version: "2.93".into(),
            strings: records,
        }
    }

    #[test]
    fn accepts_well_formed_table() {
        let def = table(vec![StringRecord::new("a", "1"), StringRecord::new("b", vec![0, 1, 2])]);
        assert!(validate_table(&def).is_empty());
    }

    #[test]
    fn reports_case_insensitive_duplicates() {
        let def = table(vec![StringRecord::new("Score", "1"), StringRecord::new("SCORE", "2")]);
        let errors = validate_table(&def);
        assert_eq!(errors, vec![ValidationError::DuplicateName { name: "SCORE".into() }]);
    }

    #[test]
    fn reports_empty_and_oversized_names() {
        let long_name = vec![b'n'; MAX_NAME_LEN + 1];
        let def = table(vec![StringRecord::new("", "x"), StringRecord::new(long_name, "")]);
        let errors = validate_table(&def);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ValidationError::EmptyName { index: 0 }));
        assert!(matches!(errors[1], ValidationError::NameTooLong { length, .. } if length == MAX_NAME_LEN + 1));
    }

    #[test]
    fn reports_oversized_values() {
        let def = table(vec![StringRecord::new("big", vec![b' '; MAX_STRING_LEN + 1])]);
        let errors = validate_table(&def);
        assert!(matches!(errors.as_slice(), [ValidationError::ValueTooLong { .. }]));
    }

    #[test]
    fn error_messages_name_the_string() {
        let err = ValidationError::DuplicateName { name: "hp".into() };
        assert!(err.to_string().contains("'hp'"));
    }

    #[test]
    fn table_def_round_trips_through_ron() {
        let def = table(vec![StringRecord::new("bytes", vec![0, 255, 32])]);
        let text = ron::to_string(&def).unwrap();
        let back: StringTableDef = ron::from_str(&text).unwrap();
        assert_eq!(def, back);
    }
}
