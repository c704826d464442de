use serde::{Deserialize, Serialize};

/// Physical type metadata for a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    /// Full physical type as reported by the database (e.g. `tinyint(1)`,
    /// `character varying(255)`).
    pub data_type: String,
    /// Base type name without modifiers (e.g. `tinyint`, `int4`, `varchar`).
    pub udt_name: String,
    pub character_max_length: Option<i32>,
}

impl ColumnType {
    /// Build a type from a physical label, deriving the base name.
    pub fn from_label(label: &str) -> Self {
        let data_type = label.trim().to_string();
        let udt_name = data_type
            .split(['(', ' '])
            .next()
            .unwrap_or(&data_type)
            .to_lowercase();
        Self {
            data_type,
            udt_name,
            character_max_length: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_label_strips_modifiers() {
        let ty = ColumnType::from_label("tinyint(1)");
        assert_eq!(ty.data_type, "tinyint(1)");
        assert_eq!(ty.udt_name, "tinyint");

        let ty = ColumnType::from_label("timestamp without time zone");
        assert_eq!(ty.udt_name, "timestamp");
    }
}
