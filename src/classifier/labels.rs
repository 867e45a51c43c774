//! Pipeline label sets.
//!
//! Label files come in three shapes, all accepted:
//!
//! ```text
//! ["A", "B", "C"]            array, position = class index
//! {"0": "A", "1": "B"}       index → name
//! {"A": 0, "B": 1}           name → index
//! ```

use serde_json::Value;

use super::assets::AssetError;

/// Class names for one pipeline, indexed by model output position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<Option<String>>,
}

impl LabelSet {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(|n| Some(n.into())).collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, AssetError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| AssetError::Labels(format!("not valid JSON: {e}")))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, AssetError> {
        match value {
            Value::Array(items) => {
                let names = items
                    .iter()
                    .map(|v| Some(value_to_name(v)))
                    .collect();
                Ok(Self { names })
            }
            Value::Object(map) => {
                let mut names = vec![None; map.len()];
                for (key, v) in map {
                    let (index, name) = match (key.trim().parse::<usize>(), v.as_u64()) {
                        (Ok(index), _) if !v.is_number() => (index, value_to_name(v)),
                        (_, Some(index)) => (
                            usize::try_from(index).unwrap_or(usize::MAX),
                            key.clone(),
                        ),
                        (Ok(index), None) => (index, value_to_name(v)),
                        (Err(_), None) => {
                            return Err(AssetError::Labels(format!(
                                "entry {key:?} has neither a numeric key nor a numeric index"
                            )))
                        }
                    };
                    // Indices must cover 0..len exactly once.
                    let Some(slot) = names.get_mut(index) else {
                        return Err(AssetError::Labels(format!(
                            "entry {key:?}: index {index} out of range for {} labels",
                            map.len()
                        )));
                    };
                    if slot.is_some() {
                        return Err(AssetError::Labels(format!(
                            "entry {key:?}: index {index} assigned twice"
                        )));
                    }
                    *slot = Some(name);
                }
                Ok(Self { names })
            }
            other => Err(AssetError::Labels(format!(
                "expected an array or object, found {other}"
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of class `index`; `class_<index>` when the file leaves it out.
    pub fn name(&self, index: usize) -> String {
        match self.names.get(index) {
            Some(Some(name)) => name.clone(),
            _ => format!("class_{index}"),
        }
    }
}

fn value_to_name(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_form() {
        let labels = LabelSet::from_json_str(r#"["A", "B", "SPACE"]"#).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.name(2), "SPACE");
    }

    #[test]
    fn index_to_name_form() {
        let labels = LabelSet::from_json_str(r#"{"1": "THANKS", "0": "HELLO", "2": "YES"}"#).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.name(0), "HELLO");
        assert_eq!(labels.name(1), "THANKS");
        assert_eq!(labels.name(2), "YES");
        assert_eq!(labels.name(3), "class_3");
    }

    #[test]
    fn rejects_sparse_or_huge_indices() {
        for json in [
            r#"{"A": 18446744073709551615}"#,
            r#"{"0": "A", "4000000000": "B"}"#,
            r#"{"1": "THANKS", "0": "HELLO", "3": "YES"}"#,
        ] {
            match LabelSet::from_json_str(json) {
                Err(AssetError::Labels(msg)) => assert!(msg.contains("out of range"), "{msg}"),
                other => panic!("{json}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_duplicate_indices() {
        match LabelSet::from_json_str(r#"{"A": 0, "B": 0}"#) {
            Err(AssetError::Labels(msg)) => assert!(msg.contains("twice"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn name_to_index_form() {
        let labels = LabelSet::from_json_str(r#"{"B": 1, "A": 0}"#).unwrap();
        assert_eq!(labels.name(0), "A");
        assert_eq!(labels.name(1), "B");
    }

    #[test]
    fn out_of_range_falls_back() {
        let labels = LabelSet::new(["A"]);
        assert_eq!(labels.name(7), "class_7");
    }

    #[test]
    fn rejects_scalars() {
        assert!(LabelSet::from_json_str("42").is_err());
        assert!(LabelSet::from_json_str(r#"{"A": "B"}"#).is_err());
    }
}
