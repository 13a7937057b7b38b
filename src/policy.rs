use serde::{Deserialize, Serialize};

use crate::compress_type::Algorithm;

/// Decides which algorithm compresses each field of a record.
///
/// Fields are addressed by their position in the record array. Fields past
/// [`field_count`][FieldPolicy::field_count] are never compressed.
pub trait FieldPolicy {
    /// Number of leading fields the policy covers.
    fn field_count(&self) -> usize;

    /// Algorithm for the field at `field`. Only called for `field < field_count()`.
    fn algorithm(&self, field: usize) -> Algorithm;
}

/// A fixed list of per-field algorithms, loadable from any serde format.
///
/// ```
/// # use field_pack::*;
/// let schema: FieldSchema = serde_json::from_str(r#"{"fields": ["none", "zstd", "lz4"]}"#).unwrap();
/// assert_eq!(schema.algorithm(1), Algorithm::Zstd);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSchema {
    pub fields: Vec<Algorithm>,
}

impl FieldSchema {
    pub fn new(fields: Vec<Algorithm>) -> Self {
        Self { fields }
    }
}

impl FieldPolicy for FieldSchema {
    fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn algorithm(&self, field: usize) -> Algorithm {
        self.fields.get(field).copied().unwrap_or_default()
    }
}

impl<F: FieldPolicy + ?Sized> FieldPolicy for &F {
    fn field_count(&self) -> usize {
        (**self).field_count()
    }

    fn algorithm(&self, field: usize) -> Algorithm {
        (**self).algorithm(field)
    }
}
