use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// A workflow snapshot: mapping, sequence or scalar, nested arbitrarily.
///
/// `serde_json::Value` already is the tagged union we need, so every branch
/// of the normalizer and flattener is an exhaustive `match` over it.
pub type MetadataTree = Value;

/// Leaf value of a metadata tree, with the equality rule used by the metric.
///
/// Numbers compare by value across integer and float representations:
/// an integral float is stored as `Integer`, so a normalized seed `0`
/// collides with a `0.0` found elsewhere. Booleans, strings and null are
/// never equal to a number.
#[derive(Debug, Clone)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i128),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Largest magnitude for which an integral float is folded into `Integer`
    const INTEGRAL_FLOAT_LIMIT: f64 = 1e38;

    /// Convert a leaf of the tree; mappings and sequences yield `None`
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Integer(i as i128))
                } else if let Some(u) = n.as_u64() {
                    Some(Self::Integer(u as i128))
                } else {
                    n.as_f64().map(Self::from_float)
                }
            }
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn from_float(f: f64) -> Self {
        if f.fract() == 0.0 && f.abs() < Self::INTEGRAL_FLOAT_LIMIT {
            Self::Integer(f as i128)
        } else {
            Self::Float(f)
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::String(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// A loaded snapshot document
#[derive(Debug, Clone)]
pub struct Document {
    /// Name used for ordering and reporting (the file name for files on disk)
    pub name: String,

    /// Location of the document; removal acts on this path
    pub path: PathBuf,

    /// Parsed metadata tree
    pub tree: MetadataTree,
}

impl Document {
    /// Create a document whose path is its name
    pub fn new(name: impl Into<String>, tree: MetadataTree) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            tree,
        }
    }

    /// Create a document loaded from `path`
    pub fn with_path(name: impl Into<String>, path: impl Into<PathBuf>, tree: MetadataTree) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            tree,
        }
    }
}

/// Keep/drop verdict for one compared document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Keep,
    Drop,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => write!(f, "KEEP"),
            Self::Drop => write!(f, "DROP"),
        }
    }
}

/// What actually happened to a compared document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Retained; became the new baseline
    Kept,

    /// Dropped and removed from the corpus
    Deleted,

    /// Dropped, but left in place because of a dry run
    WouldDelete,

    /// Dropped, but removal failed
    DeleteFailed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kept => write!(f, "KEPT"),
            Self::Deleted => write!(f, "DELETED"),
            Self::WouldDelete => write!(f, "WOULD DELETE"),
            Self::DeleteFailed(msg) => write!(f, "DELETE_ERROR ({})", msg),
        }
    }
}

/// Result of comparing one document against the current baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    /// Name of the compared document
    pub filename: String,

    /// Name of the baseline it was compared against
    pub compared_against: String,

    /// Distance to the baseline, in percent
    pub distance_percent: f64,

    /// Keep/drop verdict
    pub decision: Decision,

    /// Side effect applied for the verdict
    pub outcome: Outcome,
}

/// A document skipped because it could not be loaded or fingerprinted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentError {
    pub filename: String,
    pub message: String,
}

impl DocumentError {
    pub fn new(filename: impl Into<String>, error: &dyn fmt::Display) -> Self {
        Self {
            filename: filename.into(),
            message: error.to_string(),
        }
    }
}

/// One line of the dedup report, in processing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReportEntry {
    /// First loadable document, retained unconditionally
    Initial(String),

    /// A document compared against the baseline
    Compared(ComparisonRecord),

    /// A document that took no part in the chain
    Skipped(DocumentError),
}

/// Counters for a dedup run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupSummary {
    /// Every document handed to the engine, including ones that failed to load
    pub total_processed: usize,

    /// Documents compared against a baseline
    pub total_compared: usize,

    /// Documents with a DROP decision
    pub total_dropped: usize,

    /// Dropped documents actually removed
    pub total_deleted: usize,

    /// Load and delete failures
    pub total_errors: usize,
}

/// Everything a dedup run produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupReport {
    /// Threshold in effect; `None` means report-only mode
    pub threshold: Option<f64>,

    /// Report lines in processing order
    pub entries: Vec<ReportEntry>,

    pub summary: DedupSummary,
}

impl DedupReport {
    /// Comparison records in processing order
    pub fn records(&self) -> impl Iterator<Item = &ComparisonRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            ReportEntry::Compared(record) => Some(record),
            _ => None,
        })
    }

    /// Documents skipped because they failed to load
    pub fn errors(&self) -> impl Iterator<Item = &DocumentError> {
        self.entries.iter().filter_map(|entry| match entry {
            ReportEntry::Skipped(error) => Some(error),
            _ => None,
        })
    }

    /// Name of the document that opened the chain
    pub fn initial(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            ReportEntry::Initial(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_integer_and_integral_float_are_equal() {
        let int = Scalar::from_value(&json!(0)).unwrap();
        let float = Scalar::from_value(&json!(0.0)).unwrap();
        assert_eq!(int, float);

        let mut set = HashSet::new();
        set.insert(int);
        assert!(set.contains(&float));
    }

    #[test]
    fn test_fractional_float_is_distinct() {
        let a = Scalar::from_value(&json!(0.5)).unwrap();
        let b = Scalar::from_value(&json!(0)).unwrap();
        assert_ne!(a, b);
        assert!(matches!(a, Scalar::Float(_)));
    }

    #[test]
    fn test_bool_never_equals_number() {
        let t = Scalar::from_value(&json!(true)).unwrap();
        let one = Scalar::from_value(&json!(1)).unwrap();
        assert_ne!(t, one);
    }

    #[test]
    fn test_large_unsigned_seed() {
        let seed = Scalar::from_value(&json!(18_446_744_073_709_551_615u64)).unwrap();
        assert_eq!(seed, Scalar::Integer(u64::MAX as i128));
    }

    #[test]
    fn test_containers_are_not_scalars() {
        assert!(Scalar::from_value(&json!([])).is_none());
        assert!(Scalar::from_value(&json!({})).is_none());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Kept.to_string(), "KEPT");
        assert_eq!(Outcome::WouldDelete.to_string(), "WOULD DELETE");
        assert_eq!(
            Outcome::DeleteFailed("denied".to_string()).to_string(),
            "DELETE_ERROR (denied)"
        );
    }
}
