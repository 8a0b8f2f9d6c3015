use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix used for files whose names do not carry taxi partition attributes.
pub const FALLBACK_PREFIX: &str = "data/";

static TRIPDATA_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<class>.+?)_tripdata_(?P<year>[0-9]{4})-(?P<month>[0-9]{2})\.parquet$")
        .expect("tripdata filename pattern is valid")
});

/// Outcome of matching a filename against `<class>_tripdata_<YYYY>-<MM>.parquet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionMatch {
    Matched {
        taxi_class: String,
        year: String,
        month: String,
    },
    Fallback,
}

impl PartitionMatch {
    pub fn prefix(&self) -> String {
        match self {
            Self::Matched {
                taxi_class,
                year,
                month,
            } => format!("taxi_class={taxi_class}/year={year}/month={month}/"),
            Self::Fallback => FALLBACK_PREFIX.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }
}

pub fn match_filename(filename: &str) -> PartitionMatch {
    match TRIPDATA_FILENAME.captures(filename) {
        Some(captures) => PartitionMatch::Matched {
            taxi_class: captures["class"].to_string(),
            year: captures["year"].to_string(),
            month: captures["month"].to_string(),
        },
        None => PartitionMatch::Fallback,
    }
}

/// Derives the Hive-style partition prefix for a dataset filename.
///
/// Never fails: names outside the tripdata pattern land under
/// [`FALLBACK_PREFIX`] and a warning is logged.
pub fn partition_prefix(filename: &str) -> String {
    let partition = match_filename(filename);
    if partition.is_fallback() {
        tracing::warn!(
            component = "storage_keys",
            filename,
            fallback_prefix = FALLBACK_PREFIX,
            "filename does not match the tripdata pattern, using default prefix"
        );
    }
    partition.prefix()
}

pub fn object_key(table_name: &str, filename: &str) -> String {
    let table = table_name.trim_matches('/');
    format!("{table}/{}{filename}", partition_prefix(filename))
}
