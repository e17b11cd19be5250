use std::path::Path;
use std::path::PathBuf;

/// Options of one query session.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryConfig {
    /// Show the spreadsheet application when it has to be launched.
    pub visible: bool,

    /// Fall back to approximate file-name matching for sources.
    pub fuzzy: bool,

    /// Prefix of the destination table name.
    pub table_prefix: String,

    /// Extension forced onto destination and source paths (none keeps paths as given).
    pub extension: Option<String>,

    /// Reapply the captured filter predicates after a commit.
    pub restore_filters: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            visible: true,
            fuzzy: false,
            table_prefix: "tbl".to_owned(),
            extension: Some("xlsx".to_owned()),
            restore_filters: true,
        }
    }
}

impl QueryConfig {
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn with_extension(mut self, extension: Option<&str>) -> Self {
        self.extension = extension.map(str::to_owned);
        self
    }

    pub fn with_restore_filters(mut self, restore: bool) -> Self {
        self.restore_filters = restore;
        self
    }

    /// Destination table name for a query.
    pub fn table_name(&self, query_name: &str) -> String {
        format!("{}{}", self.table_prefix, query_name)
    }

    /// `path` with the configured extension.
    pub fn apply_extension(&self, path: &Path) -> PathBuf {
        match &self.extension {
            Some(extension) => path.with_extension(extension),
            None => path.to_path_buf(),
        }
    }
}
