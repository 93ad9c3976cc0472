#[derive(Debug)]
pub enum DatabaseError {
    SQLiteError(rusqlite::Error),
    InvalidDatabase,
    TableMissing(String),
    TableIncorrectSchema(String, String),
    SchemaTooNew(i32, i32),
    Migration(i32, String),
    RowMissing(String),
    RelativePathExists(String),
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SQLiteError(err) => err.fmt(f),
            Self::InvalidDatabase => {
                write!(f, "File is not a digiarch database")
            }
            Self::TableMissing(table) => write!(f, "Database missing table: '{table}'"),
            Self::TableIncorrectSchema(table, schema) => {
                write!(f, "Table '{table}' has unexpected schema:\n{schema}")
            }
            Self::SchemaTooNew(found, expected) => write!(
                f,
                "Database schema version {found} is newer than the version supported by this tool ({expected})"
            ),
            Self::Migration(from, reason) => {
                write!(f, "Failed to migrate database from schema v{from}: {reason}")
            }
            Self::RowMissing(id) => write!(f, "No row found for '{id}'"),
            Self::RelativePathExists(path) => {
                write!(f, "Relative path already present in database: '{path}'")
            }
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        Self::SQLiteError(err)
    }
}
