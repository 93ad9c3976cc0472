//! This folder contains the current database schema for each table.
macro_rules! schema {
    ($name:ident, $desc:expr) => {
        #[doc = concat!($desc, ".")]
        ///
        /// The database schema contents:
        /// ```sql
        #[doc = include_str!(concat!("schema/", stringify!($name), ".sql"))]
        ///```
        pub const fn $name() -> &'static str {
            include_str!(concat!("schema/", stringify!($name), ".sql"))
        }
    };
}

schema!(original_files, "The original files table");

schema!(master_files, "The master files table");

schema!(access_files, "The access copy (converted) files table");

schema!(statutory_files, "The statutory copy (converted) files table");

schema!(events, "The append-only event log table");

schema!(metadata, "The key-value metadata table");
