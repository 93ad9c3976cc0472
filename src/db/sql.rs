//! # SQL statements
//! This module contains all of the SQL statements used by [`Database`](`super::Database`).
//! The statements are included in the documentation for the corresponding functions.

/// A convenience macro for generating the function and the corresponding documentation.
macro_rules! sql {
    ($name:ident, $desc:expr) => {
        #[doc = concat!($desc, ".")]
        ///
        /// Returns the following statement as a string:
        /// ```sql
        #[doc = include_str!(concat!("sql/", stringify!($name), ".sql"))]
        ///```
        pub const fn $name() -> &'static str {
            include_str!(concat!("sql/", stringify!($name), ".sql"))
        }
    };
}

sql!(set_wal, "Set write-ahead log");

sql!(get_table_schema, "Get the schema of a table");

sql!(insert_original_file, "Insert a new original file row");

sql!(
    update_original_file_identification,
    "Update the identification fields of an original file row"
);

sql!(
    update_original_file_relative_path,
    "Update the relative path of an original file row, as part of a rename"
);

sql!(
    update_original_file_action,
    "Update the action and action data of an original file row"
);

sql!(delete_original_file, "Delete an original file row");

sql!(
    select_original_file_by_uuid,
    "Select an original file row by uuid"
);

sql!(
    select_original_file_by_relative_path,
    "Select an original file row by relative path"
);

sql!(insert_event, "Append a row to the event log");

sql!(
    select_events_in_range,
    "Select events with a time in an inclusive range, most recent first"
);

sql!(
    select_events_filtered,
    "Select events filtered by operation and uuid, in either time order"
);

sql!(get_metadata, "Get a metadata value by key");

sql!(set_metadata, "Set a metadata value, overwriting any existing value");
