//! File system layer for rootview.
//!
//! Path confinement (`resolve`), directory listing (`listing`), the
//! per-entry view ([`entry::DirEntryView`]) and the entry operations used by
//! the front ends ([`ops`]).

pub mod entry;
pub mod listing;
pub mod ops;
pub mod resolve;

pub use entry::DirEntryView;
pub use listing::{format_size, list_directory, Listing};
pub use ops::{
    copy_into, create_folder, delete_entry, entry_details, rename_entry, sanitize_file_name,
    save_upload, EntryDetails,
};
pub use resolve::{resolve, resolve_child, resolve_entry, ResolvedPath, Root};
