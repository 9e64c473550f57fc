pub mod features_csv;
pub mod interleave;
pub mod select;

pub use features_csv::write_features_csv;
pub use interleave::interleave_logs;
pub use select::{select_path, write_indented};
