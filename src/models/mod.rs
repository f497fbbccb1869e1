//! Data models for brandscope.

mod brand;
mod frame;
mod occurrence;

pub use brand::{BrandEntry, BrandKeywordTable, BrandTableError};
pub use frame::{
    find_frame_image, frame_file_stem, frame_index, frame_time_secs, image_stem, result_label,
    Frame, IMAGE_EXTENSIONS, RESULT_SUFFIX,
};
pub use occurrence::{
    MatchLog, MatchRecord, MatrixError, OccurrenceMatrix, OccurrenceRow, TotalsRow,
    SENTINEL_FRAME,
};
