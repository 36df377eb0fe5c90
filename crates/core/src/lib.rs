mod apply;
mod discovery;
mod error;
mod metadata;
mod planner;

pub use apply::{apply_plan, apply_plan_with_options, ApplyOptions, ApplyResult, TEMP_PREFIX};
pub use discovery::{
    find_images, inspect_folder, is_recognized_image, sort_by_creation, supported_formats,
    RECOGNIZED_EXTENSIONS,
};
pub use error::{RenameError, RenamePhase};
pub use metadata::{creation_timestamp, ImageFile, TimestampSource};
pub use planner::{
    generate_plan, plan_folder, sequential_name, RenameCandidate, RenamePlan, RenameStats,
};
