pub use registrar_models::lessons::*;
pub use registrar_models::scheduling::{
    BookedLesson, ConflictKind, TimeSlot, expand_occurrences, find_conflict,
};
