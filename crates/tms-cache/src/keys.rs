//! Cache key scheme
//!
//! Keys are partitioned by resource kind:
//! - `<kind>:id:<id>` for a single record
//! - `<kind>:page:<page>:size:<size>` for one page of a listing
//!
//! Any mutation of a kind invalidates everything under `<kind>:`.

pub const DEPARTMENT: &str = "department";
pub const COURSE: &str = "course";
pub const TRAINING_PLAN: &str = "training-plan";

/// Every cacheable resource kind
pub const KINDS: [&str; 3] = [DEPARTMENT, COURSE, TRAINING_PLAN];

pub fn id_key(kind: &str, id: i64) -> String {
    format!("{kind}:id:{id}")
}

pub fn page_key(kind: &str, page: i64, size: i64) -> String {
    format!("{kind}:page:{page}:size:{size}")
}

pub fn kind_prefix(kind: &str) -> String {
    format!("{kind}:")
}

/// Redis glob matching every key under `prefix`
pub fn glob_for_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}
