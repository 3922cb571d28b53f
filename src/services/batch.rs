use crate::models::{Batch, MediaFile};

/// Splits `files` into consecutive batches of `capacity`, keeping discovery order.
/// Only the last batch may be short.
pub fn partition(files: Vec<MediaFile>, capacity: usize) -> Vec<Batch> {
    let capacity = capacity.max(1);
    let mut batches = Vec::with_capacity(files.len().div_ceil(capacity));
    let mut current = Vec::with_capacity(capacity);

    for file in files {
        current.push(file);
        if current.len() == capacity {
            batches.push(Batch {
                index: batches.len() + 1,
                files: std::mem::replace(&mut current, Vec::with_capacity(capacity)),
            });
        }
    }

    if !current.is_empty() {
        batches.push(Batch {
            index: batches.len() + 1,
            files: current,
        });
    }

    batches
}
