//! Buckets: server-side byte blobs keyed by a small id, used to move variable-length data that
//! does not fit in a command (shader sources, info logs, strings).

use std::collections::{HashMap, TryReserveError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Bucket {
    data: Vec<u8>,
}

impl Bucket {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Resizes the bucket, zero-filling any new bytes. The bucket is unchanged if the memory
    /// cannot be reserved.
    pub fn set_size(&mut self, size: usize) -> Result<(), TryReserveError> {
        if let Some(extra) = size.checked_sub(self.data.len()) {
            self.data.try_reserve_exact(extra)?;
        }
        self.data.resize(size, 0);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn data(&self, offset: usize, size: usize) -> Option<&[u8]> {
        let end = offset.checked_add(size)?;
        self.data.get(offset..end)
    }

    /// Copies `src` into the bucket at `offset`. The bucket does not grow; the range must already
    /// fit.
    pub fn set_data(&mut self, offset: usize, src: &[u8]) -> bool {
        let Some(end) = offset.checked_add(src.len()) else {
            return false;
        };
        match self.data.get_mut(offset..end) {
            Some(dst) => {
                dst.copy_from_slice(src);
                true
            }
            None => false,
        }
    }

    /// Stores `s` followed by a terminating NUL.
    pub fn set_from_string(&mut self, s: &str) {
        self.data.clear();
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
    }

    /// Reads the bucket as a string up to the first NUL. Returns `None` when the bytes are not
    /// valid UTF-8.
    pub fn as_string(&self) -> Option<String> {
        let end = self
            .data
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.data.len());
        String::from_utf8(self.data[..end].to_vec()).ok()
    }
}

#[derive(Debug, Default)]
pub struct BucketTable {
    buckets: HashMap<u32, Bucket>,
}

impl BucketTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bucket for `id`, creating an empty one if needed.
    pub fn create(&mut self, id: u32) -> &mut Bucket {
        self.buckets.entry(id).or_default()
    }

    pub fn get(&self, id: u32) -> Option<&Bucket> {
        self.buckets.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Bucket> {
        self.buckets.get_mut(&id)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trip_stops_at_nul() {
        let mut table = BucketTable::new();
        table.create(3).set_from_string("hello");
        let bucket = table.get(3).expect("created");
        assert_eq!(bucket.size(), 6);
        assert_eq!(bucket.as_string().as_deref(), Some("hello"));
    }

    #[test]
    fn data_ranges_are_checked() {
        let mut bucket = Bucket::default();
        bucket.set_size(4).expect("small bucket");
        assert!(bucket.set_data(1, &[1, 2, 3]));
        assert!(!bucket.set_data(2, &[1, 2, 3]));
        assert!(!bucket.set_data(usize::MAX, &[1]));
        assert_eq!(bucket.data(0, 4), Some(&[0, 1, 2, 3][..]));
        assert_eq!(bucket.data(3, 2), None);
    }

    #[test]
    fn unterminated_strings_use_whole_bucket() {
        let mut bucket = Bucket::default();
        bucket.set_size(3).expect("small bucket");
        assert!(bucket.set_data(0, b"abc"));
        assert_eq!(bucket.as_string().as_deref(), Some("abc"));
    }

    #[test]
    fn impossible_sizes_leave_the_bucket_alone() {
        let mut bucket = Bucket::default();
        bucket.set_size(2).expect("small bucket");
        assert!(bucket.set_size(usize::MAX).is_err());
        assert_eq!(bucket.size(), 2);

        bucket.set_size(1).expect("shrinking");
        assert_eq!(bucket.size(), 1);
    }

    #[test]
    fn get_does_not_create() {
        let mut table = BucketTable::new();
        assert!(table.get(1).is_none());
        table.create(1);
        assert!(table.get_mut(1).is_some());
    }
}
