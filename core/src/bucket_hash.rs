//! Map a site tag to the storage bucket that holds its override.
//!
//! The backing store only tolerates a few hundred top-level keys, so tags are spread over a fixed
//! number of buckets with a classic 31 polynomial string hash.  The hash and the modulus are part
//! of the persisted format: changing either makes every previously saved override unreachable.

use std::fmt;

/// Number of buckets.  Prime so the polynomial hash spreads evenly, sized so ~100 saved tags
/// leave only a handful of entries per bucket.
pub const BUCKET_MODULUS: u32 = 419;

/// Prefix of every bucket key in the backing store.
pub const BUCKET_PREFIX: &str = "tag_";

/// 32 bit signed polynomial hash (`hash * 31 + unit`) over the UTF-16 code units of tag.
/// Overflow wraps, this must stay bit exact with data already in storage.
pub fn string_hash(tag: &str) -> i32 {
    tag.encode_utf16().fold(0_i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(unit as i32)
    })
}

/// Return the bucket number (in `[0, BUCKET_MODULUS)`) for tag.
pub fn bucket_index(tag: &str) -> u32 {
    // unsigned_abs so i32::MIN maps to 2^31 rather than overflowing.
    string_hash(tag).unsigned_abs() % BUCKET_MODULUS
}

/// Return the bucket identifier for tag.
pub fn bucket_of(tag: &str) -> BucketId {
    BucketId(bucket_index(tag))
}

/// Identifies one bucket, renders as the store key `tag_<n>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId(u32);

impl BucketId {
    /// The numeric bucket.
    pub fn index(&self) -> u32 {
        self.0
    }

    /// The key used for this bucket in the backing store.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Parse a backing store key back into a bucket id.
    /// Returns None for keys that are not bucket keys (the defaults entry for instance).
    pub fn parse(key: &str) -> Option<Self> {
        let digits = key.strip_prefix(BUCKET_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index: u32 = digits.parse().ok()?;
        if index < BUCKET_MODULUS && index.to_string() == digits {
            Some(Self(index))
        } else {
            None
        }
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", BUCKET_PREFIX, self.0)
    }
}
