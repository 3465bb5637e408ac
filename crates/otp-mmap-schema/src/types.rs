//! Partition and item names.
//!
//! Both serialize as plain strings so the template context stays flat.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! name_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}

name_newtype!(
    /// Name of a partition, unique within a memory map.
    PartitionName
);

name_newtype!(
    /// Name of an item, unique across all partitions of a memory map.
    ItemName
);

impl PartitionName {
    /// Name of the digest slot reserved at the end of this partition.
    pub fn digest_name(&self) -> ItemName {
        ItemName::new(format!("{}_DIGEST", self.0))
    }
}
