//! Lossless serde encoding for paths.
//!
//! Unix file names are arbitrary bytes, which serde_json refuses for a plain
//! `PathBuf`. UTF-8 paths serialize as ordinary strings. Anything else becomes
//! `{"hex": "<raw bytes>", "display": "<lossy form>"}` and decodes from the
//! hex alone. Use with `#[serde(with = "crate::io::raw_path")]`, or the
//! `option` and `vec` submodules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Encoded {
    Utf8(String),
    Raw {
        #[serde(with = "hex")]
        hex: Vec<u8>,
        #[serde(default)]
        display: String,
    },
}

fn encode(path: &Path) -> Encoded {
    match path.to_str() {
        Some(s) => Encoded::Utf8(s.to_string()),
        None => Encoded::Raw {
            hex: path.as_os_str().as_bytes().to_vec(),
            display: path.to_string_lossy().into_owned(),
        },
    }
}

fn decode(encoded: Encoded) -> PathBuf {
    match encoded {
        Encoded::Utf8(s) => PathBuf::from(s),
        Encoded::Raw { hex, .. } => PathBuf::from(OsString::from_vec(hex)),
    }
}

/// Raw bytes of a path, for storage columns
pub fn to_bytes(path: &Path) -> Vec<u8> {
    path.as_os_str().as_bytes().to_vec()
}

pub fn from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(OsString::from_vec(bytes))
}

pub fn serialize<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    encode(path).serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
    Encoded::deserialize(deserializer).map(decode)
}

pub mod option {
    use super::{decode, encode, Encoded};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::path::PathBuf;

    pub fn serialize<S: Serializer>(path: &Option<PathBuf>, serializer: S) -> Result<S::Ok, S::Error> {
        path.as_deref().map(encode).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<PathBuf>, D::Error> {
        Ok(Option::<Encoded>::deserialize(deserializer)?.map(decode))
    }
}

pub mod vec {
    use super::{decode, encode, Encoded};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::path::PathBuf;

    pub fn serialize<S: Serializer>(paths: &[PathBuf], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(paths.iter().map(|p| encode(p)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<PathBuf>, D::Error> {
        Ok(Vec::<Encoded>::deserialize(deserializer)?
            .into_iter()
            .map(decode)
            .collect())
    }
}
