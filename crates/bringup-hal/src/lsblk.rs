//! Parsing of `lsblk --json` output.

use crate::block::BlockDevice;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Arguments for a whole-disk inventory query.
///
/// `--paths` makes `name` a full `/dev/...` path, `--nodeps` drops partitions,
/// and `--exclude 7` removes loop devices (major number 7).
pub fn lsblk_args(exclude_virtual: bool) -> Vec<&'static str> {
    let mut args = vec![
        "--json",
        "--paths",
        "--nodeps",
        "--bytes",
        "--output",
        "NAME,TYPE,SIZE,MODEL,RM,TRAN",
    ];
    if exclude_virtual {
        args.extend(["--exclude", "7"]);
    }
    args
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
struct LsBlkDevice {
    name: String,

    #[serde(rename = "type")]
    device_type: String,

    #[serde(default, deserialize_with = "deserialize_size")]
    size: u64,

    #[serde(default)]
    model: Option<String>,

    /// Whether the device is removable. USB SSDs may still report `false`.
    #[serde(default, rename = "rm", deserialize_with = "deserialize_rm")]
    removable: bool,

    #[serde(default, rename = "tran")]
    transport: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LsBlkOutput {
    #[serde(rename = "blockdevices")]
    block_devices: Vec<LsBlkDevice>,
}

/// Parse lsblk JSON into devices, keeping enumeration order.
///
/// With `exclude_virtual` set, loop/ram/dm/md/optical devices are dropped even
/// if the `--exclude` filter let them through.
pub fn parse_lsblk_output(
    input: &[u8],
    exclude_virtual: bool,
) -> Result<Vec<BlockDevice>, serde_json::Error> {
    let output: LsBlkOutput = serde_json::from_slice(input)?;
    Ok(output
        .block_devices
        .into_iter()
        .filter(|dev| !exclude_virtual || !matches!(dev.device_type.as_str(), "loop" | "rom"))
        .map(|dev| BlockDevice {
            path: dev.name,
            size_bytes: dev.size,
            model: dev
                .model
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            transport: dev.transport.filter(|t| !t.is_empty()),
            removable: dev.removable,
        })
        .filter(|dev| !exclude_virtual || !dev.is_virtual())
        .collect())
}

/// Deserialize the "rm" field: "0"/"1" in older lsblk, a real bool in newer.
fn deserialize_rm<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrBool;

    impl<'de> Visitor<'de> for StringOrBool {
        type Value = bool;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("string or bool")
        }

        fn visit_str<E>(self, value: &str) -> Result<bool, E>
        where
            E: de::Error,
        {
            match value {
                "0" => Ok(false),
                "1" => Ok(true),
                _ => Err(de::Error::custom("expected either '0' or '1'")),
            }
        }

        fn visit_bool<E>(self, value: bool) -> Result<bool, E>
        where
            E: de::Error,
        {
            Ok(value)
        }
    }

    deserializer.deserialize_any(StringOrBool)
}

/// Deserialize the "size" field: a quoted number in older lsblk, a number in newer.
fn deserialize_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrU64;

    impl<'de> Visitor<'de> for StringOrU64 {
        type Value = u64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("string or u64")
        }

        fn visit_str<E>(self, value: &str) -> Result<u64, E>
        where
            E: de::Error,
        {
            FromStr::from_str(value).map_err(|_| de::Error::custom("cannot parse string as u64"))
        }

        fn visit_u64<E>(self, value: u64) -> Result<u64, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_unit<E>(self) -> Result<u64, E>
        where
            E: de::Error,
        {
            Ok(0)
        }
    }

    deserializer.deserialize_any(StringOrU64)
}
