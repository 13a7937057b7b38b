use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

/// Compression algorithms a field can be stored with. When a field is wrapped, the algorithm is
/// recorded as the single tag byte that follows the extension header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Store the field as-is.
    #[default]
    None,
    /// zstandard, for high compression ratios.
    Zstd,
    /// lz4 block compression, for speed.
    Lz4,
}

impl Algorithm {
    /// Every algorithm, ordered by tag.
    pub const ALL: [Algorithm; 3] = [Algorithm::None, Algorithm::Zstd, Algorithm::Lz4];

    pub fn tag(self) -> u8 {
        self.into()
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::None => "none",
            Algorithm::Zstd => "zstd",
            Algorithm::Lz4 => "lz4",
        }
    }
}

impl From<Algorithm> for u8 {
    fn from(val: Algorithm) -> u8 {
        match val {
            Algorithm::None => 0,
            Algorithm::Zstd => 1,
            Algorithm::Lz4 => 2,
        }
    }
}

impl TryFrom<u8> for Algorithm {
    type Error = u8;
    fn try_from(val: u8) -> Result<Algorithm, u8> {
        match val {
            0 => Ok(Algorithm::None),
            1 => Ok(Algorithm::Zstd),
            2 => Ok(Algorithm::Lz4),
            _ => Err(val),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags() {
        for (i, alg) in Algorithm::ALL.iter().enumerate() {
            assert_eq!(alg.tag() as usize, i);
            assert_eq!(Algorithm::try_from(alg.tag()), Ok(*alg));
        }
        assert_eq!(Algorithm::try_from(3), Err(3));
        assert_eq!(Algorithm::try_from(0xff), Err(0xff));
    }

    #[test]
    fn serde_names() {
        let algs: Vec<Algorithm> = serde_json::from_str(r#"["none", "zstd", "lz4"]"#).unwrap();
        assert_eq!(algs, Algorithm::ALL.to_vec());
        assert_eq!(serde_json::to_string(&Algorithm::Lz4).unwrap(), r#""lz4""#);
        serde_json::from_str::<Algorithm>(r#""brotli""#).unwrap_err();
    }
}
