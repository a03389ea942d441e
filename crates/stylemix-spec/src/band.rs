//! Semantic band names and a fixed-size per-band container.
//!
//! A style embedding is partitioned positionally into five bands, always in
//! the order style, color, content, structure, texture.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Number of semantic bands an embedding is split into.
pub const BAND_COUNT: usize = 5;

/// One of the five positional semantic bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandName {
    /// Overall artistic style.
    Style,
    /// Color palette.
    Color,
    /// Semantic content.
    Content,
    /// Structural layout.
    Structure,
    /// Surface texture and fine detail.
    Texture,
}

impl BandName {
    /// All bands in positional order.
    pub const ALL: [BandName; BAND_COUNT] = [
        BandName::Style,
        BandName::Color,
        BandName::Content,
        BandName::Structure,
        BandName::Texture,
    ];

    /// Positional index of the band (0 for style, 4 for texture).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            BandName::Style => 0,
            BandName::Color => 1,
            BandName::Content => 2,
            BandName::Structure => 3,
            BandName::Texture => 4,
        }
    }

    /// Returns the snake_case name used in documents and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            BandName::Style => "style",
            BandName::Color => "color",
            BandName::Content => "content",
            BandName::Structure => "structure",
            BandName::Texture => "texture",
        }
    }

    /// Fixed prompt an auxiliary text encoder is run on for this band.
    pub fn prompt(self) -> &'static str {
        match self {
            BandName::Style => "artistic style",
            BandName::Color => "color palette",
            BandName::Content => "semantic content",
            BandName::Structure => "structural layout",
            BandName::Texture => "surface texture",
        }
    }

    /// Name of the weight parameter that scales this band.
    pub fn weight_param(self) -> &'static str {
        match self {
            BandName::Style => "style_weight",
            BandName::Color => "color_weight",
            BandName::Content => "content_weight",
            BandName::Structure => "structure_weight",
            BandName::Texture => "texture_weight",
        }
    }
}

impl fmt::Display for BandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BandName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BandName::ALL
            .into_iter()
            .find(|band| band.as_str() == s)
            .ok_or_else(|| format!("unknown band: {}", s))
    }
}

/// One value per band, indexed by [`BandName`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BandMap<T> {
    values: [T; BAND_COUNT],
}

impl<T> BandMap<T> {
    /// Builds a map from values given in positional band order.
    pub fn from_array(values: [T; BAND_COUNT]) -> Self {
        Self { values }
    }

    /// Builds a map by evaluating `f` for every band in order.
    pub fn from_fn(mut f: impl FnMut(BandName) -> T) -> Self {
        Self {
            values: BandName::ALL.map(&mut f),
        }
    }

    /// Builds a map from a fallible per-band constructor, stopping at the first error.
    pub fn try_from_fn<E>(mut f: impl FnMut(BandName) -> Result<T, E>) -> Result<Self, E> {
        let mut values = Vec::with_capacity(BAND_COUNT);
        for band in BandName::ALL {
            values.push(f(band)?);
        }
        match values.try_into() {
            Ok(values) => Ok(Self { values }),
            Err(_) => unreachable!("exactly BAND_COUNT values were pushed"),
        }
    }

    /// Iterates `(band, value)` pairs in positional order.
    pub fn iter(&self) -> impl Iterator<Item = (BandName, &T)> {
        BandName::ALL.into_iter().zip(self.values.iter())
    }

    /// Iterates values in positional order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Maps every value, keeping band positions.
    pub fn map<U>(&self, mut f: impl FnMut(BandName, &T) -> U) -> BandMap<U> {
        BandMap::from_fn(|band| f(band, &self.values[band.index()]))
    }

    /// Consumes the map, returning values in positional order.
    pub fn into_array(self) -> [T; BAND_COUNT] {
        self.values
    }
}

impl<T> Index<BandName> for BandMap<T> {
    type Output = T;

    #[inline]
    fn index(&self, band: BandName) -> &T {
        &self.values[band.index()]
    }
}

impl<T> IndexMut<BandName> for BandMap<T> {
    #[inline]
    fn index_mut(&mut self, band: BandName) -> &mut T {
        &mut self.values[band.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_order_matches_index() {
        for (i, band) in BandName::ALL.iter().enumerate() {
            assert_eq!(band.index(), i);
        }
    }

    #[test]
    fn test_band_name_round_trip() {
        for band in BandName::ALL {
            assert_eq!(band.as_str().parse::<BandName>().unwrap(), band);
        }
        assert!("shape".parse::<BandName>().is_err());
    }

    #[test]
    fn test_band_serde_snake_case() {
        let json = serde_json::to_string(&BandName::Structure).unwrap();
        assert_eq!(json, "\"structure\"");
    }

    #[test]
    fn test_band_map_indexing() {
        let mut map = BandMap::from_fn(|band| band.index() * 10);
        assert_eq!(map[BandName::Content], 20);
        map[BandName::Texture] = 7;
        assert_eq!(map.into_array(), [0, 10, 20, 30, 7]);
    }

    #[test]
    fn test_try_from_fn_stops_at_first_error() {
        let mut visited = Vec::new();
        let result: Result<BandMap<usize>, String> = BandMap::try_from_fn(|band| {
            visited.push(band);
            if band == BandName::Content {
                Err("bad".to_string())
            } else {
                Ok(band.index())
            }
        });
        assert!(result.is_err());
        assert_eq!(visited.len(), 3);
    }

    #[test]
    fn test_prompts_are_distinct() {
        let mut prompts: Vec<_> = BandName::ALL.iter().map(|b| b.prompt()).collect();
        prompts.sort();
        prompts.dedup();
        assert_eq!(prompts.len(), BAND_COUNT);
    }
}
