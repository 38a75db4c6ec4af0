//! Participant identity: display colors and aliases.
//!
//! Two policies are supported:
//!
//! - **Static**: a fixed table of known participants. Table order is the
//!   legend order, and unknown ids fall back to a shared color and alias.
//! - **Dynamic**: colors are drawn round-robin from a palette the first time
//!   an id is seen. Legend order is first-seen order. Once the palette is
//!   exhausted colors repeat.
//!
//! A registry is built once per session and handed to every consumer by
//! reference; recreating it would reshuffle dynamic assignments.

use crate::config::{IdentityConfig, IdentityEntry};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Participant identifier (the first path component of a photo or track).
pub type ParticipantId = String;

/// An sRGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Hex form, always `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parses `#rgb` or `#rrggbb` (the leading `#` is optional).
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || Error::InvalidColor(s.to_string());
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                // #888 -> #888888
                let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// ColorBrewer Set1, the default dynamic palette.
pub const SET1_PALETTE: [Color; 9] = [
    Color::rgb(0xe4, 0x1a, 0x1c),
    Color::rgb(0x37, 0x7e, 0xb8),
    Color::rgb(0x4d, 0xaf, 0x4a),
    Color::rgb(0x98, 0x4e, 0xa3),
    Color::rgb(0xff, 0x7f, 0x00),
    Color::rgb(0xff, 0xff, 0x33),
    Color::rgb(0xa6, 0x56, 0x28),
    Color::rgb(0xf7, 0x81, 0xbf),
    Color::rgb(0x99, 0x99, 0x99),
];

/// One row of the map legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub participant: ParticipantId,
    pub color: Color,
    pub label: String,
}

#[derive(Debug, Clone)]
enum Policy {
    Static {
        entries: Vec<IdentityEntry>,
        lookup: HashMap<ParticipantId, usize>,
        fallback_color: Color,
        fallback_alias: String,
    },
    Dynamic {
        palette: Vec<Color>,
        assigned: IndexMap<ParticipantId, Color>,
    },
}

/// Maps participants to stable display colors for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    policy: Policy,
}

impl IdentityRegistry {
    /// Build a static registry. Fails if two entries share an id or a color,
    /// or if an entry uses the fallback color.
    pub fn with_table(
        entries: Vec<IdentityEntry>,
        fallback_color: Color,
        fallback_alias: impl Into<String>,
    ) -> Result<Self> {
        let mut lookup = HashMap::with_capacity(entries.len());
        let mut colors: HashMap<Color, &str> = HashMap::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            if lookup.insert(entry.participant.clone(), i).is_some() {
                return Err(Error::Config(format!(
                    "participant {} listed twice in identity table",
                    entry.participant
                )));
            }
            if let Some(first) = colors.insert(entry.color, &entry.participant) {
                return Err(Error::DuplicateColor {
                    color: entry.color.to_hex(),
                    first: first.to_string(),
                    second: entry.participant.clone(),
                });
            }
        }
        // Unknown participants must stay distinguishable from known ones
        if let Some(owner) = colors.get(&fallback_color) {
            return Err(Error::DuplicateColor {
                color: fallback_color.to_hex(),
                first: owner.to_string(),
                second: "fallback".to_string(),
            });
        }

        Ok(Self {
            policy: Policy::Static {
                entries,
                lookup,
                fallback_color,
                fallback_alias: fallback_alias.into(),
            },
        })
    }

    /// Build a dynamic registry drawing from `palette` in order.
    pub fn with_palette(palette: Vec<Color>) -> Result<Self> {
        if palette.is_empty() {
            return Err(Error::Config("dynamic palette must not be empty".into()));
        }
        Ok(Self {
            policy: Policy::Dynamic {
                palette,
                assigned: IndexMap::new(),
            },
        })
    }

    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        match config {
            IdentityConfig::Static {
                entries,
                fallback_color,
                fallback_alias,
            } => Self::with_table(entries.clone(), *fallback_color, fallback_alias.clone()),
            IdentityConfig::Dynamic { palette } => Self::with_palette(palette.clone()),
        }
    }

    /// Color for `participant`.
    ///
    /// Under the dynamic policy the first lookup of a new id assigns the next
    /// palette color; later lookups return the same color.
    pub fn color_of(&mut self, participant: &str) -> Color {
        match &mut self.policy {
            Policy::Static {
                entries,
                lookup,
                fallback_color,
                ..
            } => lookup
                .get(participant)
                .map_or(*fallback_color, |&i| entries[i].color),
            Policy::Dynamic { palette, assigned } => {
                if let Some(color) = assigned.get(participant) {
                    return *color;
                }
                let color = palette[assigned.len() % palette.len()];
                if assigned.len() >= palette.len() {
                    debug!(
                        "[Identity] palette exhausted, {} reuses {}",
                        participant, color
                    );
                }
                assigned.insert(participant.to_string(), color);
                color
            }
        }
    }

    /// Color for `participant` without assigning one.
    pub fn peek_color(&self, participant: &str) -> Option<Color> {
        match &self.policy {
            Policy::Static {
                entries,
                lookup,
                fallback_color,
                ..
            } => Some(lookup.get(participant).map_or(*fallback_color, |&i| entries[i].color)),
            Policy::Dynamic { assigned, .. } => assigned.get(participant).copied(),
        }
    }

    /// Display name: the table alias, the fallback alias, or the id itself.
    pub fn display_name(&self, participant: &str) -> String {
        match &self.policy {
            Policy::Static {
                entries,
                lookup,
                fallback_alias,
                ..
            } => lookup
                .get(participant)
                .and_then(|&i| entries[i].alias.clone())
                .unwrap_or_else(|| fallback_alias.clone()),
            Policy::Dynamic { .. } => participant.to_string(),
        }
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        match &self.policy {
            Policy::Static { entries, .. } => entries
                .iter()
                .map(|e| LegendEntry {
                    participant: e.participant.clone(),
                    color: e.color,
                    label: e.alias.clone().unwrap_or_else(|| e.participant.clone()),
                })
                .collect(),
            Policy::Dynamic { assigned, .. } => assigned
                .iter()
                .map(|(id, color)| LegendEntry {
                    participant: id.clone(),
                    color: *color,
                    label: id.clone(),
                })
                .collect(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.policy, Policy::Dynamic { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, hex: &str, alias: &str) -> IdentityEntry {
        IdentityEntry {
            participant: id.to_string(),
            color: hex.parse().unwrap(),
            alias: Some(alias.to_string()),
        }
    }

    #[test]
    fn test_color_parse_and_format() {
        let c: Color = "#e41a1c".parse().unwrap();
        assert_eq!(c, Color::rgb(0xe4, 0x1a, 0x1c));
        assert_eq!(c.to_hex(), "#e41a1c");

        let short: Color = "#888".parse().unwrap();
        assert_eq!(short.to_hex(), "#888888");

        assert!("#12345".parse::<Color>().is_err());
        assert!("#gggggg".parse::<Color>().is_err());
    }

    #[test]
    fn test_color_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::rgb(0x37, 0x7e, 0xb8)).unwrap();
        assert_eq!(json, "\"#377eb8\"");
        let back: Color = serde_json::from_str("\"#4daf4a\"").unwrap();
        assert_eq!(back, Color::rgb(0x4d, 0xaf, 0x4a));
        assert!(serde_json::from_str::<Color>("\"blue\"").is_err());
    }

    #[test]
    fn test_static_policy_lookup_and_fallback() {
        let mut reg = IdentityRegistry::with_table(
            vec![
                entry("suzuki", "#e41a1c", "Apple"),
                entry("kato", "#377eb8", "Blueberry"),
            ],
            "#888".parse().unwrap(),
            "Unknown",
        )
        .unwrap();

        assert_eq!(reg.color_of("kato").to_hex(), "#377eb8");
        assert_eq!(reg.color_of("nobody").to_hex(), "#888888");
        assert_eq!(reg.display_name("suzuki"), "Apple");
        assert_eq!(reg.display_name("nobody"), "Unknown");
        assert!(!reg.is_dynamic());
    }

    #[test]
    fn test_static_policy_legend_follows_table_order() {
        let mut reg = IdentityRegistry::with_table(
            vec![
                entry("suzuki", "#e41a1c", "Apple"),
                entry("kato", "#377eb8", "Blueberry"),
                entry("shen", "#4daf4a", "Cabbage"),
            ],
            "#888".parse().unwrap(),
            "Unknown",
        )
        .unwrap();

        // Lookup order must not affect legend order
        reg.color_of("shen");
        reg.color_of("kato");

        let ids: Vec<_> = reg.legend().into_iter().map(|e| e.participant).collect();
        assert_eq!(ids, vec!["suzuki", "kato", "shen"]);
    }

    #[test]
    fn test_static_policy_rejects_duplicate_colors() {
        let err = IdentityRegistry::with_table(
            vec![entry("a", "#e41a1c", "A"), entry("b", "#E41A1C", "B")],
            "#888".parse().unwrap(),
            "Unknown",
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateColor { .. }));
    }

    #[test]
    fn test_static_policy_rejects_fallback_color_in_table() {
        let err = IdentityRegistry::with_table(
            vec![entry("kato", "#377eb8", "Blueberry"), entry("grey", "#888888", "Grey")],
            "#888".parse().unwrap(),
            "Unknown",
        )
        .unwrap_err();
        match err {
            Error::DuplicateColor { color, first, second } => {
                assert_eq!(color, "#888888");
                assert_eq!(first, "grey");
                assert_eq!(second, "fallback");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_default_static_table_has_distinct_colors() {
        let reg = IdentityRegistry::from_config(&IdentityConfig::default()).unwrap();
        let legend = reg.legend();
        for (i, a) in legend.iter().enumerate() {
            for b in &legend[i + 1..] {
                assert_ne!(a.color, b.color, "{} and {}", a.participant, b.participant);
            }
        }
    }

    #[test]
    fn test_dynamic_policy_first_seen_order() {
        let mut reg = IdentityRegistry::with_palette(SET1_PALETTE.to_vec()).unwrap();
        assert_eq!(reg.peek_color("kato"), None);

        let kato = reg.color_of("kato");
        let shen = reg.color_of("shen");
        assert_eq!(kato, SET1_PALETTE[0]);
        assert_eq!(shen, SET1_PALETTE[1]);

        // Repeated lookups are idempotent
        assert_eq!(reg.color_of("kato"), kato);
        assert_eq!(reg.color_of("kato"), kato);

        let legend = reg.legend();
        assert_eq!(legend.len(), 2);
        assert_eq!(legend[0].participant, "kato");
        assert_eq!(legend[1].participant, "shen");
        assert_eq!(reg.display_name("shen"), "shen");
    }

    #[test]
    fn test_dynamic_policy_distinct_until_palette_wraps() {
        let palette: Vec<Color> = SET1_PALETTE[..3].to_vec();
        let mut reg = IdentityRegistry::with_palette(palette.clone()).unwrap();

        let colors: Vec<Color> = ["a", "b", "c", "d"].iter().map(|id| reg.color_of(id)).collect();
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert_ne!(colors[0], colors[2]);
        // Fourth id wraps back to the first palette color
        assert_eq!(colors[3], palette[0]);
    }

    #[test]
    fn test_dynamic_policy_rejects_empty_palette() {
        assert!(IdentityRegistry::with_palette(vec![]).is_err());
    }
}
