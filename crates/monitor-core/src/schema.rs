//! Explicit channel schema of the refrigerator log.
//!
//! Column names are fixed per device. Rather than scattering them as
//! constants, every consumer receives a [`ChannelSchema`], which makes the
//! pipeline testable against synthetic schemas.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// What a channel measures; drives display precision and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Kelvin.
    Temperature,
    /// mbar, shown in scientific notation.
    Pressure,
    /// Auxiliary pressure gauges K3..K8.
    PressureSensor,
    /// Turbo pump speed in percent.
    TurboSpeed,
    /// Ohm.
    Resistance,
    /// Mixture percentage.
    Mixture,
    /// On/off flag where `1` means on.
    Status,
}

/// A single named measurement column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Exact (trimmed) column header in the data file.
    pub name: String,
    /// Human-readable label used in reports.
    pub alias: String,
    /// Physical unit, if any.
    #[serde(default)]
    pub unit: Option<String>,
    pub kind: ChannelKind,
}

impl Channel {
    pub fn new(name: &str, alias: &str, unit: Option<&str>, kind: ChannelKind) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.to_string(),
            unit: unit.map(str::to_string),
            kind,
        }
    }

    /// `"alias (unit)"` unless the alias already names the unit.
    pub fn label(&self) -> String {
        match &self.unit {
            Some(unit) if !self.alias.contains(&format!("({unit})")) => {
                format!("{} ({})", self.alias, unit)
            }
            _ => self.alias.clone(),
        }
    }
}

/// A titled set of related channels shown together on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelGroup {
    pub title: String,
    pub channels: Vec<Channel>,
}

/// A valve column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valve {
    pub name: String,
    /// Pixel coordinates of the valve marker on the fridge diagram.
    ///
    /// Only carried so schema files stay interchangeable with diagram
    /// renderers; the terminal dashboard does not read it. Defaults to
    /// `(0, 0)` when a schema file leaves it out.
    #[serde(default)]
    pub position: (u32, u32),
}

/// Column layout of one device's log files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSchema {
    /// Header of the `HH:MM:SS` clock column.
    pub time_column: String,
    pub groups: Vec<ChannelGroup>,
    #[serde(default)]
    pub valves: Vec<Valve>,
    /// Channel names summarized in the periodic report.
    pub report_channels: Vec<String>,
}

impl Default for ChannelSchema {
    fn default() -> Self {
        Self::dspx()
    }
}

impl ChannelSchema {
    /// The Dspx dilution refrigerator.
    pub fn dspx() -> Self {
        use ChannelKind::*;

        let temperatures = vec![
            Channel::new("full range", "MC (K)", Some("K"), Temperature),
            Channel::new("still", "Still (K)", Some("K"), Temperature),
            Channel::new("Platine 4K", "4K (K)", Some("K"), Temperature),
        ];
        let report_channels = temperatures.iter().map(|c| c.name.clone()).collect();

        let groups = vec![
            ChannelGroup {
                title: "Temperatures (K)".to_string(),
                channels: temperatures,
            },
            ChannelGroup {
                title: "Pressure (mbar)".to_string(),
                channels: ["P1", "P2", "P3"]
                    .iter()
                    .map(|n| Channel::new(n, n, Some("mbar"), Pressure))
                    .collect(),
            },
            ChannelGroup {
                title: "Pressure Sensors (K3-K8)".to_string(),
                channels: ["K3", "K4", "K5", "K6", "K8"]
                    .iter()
                    .map(|n| Channel::new(n, n, None, PressureSensor))
                    .collect(),
            },
            ChannelGroup {
                title: "Turbo Pump Speed (%)".to_string(),
                channels: vec![Channel::new(
                    "Pumping turbo speed",
                    "Pumping turbo speed",
                    Some("%"),
                    TurboSpeed,
                )],
            },
            ChannelGroup {
                title: "Resistance MMR1 (Ohm)".to_string(),
                channels: ["R MMR1 1", "R MMR1 2", "R MMR1 3"]
                    .iter()
                    .map(|n| Channel::new(n, n, Some("Ohm"), Resistance))
                    .collect(),
            },
            ChannelGroup {
                title: "Mixture Percentage (P/T)".to_string(),
                channels: vec![Channel::new("P/T", "P/T", Some("%"), Mixture)],
            },
            ChannelGroup {
                title: "Status".to_string(),
                channels: vec![
                    Channel::new("Turbo AUX", "Turbo AUX", None, Status),
                    Channel::new("PT", "Pulse Tube", None, Status),
                ],
            },
        ];

        let valves = [
            ("VE1", (698, 135)),
            ("VE2", (698, 798)),
            ("VE3", (698, 1319)),
            ("VE5", (71, 1319)),
            ("VE6", (71, 798)),
            ("VE7", (71, 135)),
            ("VE8", (793, 798)),
            ("VE9", (561, 1320)),
            ("VE12", (346, 1126)),
            ("VE13", (257, 798)),
            ("VE14", (380, 798)),
            ("VE16", (258, 1319)),
            ("VE17", (166, 694)),
            ("VE22", (254, 135)),
            ("VE23", (877, 187)),
            ("VE26", (605, 1126)),
            ("VE27", (399, 1320)),
            ("VE28", (967, 1320)),
            ("VE30", (322, 562)),
            ("VE31", (456, 350)),
            ("VE32", (614, 560)),
            ("VE33", (877, 694)),
            ("VE37", (611, 97)),
        ]
        .into_iter()
        .map(|(name, position)| Valve {
            name: name.to_string(),
            position,
        })
        .collect();

        Self {
            time_column: "heures".to_string(),
            groups,
            valves,
            report_channels,
        }
    }

    /// Load a schema from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| MonitorError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        let schema: Self = serde_json::from_str(&content)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Every report channel must be declared in some group.
    pub fn validate(&self) -> Result<()> {
        if self.time_column.trim().is_empty() {
            return Err(MonitorError::Config("schema time_column is empty".into()));
        }
        for name in &self.report_channels {
            if self.channel(name).is_none() {
                return Err(MonitorError::Config(format!(
                    "report channel \"{name}\" is not declared in any group"
                )));
            }
        }
        Ok(())
    }

    /// Iterate every declared channel in group order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.groups.iter().flat_map(|g| g.channels.iter())
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels().find(|c| c.name == name)
    }

    /// Report alias for `name`, falling back to the column name itself.
    pub fn alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.channel(name).map(|c| c.alias.as_str()).unwrap_or(name)
    }

    /// The channels summarized by the periodic report, in report order.
    pub fn report_channels(&self) -> Vec<&Channel> {
        self.report_channels
            .iter()
            .filter_map(|n| self.channel(n))
            .collect()
    }

    pub fn valve_names(&self) -> Vec<&str> {
        self.valves.iter().map(|v| v.name.as_str()).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dspx_schema_shape() {
        let schema = ChannelSchema::dspx();
        assert_eq!(schema.time_column, "heures");
        assert_eq!(schema.valves.len(), 23);
        assert_eq!(
            schema.report_channels,
            vec!["full range", "still", "Platine 4K"]
        );
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_alias_lookup() {
        let schema = ChannelSchema::dspx();
        assert_eq!(schema.alias("full range"), "MC (K)");
        assert_eq!(schema.alias("PT"), "Pulse Tube");
        assert_eq!(schema.alias("unknown column"), "unknown column");
    }

    #[test]
    fn test_channel_label() {
        let schema = ChannelSchema::dspx();
        assert_eq!(schema.channel("still").unwrap().label(), "Still (K)");
        assert_eq!(schema.channel("P1").unwrap().label(), "P1 (mbar)");
        assert_eq!(schema.channel("K3").unwrap().label(), "K3");
    }

    #[test]
    fn test_report_channels_resolve() {
        let schema = ChannelSchema::dspx();
        let names: Vec<&str> = schema
            .report_channels()
            .iter()
            .map(|c| c.alias.as_str())
            .collect();
        assert_eq!(names, vec!["MC (K)", "Still (K)", "4K (K)"]);
    }

    #[test]
    fn test_validate_rejects_undeclared_report_channel() {
        let mut schema = ChannelSchema::dspx();
        schema.report_channels.push("nope".into());
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_load_from_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        let json = serde_json::json!({
            "time_column": "clock",
            "groups": [{
                "title": "Temps",
                "channels": [{"name": "T1", "alias": "Plate", "unit": "K", "kind": "temperature"}]
            }],
            "report_channels": ["T1"]
        });
        std::fs::write(&path, json.to_string()).unwrap();

        let schema = ChannelSchema::load_from(&path).unwrap();
        assert_eq!(schema.time_column, "clock");
        assert!(schema.valves.is_empty());
        assert_eq!(schema.alias("T1"), "Plate");
    }

    #[test]
    fn test_valve_position_is_optional_in_json() {
        let valves: Vec<Valve> = serde_json::from_value(serde_json::json!([
            {"name": "VE1"},
            {"name": "VE2", "position": [698, 798]}
        ]))
        .unwrap();
        assert_eq!(valves[0].position, (0, 0));
        assert_eq!(valves[1].position, (698, 798));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = ChannelSchema::load_from(Path::new("/tmp/no-such-schema-xyz.json"));
        assert!(matches!(err, Err(MonitorError::FileRead { .. })));
    }
}
