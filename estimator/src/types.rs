use crate::labels::{Level, ShopCategory};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Pc,
    Mobile,
}

impl Device {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Device::Pc => "pc",
            Device::Mobile => "mobile",
        }
    }
}

/// Which devices a caller wants volumes for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceHint {
    #[default]
    All,
    Pc,
    Mobile,
}

impl DeviceHint {
    pub fn devices(&self) -> &'static [Device] {
        match self {
            DeviceHint::All => &[Device::Pc, Device::Mobile],
            DeviceHint::Pc => &[Device::Pc],
            DeviceHint::Mobile => &[Device::Mobile],
        }
    }

    pub fn includes(&self, device: Device) -> bool {
        self.devices().contains(&device)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            DeviceHint::All => "all",
            DeviceHint::Pc => "pc",
            DeviceHint::Mobile => "mobile",
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("unknown device `{0}`, expected all, pc or mobile")]
pub struct UnknownDevice(String);

impl FromStr for DeviceHint {
    type Err = UnknownDevice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(DeviceHint::All),
            "pc" => Ok(DeviceHint::Pc),
            "mobile" => Ok(DeviceHint::Mobile),
            other => Err(UnknownDevice(other.to_string())),
        }
    }
}

/// Monthly search volume split by device.
///
/// The total is always derived from the two halves and is never stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Volume {
    pc: u64,
    mobile: u64,
}

impl Volume {
    pub fn new(pc: u64, mobile: u64) -> Self {
        Volume { pc, mobile }
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn mobile(&self) -> u64 {
        self.mobile
    }

    pub fn total(&self) -> u64 {
        self.pc.saturating_add(self.mobile)
    }

    /// Zeroes out the devices the hint excludes.
    pub fn restrict_to(self, hint: DeviceHint) -> Self {
        Volume {
            pc: if hint.includes(Device::Pc) { self.pc } else { 0 },
            mobile: if hint.includes(Device::Mobile) {
                self.mobile
            } else {
                0
            },
        }
    }
}

impl Serialize for Volume {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Volume", 3)?;
        state.serialize_field("pcVolume", &self.pc)?;
        state.serialize_field("mobileVolume", &self.mobile)?;
        state.serialize_field("totalVolume", &self.total())?;
        state.end()
    }
}

/// Where the numbers of an estimate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateSource {
    /// Scored from real upstream signal.
    Upstream,
    /// Synthesized because no upstream returned any signal.
    Estimated,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeEstimate {
    pub keyword: String,
    #[serde(flatten)]
    pub volume: Volume,
    pub monthly_blog_rate: u64,
    pub web_total: u64,
    pub blog_total: u64,
    pub blog_saturation: Level,
    pub competition: Level,
    pub commercial: Level,
    pub shop_category: ShopCategory,
    pub source: EstimateSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_derived() {
        let volume = Volume::new(1440, 2880);
        assert_eq!(volume.total(), 4320);
        assert_eq!(Volume::new(u64::MAX, 1).total(), u64::MAX);
    }

    #[test]
    fn test_restrict_to_device() {
        let volume = Volume::new(10, 20);
        assert_eq!(volume.restrict_to(DeviceHint::All), volume);
        assert_eq!(volume.restrict_to(DeviceHint::Pc), Volume::new(10, 0));
        assert_eq!(volume.restrict_to(DeviceHint::Mobile), Volume::new(0, 20));
    }

    #[test]
    fn test_estimate_serialization() {
        let estimate = VolumeEstimate {
            keyword: "노트북".into(),
            volume: Volume::new(1440, 1440),
            monthly_blog_rate: 300,
            web_total: 24000,
            blog_total: 6000,
            blog_saturation: Level::VeryHigh,
            competition: Level::VeryHigh,
            commercial: Level::Low,
            shop_category: ShopCategory::Electronics,
            source: EstimateSource::Upstream,
        };

        let json = serde_json::to_value(&estimate).unwrap();
        assert_eq!(json["keyword"], "노트북");
        assert_eq!(json["pcVolume"], 1440);
        assert_eq!(json["mobileVolume"], 1440);
        assert_eq!(json["totalVolume"], 2880);
        assert_eq!(json["monthlyBlogRate"], 300);
        assert_eq!(json["blogSaturation"], "very-high");
        assert_eq!(json["shopCategory"], "electronics");
        assert_eq!(json["source"], "upstream");
    }

    #[test]
    fn test_device_hint_deserialization() {
        assert_eq!(
            serde_json::from_str::<DeviceHint>("\"pc\"").unwrap(),
            DeviceHint::Pc
        );
        assert!(serde_json::from_str::<DeviceHint>("\"tablet\"").is_err());
    }

    #[test]
    fn test_device_hint_from_str() {
        assert_eq!("mobile".parse::<DeviceHint>(), Ok(DeviceHint::Mobile));
        assert_eq!("".parse::<DeviceHint>(), Ok(DeviceHint::All));
        assert!("tablet".parse::<DeviceHint>().is_err());
    }
}
