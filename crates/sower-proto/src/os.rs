//! Operating-system identifiers served by user-data plugins.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Operating systems with a dedicated user-data plugin.
///
/// The identifier doubles as the suffix of the plugin binary name and the
/// socket file name, so the set is closed: an unknown name is a parse error
/// at the edge of the system, not a runtime branch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OperatingSystem {
    /// Ubuntu LTS images.
    Ubuntu,
    /// CentOS images.
    Centos,
    /// Flatcar Container Linux images.
    Flatcar,
    /// Red Hat Enterprise Linux images.
    Rhel,
    /// Amazon Linux 2 images.
    Amzn2,
    /// SUSE Linux Enterprise Server images.
    Sles,
}

/// Errors encountered while parsing an [`OperatingSystem`] from text.
pub type OperatingSystemParseError = strum::ParseError;
