//! Static endpoint catalog: object types and their API locations.
//!
//! The Jamf Pro server exposes two coexisting API generations:
//!
//! - **Classic**: the XML-era path family under `JSSResource/`. Objects are
//!   addressed by `/id/{id}`, and a full listing wraps its array in a
//!   per-type envelope key (e.g. `computer_groups`).
//! - **Modern**: the versioned JSON family under `api/…` (and `uapi/…` for
//!   scripts). Objects are addressed by `/{id}` and listings are paged with
//!   a `results` array.
//!
//! [`ObjectType`] is a closed enumeration and [`ObjectType::descriptor`] is
//! an exhaustive match, so every known type resolves at compile time and an
//! unknown type can only arise from user input, where it surfaces as a
//! typed [`ToolError::UnknownObjectType`] via `FromStr`.

use std::fmt;
use std::str::FromStr;

use crate::error::ToolError;

/// Which API generation an endpoint belongs to. Determines URI style for
/// id-addressed operations and the body format for classic uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiGeneration {
    /// `JSSResource/` paths, `/id/{id}` addressing, XML upload bodies.
    Classic,
    /// Versioned `api/`/`uapi/` paths, `/{id}` addressing, JSON bodies.
    Modern,
}

/// Static metadata for one object type's API endpoint.
#[derive(Debug, Clone, Copy)]
pub struct EndpointDescriptor {
    /// Path relative to the server base URL, without leading slash.
    pub path: &'static str,
    /// API generation this endpoint belongs to.
    pub generation: ApiGeneration,
    /// Envelope key wrapping a full-listing response. `results` for modern
    /// endpoints; the classic per-type plural key otherwise.
    pub list_key: &'static str,
    /// Envelope key wrapping a single-object classic response. Empty for
    /// modern endpoints, which return the object unwrapped.
    pub detail_key: &'static str,
}

/// Every managed object type this tool knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    /// Saved advanced computer search.
    AdvancedComputerSearch,
    /// Saved advanced mobile device search.
    AdvancedMobileDeviceSearch,
    /// Category (modern API).
    Category,
    /// Computer inventory record.
    Computer,
    /// Computer (smart or static) group.
    ComputerGroup,
    /// Computer PreStage enrollment (modern API).
    ComputerPrestage,
    /// Computer extension attribute.
    ExtensionAttribute,
    /// Mac App Store application.
    MacApplication,
    /// Mobile device App Store application.
    MobileDeviceApplication,
    /// Mobile device configuration profile.
    MobileDeviceConfigurationProfile,
    /// Mobile device (smart or static) group.
    MobileDeviceGroup,
    /// macOS configuration profile.
    OsxConfigurationProfile,
    /// Package.
    Package,
    /// Patch policy.
    PatchPolicy,
    /// Patch software title.
    PatchSoftwareTitle,
    /// Policy.
    Policy,
    /// Restricted software record.
    RestrictedSoftware,
    /// Script (modern API).
    Script,
    /// Bearer-token endpoint. Not a listable collection; present so the
    /// transport can recognize it for Basic-auth selection.
    Token,
}

impl ObjectType {
    /// All catalog entries, for exhaustiveness checks and CLI help.
    pub const ALL: [ObjectType; 19] = [
        ObjectType::AdvancedComputerSearch,
        ObjectType::AdvancedMobileDeviceSearch,
        ObjectType::Category,
        ObjectType::Computer,
        ObjectType::ComputerGroup,
        ObjectType::ComputerPrestage,
        ObjectType::ExtensionAttribute,
        ObjectType::MacApplication,
        ObjectType::MobileDeviceApplication,
        ObjectType::MobileDeviceConfigurationProfile,
        ObjectType::MobileDeviceGroup,
        ObjectType::OsxConfigurationProfile,
        ObjectType::Package,
        ObjectType::PatchPolicy,
        ObjectType::PatchSoftwareTitle,
        ObjectType::Policy,
        ObjectType::RestrictedSoftware,
        ObjectType::Script,
        ObjectType::Token,
    ];

    /// Resolves this type's endpoint metadata. Total over the enumeration.
    pub fn descriptor(self) -> EndpointDescriptor {
        use ApiGeneration::{Classic, Modern};
        match self {
            ObjectType::AdvancedComputerSearch => EndpointDescriptor {
                path: "JSSResource/advancedcomputersearches",
                generation: Classic,
                list_key: "advanced_computer_searches",
                detail_key: "advanced_computer_search",
            },
            ObjectType::AdvancedMobileDeviceSearch => EndpointDescriptor {
                path: "JSSResource/advancedmobiledevicesearches",
                generation: Classic,
                list_key: "advanced_mobile_device_searches",
                detail_key: "advanced_mobile_device_search",
            },
            ObjectType::Category => EndpointDescriptor {
                path: "api/v1/categories",
                generation: Modern,
                list_key: "results",
                detail_key: "",
            },
            ObjectType::Computer => EndpointDescriptor {
                path: "JSSResource/computers",
                generation: Classic,
                list_key: "computers",
                detail_key: "computer",
            },
            ObjectType::ComputerGroup => EndpointDescriptor {
                path: "JSSResource/computergroups",
                generation: Classic,
                list_key: "computer_groups",
                detail_key: "computer_group",
            },
            ObjectType::ComputerPrestage => EndpointDescriptor {
                path: "api/v2/computer-prestages",
                generation: Modern,
                list_key: "results",
                detail_key: "",
            },
            ObjectType::ExtensionAttribute => EndpointDescriptor {
                path: "JSSResource/computerextensionattributes",
                generation: Classic,
                list_key: "computer_extension_attributes",
                detail_key: "computer_extension_attribute",
            },
            ObjectType::MacApplication => EndpointDescriptor {
                path: "JSSResource/macapplications",
                generation: Classic,
                list_key: "mac_applications",
                detail_key: "mac_application",
            },
            ObjectType::MobileDeviceApplication => EndpointDescriptor {
                path: "JSSResource/mobiledeviceapplications",
                generation: Classic,
                list_key: "mobile_device_applications",
                detail_key: "mobile_device_application",
            },
            ObjectType::MobileDeviceConfigurationProfile => EndpointDescriptor {
                path: "JSSResource/mobiledeviceconfigurationprofiles",
                generation: Classic,
                list_key: "configuration_profiles",
                detail_key: "configuration_profile",
            },
            ObjectType::MobileDeviceGroup => EndpointDescriptor {
                path: "JSSResource/mobiledevicegroups",
                generation: Classic,
                list_key: "mobile_device_groups",
                detail_key: "mobile_device_group",
            },
            ObjectType::OsxConfigurationProfile => EndpointDescriptor {
                path: "JSSResource/osxconfigurationprofiles",
                generation: Classic,
                list_key: "os_x_configuration_profiles",
                detail_key: "os_x_configuration_profile",
            },
            ObjectType::Package => EndpointDescriptor {
                path: "JSSResource/packages",
                generation: Classic,
                list_key: "packages",
                detail_key: "package",
            },
            ObjectType::PatchPolicy => EndpointDescriptor {
                path: "JSSResource/patchpolicies",
                generation: Classic,
                list_key: "patch_policies",
                detail_key: "patch_policy",
            },
            ObjectType::PatchSoftwareTitle => EndpointDescriptor {
                path: "JSSResource/patchsoftwaretitles",
                generation: Classic,
                list_key: "patch_software_titles",
                detail_key: "patch_software_title",
            },
            ObjectType::Policy => EndpointDescriptor {
                path: "JSSResource/policies",
                generation: Classic,
                list_key: "policies",
                detail_key: "policy",
            },
            ObjectType::RestrictedSoftware => EndpointDescriptor {
                path: "JSSResource/restrictedsoftware",
                generation: Classic,
                list_key: "restricted_software",
                detail_key: "restricted_software",
            },
            ObjectType::Script => EndpointDescriptor {
                path: "uapi/v1/scripts",
                generation: Modern,
                list_key: "results",
                detail_key: "",
            },
            ObjectType::Token => EndpointDescriptor {
                path: "api/v1/auth/token",
                generation: Modern,
                list_key: "results",
                detail_key: "",
            },
        }
    }

    /// The canonical snake_case name, as accepted by `FromStr`.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::AdvancedComputerSearch => "advanced_computer_search",
            ObjectType::AdvancedMobileDeviceSearch => "advanced_mobile_device_search",
            ObjectType::Category => "category",
            ObjectType::Computer => "computer",
            ObjectType::ComputerGroup => "computer_group",
            ObjectType::ComputerPrestage => "computer_prestage",
            ObjectType::ExtensionAttribute => "extension_attribute",
            ObjectType::MacApplication => "mac_application",
            ObjectType::MobileDeviceApplication => "mobile_device_application",
            ObjectType::MobileDeviceConfigurationProfile => "configuration_profile",
            ObjectType::MobileDeviceGroup => "mobile_device_group",
            ObjectType::OsxConfigurationProfile => "os_x_configuration_profile",
            ObjectType::Package => "package",
            ObjectType::PatchPolicy => "patch_policy",
            ObjectType::PatchSoftwareTitle => "patch_software_title",
            ObjectType::Policy => "policy",
            ObjectType::RestrictedSoftware => "restricted_software",
            ObjectType::Script => "script",
            ObjectType::Token => "token",
        }
    }

    /// URL for a full listing of this type. Modern endpoints are paged and
    /// sorted by id so repeated runs see a stable order.
    pub fn list_url(self, base_url: &str) -> String {
        let desc = self.descriptor();
        match desc.generation {
            ApiGeneration::Classic => format!("{}/{}", base_url.trim_end_matches('/'), desc.path),
            ApiGeneration::Modern => format!(
                "{}/{}?page=0&page-size=1000&sort=id%3Adesc",
                base_url.trim_end_matches('/'),
                desc.path
            ),
        }
    }

    /// URL addressing one object by id: `/id/{id}` on the classic API,
    /// `/{id}` on the modern API. Used for GET detail and DELETE.
    pub fn object_url(self, base_url: &str, id: &str) -> String {
        let desc = self.descriptor();
        let base = base_url.trim_end_matches('/');
        match desc.generation {
            ApiGeneration::Classic => format!("{}/{}/id/{}", base, desc.path, id),
            ApiGeneration::Modern => format!("{}/{}/{}", base, desc.path, id),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectType::ALL
            .into_iter()
            .find(|ot| ot.as_str() == s)
            .ok_or_else(|| ToolError::UnknownObjectType(s.to_string()))
    }
}
