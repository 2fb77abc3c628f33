//! Package and bundle manifest parsing

use std::io::Cursor;

use appxtract_errors::PlatformError;
use appxtract_types::{Architecture, BundleMember, MemberType, PackageIdentity};
use xml::attribute::OwnedAttribute;
use xml::reader::{EventReader, XmlEvent};

pub(crate) const PACKAGE_MANIFEST: &str = "AppxManifest.xml";
pub(crate) const BUNDLE_MANIFEST: &str = "AppxMetadata/AppxBundleManifest.xml";

/// What the pipeline needs out of `AppxManifest.xml`
#[derive(Debug, Clone)]
pub(crate) struct PackageManifest {
    pub identity: PackageIdentity,
    pub dependencies: Vec<String>,
}

/// One `Packages/Package` row plus the details only applicability cares about
#[derive(Debug, Clone)]
pub(crate) struct DeclaredPackage {
    pub member: BundleMember,
    pub scales: Vec<String>,
    /// Zero for payloads stored beside the bundle instead of inside it
    pub offset: u64,
}

impl DeclaredPackage {
    pub fn has_qualified_resources(&self) -> bool {
        !self.member.languages.is_empty() || !self.scales.is_empty()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct BundleManifest {
    pub identity: PackageIdentity,
    pub packages: Vec<DeclaredPackage>,
}

fn parse_error(message: impl Into<String>) -> PlatformError {
    PlatformError::ManifestParseFailed {
        message: message.into(),
    }
}

fn attribute<'a>(attributes: &'a [OwnedAttribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name.local_name == name && a.name.prefix.is_none())
        .map(|a| a.value.as_str())
}

fn required<'a>(
    attributes: &'a [OwnedAttribute],
    element: &str,
    name: &str,
) -> Result<&'a str, PlatformError> {
    attribute(attributes, name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| parse_error(format!("{element} is missing the {name} attribute")))
}

fn architecture(value: Option<&str>) -> Result<Architecture, PlatformError> {
    value.map_or(Ok(Architecture::Neutral), str::parse::<Architecture>)
}

/// Parse `AppxManifest.xml`
pub(crate) fn parse_package_manifest(bytes: &[u8]) -> Result<PackageManifest, PlatformError> {
    let reader = EventReader::new(Cursor::new(bytes));
    let mut stack: Vec<String> = Vec::new();
    let mut identity = None;
    let mut dependencies = Vec::new();

    for event in reader {
        match event.map_err(|e| parse_error(e.to_string()))? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                let element = name.local_name;
                match (stack.as_slice(), element.as_str()) {
                    ([], root) if root != "Package" => {
                        return Err(parse_error(format!(
                            "expected a Package root element, found {root}"
                        )));
                    }
                    ([root], "Identity") if root == "Package" => {
                        let name = required(&attributes, "Identity", "Name")?;
                        let version = required(&attributes, "Identity", "Version")?;
                        let publisher = required(&attributes, "Identity", "Publisher")?;
                        let arch = architecture(attribute(&attributes, "ProcessorArchitecture"))?;
                        identity = Some(
                            PackageIdentity::new(name, version, arch, publisher).with_resource_id(
                                attribute(&attributes, "ResourceId").unwrap_or_default(),
                            ),
                        );
                    }
                    ([.., parent], "PackageDependency") if parent == "Dependencies" => {
                        let dependency = required(&attributes, "PackageDependency", "Name")?;
                        dependencies.push(dependency.to_string());
                    }
                    _ => {}
                }
                stack.push(element);
            }
            XmlEvent::EndElement { .. } => {
                stack.pop();
            }
            _ => {}
        }
    }

    let identity = identity.ok_or_else(|| parse_error("manifest has no Identity element"))?;
    Ok(PackageManifest {
        identity,
        dependencies,
    })
}

#[derive(Default)]
struct PendingPackage {
    file_name: String,
    member_type: MemberType,
    version: String,
    architecture: Architecture,
    resource_id: String,
    offset: u64,
    languages: Vec<String>,
    scales: Vec<String>,
}

/// Parse `AppxMetadata/AppxBundleManifest.xml`
///
/// Payload identities share the bundle's name and publisher; version,
/// architecture and resource id come from each row.
pub(crate) fn parse_bundle_manifest(bytes: &[u8]) -> Result<BundleManifest, PlatformError> {
    let reader = EventReader::new(Cursor::new(bytes));
    let mut stack: Vec<String> = Vec::new();
    let mut bundle: Option<(String, String, String)> = None;
    let mut pending: Vec<PendingPackage> = Vec::new();

    for event in reader {
        match event.map_err(|e| parse_error(e.to_string()))? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                let element = name.local_name;
                match (stack.as_slice(), element.as_str()) {
                    ([], root) if root != "Bundle" => {
                        return Err(parse_error(format!(
                            "expected a Bundle root element, found {root}"
                        )));
                    }
                    ([root], "Identity") if root == "Bundle" => {
                        bundle = Some((
                            required(&attributes, "Identity", "Name")?.to_string(),
                            required(&attributes, "Identity", "Version")?.to_string(),
                            required(&attributes, "Identity", "Publisher")?.to_string(),
                        ));
                    }
                    ([_, parent], "Package") if parent == "Packages" => {
                        let offset = attribute(&attributes, "Offset")
                            .map(|v| {
                                v.parse::<u64>()
                                    .map_err(|_| parse_error(format!("invalid package offset {v}")))
                            })
                            .transpose()?
                            .unwrap_or(0);
                        pending.push(PendingPackage {
                            file_name: required(&attributes, "Package", "FileName")?.to_string(),
                            member_type: attribute(&attributes, "Type")
                                .map_or(Ok(MemberType::Application), str::parse::<MemberType>)?,
                            version: required(&attributes, "Package", "Version")?.to_string(),
                            architecture: architecture(attribute(&attributes, "Architecture"))?,
                            resource_id: attribute(&attributes, "ResourceId")
                                .unwrap_or_default()
                                .to_string(),
                            offset,
                            ..PendingPackage::default()
                        });
                    }
                    ([.., package, parent], "Resource")
                        if package == "Package" && parent == "Resources" =>
                    {
                        if let Some(current) = pending.last_mut() {
                            if let Some(language) = attribute(&attributes, "Language") {
                                current.languages.push(language.to_string());
                            }
                            if let Some(scale) = attribute(&attributes, "Scale") {
                                current.scales.push(scale.to_string());
                            }
                        }
                    }
                    _ => {}
                }
                stack.push(element);
            }
            XmlEvent::EndElement { .. } => {
                stack.pop();
            }
            _ => {}
        }
    }

    let (name, version, publisher) =
        bundle.ok_or_else(|| parse_error("bundle manifest has no Identity element"))?;
    let identity =
        PackageIdentity::new(name.clone(), version, Architecture::Neutral, publisher.clone())
            .into_bundle();

    let packages = pending
        .into_iter()
        .map(|p| {
            let identity =
                PackageIdentity::new(name.clone(), p.version, p.architecture, publisher.clone())
                    .with_resource_id(p.resource_id);
            DeclaredPackage {
                member: BundleMember::new(p.file_name, identity, p.member_type)
                    .with_languages(p.languages),
                scales: p.scales,
                offset: p.offset,
            }
        })
        .collect();

    Ok(BundleManifest { identity, packages })
}
