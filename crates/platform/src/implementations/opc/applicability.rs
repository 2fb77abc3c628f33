//! Payload selection for bundles
//!
//! Results are ordered as matches first, then region variants (only when no
//! exact language match was seen), then application packages without any
//! language match (only when no application package matched).

use appxtract_types::{ApplicabilityMode, MemberType};

use super::manifest::DeclaredPackage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Closeness {
    NoMatch,
    AnyMatch,
    AnyMatchWithScript,
    LanguageAndScript,
    Exact,
}

/// The parts of a BCP-47 tag that matter for matching, lower-cased
#[derive(Debug, Clone, PartialEq, Eq)]
struct LanguageTag {
    language: String,
    script: String,
    region: String,
}

impl LanguageTag {
    fn parse(tag: &str) -> Self {
        let lowered = tag.to_ascii_lowercase();
        let mut parts = lowered.split('-');
        let language = parts.next().unwrap_or_default().to_string();
        let mut script = String::new();
        let mut region = String::new();
        for part in parts {
            let alpha = part.chars().all(|c| c.is_ascii_alphabetic());
            if script.is_empty() && region.is_empty() && part.len() == 4 && alpha {
                script = part.to_string();
            } else if region.is_empty()
                && ((part.len() == 2 && alpha)
                    || (part.len() == 3 && part.chars().all(|c| c.is_ascii_digit())))
            {
                region = part.to_string();
            }
        }
        Self {
            language,
            script,
            region,
        }
    }

    fn neutral(&self) -> Self {
        Self {
            region: String::new(),
            ..self.clone()
        }
    }

    fn compare(&self, other: &Self) -> Closeness {
        if self.language == "und" || other.language == "und" {
            return if self.script == other.script {
                Closeness::AnyMatchWithScript
            } else {
                Closeness::AnyMatch
            };
        }
        if self.language == other.language && self.script == other.script {
            if self.region == other.region {
                return Closeness::Exact;
            }
            return Closeness::LanguageAndScript;
        }
        Closeness::NoMatch
    }
}

/// Select the applicable payload file names of a bundle
pub(crate) fn select_applicable(
    packages: &[DeclaredPackage],
    mode: &ApplicabilityMode,
) -> Vec<String> {
    let preferred: Vec<LanguageTag> = mode.languages.iter().map(|l| LanguageTag::parse(l)).collect();

    let mut matches = Vec::new();
    let mut variants = Vec::new();
    let mut extras = Vec::new();
    let mut has_exact_match = false;
    let mut has_application_match = false;

    for package in packages {
        let member = &package.member;
        if !mode.accepts_architecture(member.identity.architecture) {
            continue;
        }

        if !package.has_qualified_resources() || (mode.skip_platform && mode.skip_language) {
            matches.push(member.file_name.clone());
            continue;
        }

        // Scale-only resource packages are never applicable here
        if member.member_type == MemberType::Resource
            && !package.scales.is_empty()
            && member.languages.is_empty()
        {
            continue;
        }

        if mode.skip_language {
            matches.push(member.file_name.clone());
            continue;
        }

        let declared: Vec<LanguageTag> =
            member.languages.iter().map(|l| LanguageTag::parse(l)).collect();
        let mut has_match = false;
        let mut has_variant = false;

        for system in &preferred {
            for candidate in &declared {
                match system.compare(candidate) {
                    Closeness::Exact => {
                        has_exact_match = true;
                        has_match = true;
                        break;
                    }
                    Closeness::AnyMatch | Closeness::AnyMatchWithScript => has_match = true,
                    Closeness::LanguageAndScript => {
                        if system.neutral().compare(candidate) == Closeness::Exact {
                            has_match = true;
                        } else {
                            has_variant = true;
                        }
                    }
                    Closeness::NoMatch => {}
                }
            }
            if has_match {
                matches.push(member.file_name.clone());
                break;
            }
            if has_variant {
                variants.push(member.file_name.clone());
                break;
            }
        }

        if member.member_type == MemberType::Application {
            if has_match || has_variant {
                has_application_match = true;
            } else {
                extras.push(member.file_name.clone());
            }
        }
    }

    if !has_exact_match {
        matches.append(&mut variants);
    }
    if !has_application_match {
        matches.append(&mut extras);
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use appxtract_types::{Architecture, BundleMember, PackageIdentity};

    fn declared(
        file: &str,
        kind: MemberType,
        languages: &[&str],
        scales: &[&str],
    ) -> DeclaredPackage {
        let identity = PackageIdentity::new("App", "1.0.0.0", Architecture::Neutral, "CN=A");
        DeclaredPackage {
            member: BundleMember::new(file, identity, kind)
                .with_languages(languages.iter().copied()),
            scales: scales.iter().map(|s| (*s).to_string()).collect(),
            offset: 1,
        }
    }

    fn english() -> ApplicabilityMode {
        ApplicabilityMode::default().with_languages(["en-US"])
    }

    #[test]
    fn test_language_selection() {
        let packages = vec![
            declared("Main.appx", MemberType::Application, &["en-us"], &[]),
            declared("Lang-fr.appx", MemberType::Resource, &["fr-fr"], &[]),
            declared("Lang-en.appx", MemberType::Resource, &["EN-US"], &[]),
        ];
        assert_eq!(
            select_applicable(&packages, &english()),
            vec!["Main.appx", "Lang-en.appx"]
        );
    }

    #[test]
    fn test_unqualified_packages_always_apply() {
        let packages = vec![declared("Main.appx", MemberType::Application, &[], &[])];
        let mode = ApplicabilityMode::default();
        assert_eq!(select_applicable(&packages, &mode), vec!["Main.appx"]);
    }

    #[test]
    fn test_scale_only_resources_skipped() {
        let packages = vec![
            declared("Main.appx", MemberType::Application, &[], &[]),
            declared("Scale-200.appx", MemberType::Resource, &[], &["200"]),
        ];
        assert_eq!(select_applicable(&packages, &english()), vec!["Main.appx"]);
        assert_eq!(
            select_applicable(&packages, &ApplicabilityMode::all()),
            vec!["Main.appx", "Scale-200.appx"]
        );
    }

    #[test]
    fn test_variants_only_without_exact_match() {
        let packages = vec![
            declared("Main.appx", MemberType::Application, &["en-gb"], &[]),
            declared("Lang-au.appx", MemberType::Resource, &["en-au"], &[]),
        ];
        // No exact match for en-us: both region variants are kept, main first
        assert_eq!(
            select_applicable(&packages, &english()),
            vec!["Main.appx", "Lang-au.appx"]
        );

        let packages = vec![
            declared("Main.appx", MemberType::Application, &["en-us"], &[]),
            declared("Lang-au.appx", MemberType::Resource, &["en-au"], &[]),
        ];
        assert_eq!(select_applicable(&packages, &english()), vec!["Main.appx"]);
    }

    #[test]
    fn test_neutral_and_und_languages_match() {
        let packages = vec![
            declared("Main.appx", MemberType::Application, &["en"], &[]),
            declared("Any.appx", MemberType::Resource, &["und"], &[]),
        ];
        assert_eq!(
            select_applicable(&packages, &english()),
            vec!["Main.appx", "Any.appx"]
        );
    }

    #[test]
    fn test_unmatched_application_kept_as_fallback() {
        let packages = vec![
            declared("Lang-ja.appx", MemberType::Resource, &["ja-jp"], &[]),
            declared("Main.appx", MemberType::Application, &["de-de"], &[]),
        ];
        assert_eq!(select_applicable(&packages, &english()), vec!["Main.appx"]);
    }

    #[test]
    fn test_architecture_filter() {
        let mut arm = declared("Main-arm64.appx", MemberType::Application, &[], &[]);
        arm.member.identity.architecture = Architecture::Arm64;
        let mut x64 = declared("Main-x64.appx", MemberType::Application, &[], &[]);
        x64.member.identity.architecture = Architecture::X64;
        let mode = english().with_architectures(vec![Architecture::X64]);
        assert_eq!(select_applicable(&[arm, x64], &mode), vec!["Main-x64.appx"]);
    }

    #[test]
    fn test_tag_parsing() {
        let tag = LanguageTag::parse("zh-Hant-TW");
        assert_eq!(tag.language, "zh");
        assert_eq!(tag.script, "hant");
        assert_eq!(tag.region, "tw");
        assert_eq!(LanguageTag::parse("es-419").region, "419");
    }
}
