//! Integration tests for config

#[cfg(test)]
mod tests {
    use appxtract_config::*;
    use appxtract_errors::{ConfigError, Error};
    use appxtract_types::{Architecture, ColorChoice, ValidationMode};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 4] = [
        "APPXTRACT_VALIDATE_SIGNATURE",
        "APPXTRACT_APPLY_ACLS",
        "APPXTRACT_STAGING_ROOT",
        "APPXTRACT_COLOR",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
color = "never"

[unpack]
validate_signature = false
apply_acls = true

[applicability]
languages = ["fr-FR"]
architectures = ["arm64"]

[staging]
root = "/var/tmp/appxtract"

[tools]
acl_command = {{ program = "icacls", args = ["{{path}}", "/grant", "Users:RX"] }}
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.color, ColorChoice::Never);
        assert_eq!(config.validation_mode(), ValidationMode::SkipSignature);
        assert!(config.unpack.apply_acls);
        assert_eq!(config.unpack.package_extensions, vec!["appx", "msix"]);
        assert_eq!(config.staging_root(), PathBuf::from("/var/tmp/appxtract"));
        assert_eq!(config.image.max_size_mb, 2_040_000);

        let mode = config.applicability_mode();
        assert_eq!(mode.languages, vec!["fr-fr"]);
        assert_eq!(mode.architectures, vec![Architecture::Arm64]);

        let acl = config.tools.acl_command.unwrap();
        assert_eq!(acl.program, "icacls");
        assert_eq!(acl.args[0], "{path}");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let err = Config::load_from_file(std::path::Path::new("/nonexistent/appxtract.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_overlapping_extensions_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[unpack]
package_extensions = ["msix"]
bundle_extensions = [".MSIX", "msixbundle"]
        "#
        )
        .unwrap();

        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::OverlappingExtension { ref extension }) if extension == "msix"
        ));
    }

    #[test]
    fn test_empty_extension_set_rejected() {
        let mut config = Config::default();
        config.unpack.bundle_extensions.clear();
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::EmptyExtensionSet { .. }))
        ));
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert!(config.unpack.validate_signature);
        assert!(!config.unpack.apply_acls);
        assert_eq!(config.image.min_size_mb, 5);
        assert!(config.tools.image_command.is_none());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("APPXTRACT_VALIDATE_SIGNATURE", "0");
        std::env::set_var("APPXTRACT_APPLY_ACLS", "yes");
        std::env::set_var("APPXTRACT_STAGING_ROOT", "/srv/stage");
        std::env::set_var("APPXTRACT_COLOR", "always");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert!(!config.unpack.validate_signature);
        assert!(config.unpack.apply_acls);
        assert_eq!(config.staging_root(), PathBuf::from("/srv/stage"));
        assert_eq!(config.general.color, ColorChoice::Always);

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("APPXTRACT_APPLY_ACLS", "sometimes");

        let mut config = Config::default();
        let result = config.merge_env();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue { .. }))
        ));

        clear_env();
    }
}
