//! Version registry integration tests.

#[cfg(test)]
mod tests {
    use crdgen_core::GenerationError;

    use crate::{manifest, registry, storage_manifest};

    #[test]
    fn test_should_register_every_fixture_version() {
        let registry = registry(&storage_manifest()).unwrap();
        assert_eq!(registry.hub_version(), "v1");
        assert_eq!(
            registry.spoke_versions().collect::<Vec<_>>(),
            vec!["v1alpha1", "v1beta1"]
        );

        let names: Vec<&str> = registry
            .resources("v1")
            .unwrap()
            .iter()
            .map(|r| r.names.original.as_str())
            .collect();
        assert_eq!(names, vec!["Bucket", "User"]);
    }

    #[test]
    fn test_should_build_hub_resources_from_fixtures() {
        let registry = registry(&storage_manifest()).unwrap();
        let hub = registry.api("v1").unwrap();
        assert!(hub.api.failures.is_empty());

        let bucket = hub.api.resource("Bucket").unwrap();
        assert_eq!(
            bucket.spec_fields.keys().collect::<Vec<_>>(),
            vec!["Name", "Rules", "Size", "Tags"]
        );
        assert_eq!(bucket.status_fields.keys().collect::<Vec<_>>(), vec!["CreationTime"]);
        assert_eq!(bucket.primary_identifier.as_deref(), Some("BucketArn"));
        assert!(bucket.fields.contains_key("Tags..Key"));
        assert!(bucket.fields.contains_key("Rules..Status"));

        let user = hub.api.resource("User").unwrap();
        assert_eq!(user.spec_fields.keys().collect::<Vec<_>>(), vec!["Name", "Password"]);
        assert!(user.spec_fields["Password"].is_secret());

        let type_names: Vec<&str> = hub
            .api
            .type_defs
            .iter()
            .map(|t| t.type_name.as_str())
            .collect();
        assert_eq!(type_names, vec!["Rule", "Tag"]);
        assert_eq!(hub.api.enum_defs.len(), 1);
        assert_eq!(hub.api.enum_defs[0].values[0].original, "Disabled");
    }

    #[test]
    fn test_should_accept_deprecated_oldest_versions() {
        let registry = registry(&manifest(
            "v1",
            &[
                ("v1alpha1", "v1alpha1", true),
                ("v1alpha2", "v1alpha1", true),
                ("v1", "v1", false),
            ],
        ))
        .unwrap();
        assert_eq!(
            registry.deprecated_versions().collect::<Vec<_>>(),
            vec!["v1alpha1", "v1alpha2"]
        );
        assert!(matches!(
            registry.api("v1alpha2"),
            Err(GenerationError::VersionDeprecated(_))
        ));
    }

    #[test]
    fn test_should_reject_deprecating_a_newer_version_alone() {
        let err = registry(&manifest(
            "v1",
            &[
                ("v1alpha1", "v1alpha1", false),
                ("v1alpha2", "v1alpha1", true),
                ("v1", "v1", false),
            ],
        ))
        .unwrap_err();
        assert!(matches!(err, GenerationError::DeprecationPolicy(_)));
        assert!(err.is_run_level());
    }

    #[test]
    fn test_should_reject_deprecated_hub() {
        let err = registry(&manifest(
            "v1",
            &[("v1alpha1", "v1alpha1", false), ("v1", "v1", true)],
        ))
        .unwrap_err();
        assert!(matches!(err, GenerationError::DeprecationPolicy(_)));
    }

    #[test]
    fn test_should_reject_bad_manifests() {
        assert!(matches!(
            registry(&manifest("v1", &[])),
            Err(GenerationError::Config(_))
        ));
        assert!(matches!(
            registry(&manifest("v2", &[("v1", "v1", false)])),
            Err(GenerationError::Config(_))
        ));
        assert!(matches!(
            registry(&manifest("v1", &[("v1", "v9", false)])),
            Err(GenerationError::Internal(_))
        ));
        assert!(matches!(
            registry(&manifest("v1", &[("version-one", "v1", false), ("v1", "v1", false)])),
            Err(GenerationError::Config(_))
        ));
    }

    #[test]
    fn test_should_report_unknown_versions() {
        let registry = registry(&storage_manifest()).unwrap();
        assert!(matches!(
            registry.api("v2"),
            Err(GenerationError::VersionNotFound(_))
        ));
        assert!(matches!(
            registry.compare_hub_with("v1"),
            Err(GenerationError::Config(_))
        ));
    }
}
