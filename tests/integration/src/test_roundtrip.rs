//! Round trips through generated conversions, run with the reference evaluator.

#[cfg(test)]
mod tests {
    use crdgen_core::codegen::{ConversionFunction, ConversionGenerator, Direction, evaluate};
    use crdgen_core::settings::GeneratorSettings;
    use crdgen_core::VersionRegistry;
    use serde_json::{Value, json};

    use crate::{registry, storage_manifest};

    /// `ConvertTo` and `ConvertFrom` of `resource` in `spoke`.
    fn conversions(
        registry: &VersionRegistry,
        spoke: &str,
        resource: &str,
    ) -> (ConversionFunction, ConversionFunction) {
        let settings = GeneratorSettings::default();
        let generator = ConversionGenerator::new(
            &settings,
            registry.api(spoke).unwrap(),
            registry.api(registry.hub_version()).unwrap(),
        );
        let delta = registry
            .compare_hub_with(spoke)
            .unwrap()
            .into_iter()
            .find(|c| c.resource == resource)
            .unwrap()
            .delta
            .unwrap();
        (
            generator.generate(&delta, Direction::ToHub).unwrap(),
            generator.generate(&delta, Direction::FromHub).unwrap(),
        )
    }

    fn hub_bucket() -> Value {
        json!({
            "ObjectMeta": { "Name": "photos", "Namespace": "media" },
            "Spec": {
                "Name": "photos",
                "Size": 1024,
                "Tags": [{ "Key": "env", "Value": "prod" }],
                "Rules": { "expire": { "Id": "r1", "Status": "Enabled" } }
            },
            "Status": {
                "ACKResourceMetadata": { "ARN": "arn:aws:storage:::photos" },
                "Conditions": [],
                "CreationTime": "2024-05-01T10:00:00Z"
            }
        })
    }

    #[test]
    fn test_should_round_trip_spoke_without_removed_fields() {
        let registry = registry(&storage_manifest()).unwrap();
        let (to_hub, from_hub) = conversions(&registry, "v1alpha1", "Bucket");
        let spoke = json!({
            "ObjectMeta": { "Name": "photos" },
            "Spec": { "Name": "photos", "Size": 1024 },
            "Status": { "Conditions": [], "CreationTime": "2024-05-01T10:00:00Z" }
        });

        let hub = evaluate(&to_hub, &spoke).unwrap();
        assert_eq!(hub, spoke);
        assert_eq!(evaluate(&from_hub, &hub).unwrap(), spoke);
    }

    #[test]
    fn test_should_carry_added_fields_through_annotations() {
        let registry = registry(&storage_manifest()).unwrap();
        let (to_hub, from_hub) = conversions(&registry, "v1alpha1", "Bucket");
        let hub = hub_bucket();

        let spoke = evaluate(&from_hub, &hub).unwrap();
        assert_eq!(spoke["Spec"], json!({ "Name": "photos", "Size": 1024 }));
        assert_eq!(
            spoke["ObjectMeta"]["Annotations"],
            json!({
                "conversions.crdgen.dev/spec.Rules": r#"json={"expire":{"Id":"r1","Status":"Enabled"}}"#,
                "conversions.crdgen.dev/spec.Tags": r#"json=[{"Key":"env","Value":"prod"}]"#
            })
        );

        assert_eq!(evaluate(&to_hub, &spoke).unwrap(), hub);
    }

    #[test]
    fn test_should_carry_removed_fields_through_annotations() {
        let registry = registry(&storage_manifest()).unwrap();
        let (to_hub, from_hub) = conversions(&registry, "v1beta1", "Bucket");
        let mut spoke = hub_bucket();
        spoke["Spec"]["Acl"] = json!([{ "Grantee": "alice", "Permission": "READ" }]);

        let hub = evaluate(&to_hub, &spoke).unwrap();
        assert!(hub["Spec"].get("Acl").is_none());
        assert_eq!(hub["Spec"]["Tags"], spoke["Spec"]["Tags"]);
        assert_eq!(hub["Spec"]["Rules"], spoke["Spec"]["Rules"]);
        assert_eq!(
            hub["ObjectMeta"]["Annotations"]["conversions.crdgen.dev/spec.Acl"],
            json!(r#"json=[{"Grantee":"alice","Permission":"READ"}]"#)
        );

        assert_eq!(evaluate(&from_hub, &hub).unwrap(), spoke);
    }

    #[test]
    fn test_should_keep_foreign_annotations() {
        let registry = registry(&storage_manifest()).unwrap();
        let (to_hub, from_hub) = conversions(&registry, "v1alpha1", "Bucket");
        let mut hub = hub_bucket();
        hub["ObjectMeta"]["Annotations"] = json!({ "team": "media" });

        let spoke = evaluate(&from_hub, &hub).unwrap();
        assert_eq!(spoke["ObjectMeta"]["Annotations"]["team"], json!("media"));
        assert_eq!(evaluate(&to_hub, &spoke).unwrap(), hub);
    }

    #[test]
    fn test_should_round_trip_secret_references() {
        let registry = registry(&storage_manifest()).unwrap();
        let (to_hub, from_hub) = conversions(&registry, "v1beta1", "User");
        let hub = json!({
            "ObjectMeta": { "Name": "alice" },
            "Spec": {
                "Name": "alice",
                "Password": { "Namespace": "media", "Name": "alice-creds", "Key": "password" }
            }
        });

        let spoke = evaluate(&from_hub, &hub).unwrap();
        assert_eq!(spoke, hub);
        assert_eq!(evaluate(&to_hub, &spoke).unwrap(), hub);
    }
}
