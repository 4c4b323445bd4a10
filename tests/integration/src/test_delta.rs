//! Delta engine integration tests.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crdgen_core::{
        ChangeType, GenerationError, RenameMap, ResourceBuilder, Schema, compute_resource_delta,
    };
    use crdgen_model::{GeneratorConfig, ShapeModel};
    use serde_json::json;

    use crate::{registry, storage_manifest};

    /// A one-resource Smithy model whose bucket input has `members`.
    fn bucket_model(members: &[(&str, &str)]) -> ShapeModel {
        let members: serde_json::Map<String, serde_json::Value> = members
            .iter()
            .map(|(name, target)| ((*name).to_owned(), json!({ "target": target })))
            .collect();
        let doc = json!({
            "smithy": "2.0",
            "shapes": {
                "com.example#CreateBucket": {
                    "type": "operation",
                    "input": { "target": "com.example#CreateBucketRequest" },
                    "output": { "target": "com.example#CreateBucketResult" }
                },
                "com.example#CreateBucketRequest": { "type": "structure", "members": members },
                "com.example#CreateBucketResult": {
                    "type": "structure",
                    "members": { "BucketArn": { "target": "smithy.api#String" } }
                },
                "com.example#TagList": {
                    "type": "list",
                    "member": { "target": "smithy.api#String" }
                }
            }
        });
        ShapeModel::from_smithy_json(&doc.to_string()).unwrap()
    }

    fn summary(deltas: &[crdgen_core::FieldDelta<'_>]) -> Vec<(ChangeType, String)> {
        deltas
            .iter()
            .map(|d| (d.change_type, d.name().to_owned()))
            .collect()
    }

    #[test]
    fn test_should_report_added_field() {
        let spoke_model =
            bucket_model(&[("Name", "smithy.api#String"), ("Size", "smithy.api#Long")]);
        let hub_model = bucket_model(&[
            ("Name", "smithy.api#String"),
            ("Size", "smithy.api#Long"),
            ("Tags", "com.example#TagList"),
        ]);
        let config = GeneratorConfig::default();
        let spoke = ResourceBuilder::new(&spoke_model, &config).build().unwrap();
        let hub = ResourceBuilder::new(&hub_model, &config).build().unwrap();

        let delta = compute_resource_delta(
            spoke.resource("Bucket").unwrap(),
            Schema::new(&spoke_model, &spoke),
            hub.resource("Bucket").unwrap(),
            Schema::new(&hub_model, &hub),
        )
        .unwrap();
        assert_eq!(
            summary(&delta.spec),
            vec![
                (ChangeType::Intact, "Name".to_owned()),
                (ChangeType::Intact, "Size".to_owned()),
                (ChangeType::Added, "Tags".to_owned()),
            ]
        );
        assert!(delta.status.is_empty());
    }

    #[test]
    fn test_should_detect_rename_and_secret_change_across_versions() {
        let registry = registry(&storage_manifest()).unwrap();
        let comparisons = registry.compare_hub_with("v1alpha1").unwrap();
        let user = comparisons.iter().find(|c| c.resource == "User").unwrap();
        let delta = user.delta.as_ref().unwrap();

        assert_eq!(
            summary(&delta.spec),
            vec![
                (ChangeType::ShapeChangedToSecret, "Password".to_owned()),
                (ChangeType::Renamed, "Name".to_owned()),
            ]
        );
        let renamed = &delta.spec[1];
        assert_eq!(renamed.spoke.unwrap().names.original, "UserName");
        assert_eq!(renamed.hub.unwrap().names.original, "Name");
    }

    #[test]
    fn test_should_report_removed_composite_field() {
        let registry = registry(&storage_manifest()).unwrap();
        let comparisons = registry.compare_hub_with("v1beta1").unwrap();
        let bucket = comparisons.iter().find(|c| c.resource == "Bucket").unwrap();
        let delta = bucket.delta.as_ref().unwrap();

        assert_eq!(
            summary(&delta.spec),
            vec![
                (ChangeType::Removed, "Acl".to_owned()),
                (ChangeType::Intact, "Name".to_owned()),
                (ChangeType::Intact, "Rules".to_owned()),
                (ChangeType::Intact, "Size".to_owned()),
                (ChangeType::Intact, "Tags".to_owned()),
            ]
        );
        assert_eq!(
            summary(&delta.status),
            vec![(ChangeType::Intact, "CreationTime".to_owned())]
        );
    }

    #[test]
    fn test_should_cover_every_field_exactly_once() {
        let registry = registry(&storage_manifest()).unwrap();
        for spoke in ["v1alpha1", "v1beta1"] {
            let spoke_api = registry.api(spoke).unwrap();
            let hub_api = registry.api("v1").unwrap();
            for comparison in registry.compare_hub_with(spoke).unwrap() {
                let delta = comparison.delta.unwrap();
                let spoke_resource = spoke_api.api.resource(&comparison.resource).unwrap();
                let hub_resource = hub_api.api.resource(&comparison.resource).unwrap();

                for (deltas, spoke_fields, hub_fields) in [
                    (&delta.spec, &spoke_resource.spec_fields, &hub_resource.spec_fields),
                    (&delta.status, &spoke_resource.status_fields, &hub_resource.status_fields),
                ] {
                    let mut spoke_seen: BTreeMap<&str, usize> = BTreeMap::new();
                    let mut hub_seen: BTreeMap<&str, usize> = BTreeMap::new();
                    for d in deltas {
                        if let Some(f) = d.spoke {
                            *spoke_seen.entry(f.names.original.as_str()).or_default() += 1;
                        }
                        if let Some(f) = d.hub {
                            *hub_seen.entry(f.names.original.as_str()).or_default() += 1;
                        }
                    }
                    assert!(spoke_seen.values().all(|n| *n == 1));
                    assert!(hub_seen.values().all(|n| *n == 1));
                    assert_eq!(
                        spoke_seen.keys().copied().collect::<Vec<_>>(),
                        spoke_fields.keys().map(String::as_str).collect::<Vec<_>>()
                    );
                    assert_eq!(
                        hub_seen.keys().copied().collect::<Vec<_>>(),
                        hub_fields.keys().map(String::as_str).collect::<Vec<_>>()
                    );
                }
            }
        }
    }

    #[test]
    fn test_should_reject_non_injective_renames() {
        let renames = BTreeMap::from([
            ("BucketName".to_owned(), "Name".to_owned()),
            ("Title".to_owned(), "Name".to_owned()),
        ]);
        assert!(matches!(
            RenameMap::new(renames),
            Err(GenerationError::RenameInconsistency(_))
        ));
    }
}
