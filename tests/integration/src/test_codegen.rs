//! Conversion file generation integration tests.

#[cfg(test)]
mod tests {
    use crdgen_core::codegen::{Backend, ConversionFile, GoBackend};
    use crdgen_core::settings::GeneratorSettings;
    use crdgen_core::{
        ApiInfo, ApiSource, GenerationError, GenerationResult, VersionRegistry,
        generate_conversions, generate_conversions_with,
    };
    use crdgen_model::Names;

    use crate::{FixtureSource, init_tracing, manifest, registry, storage_manifest};

    #[test]
    fn test_should_emit_spoke_and_hub_files() {
        let registry = registry(&storage_manifest()).unwrap();
        let report = generate_conversions(&registry, &GeneratorSettings::default()).unwrap();

        assert_eq!(
            report.files.keys().map(String::as_str).collect::<Vec<_>>(),
            vec![
                "apis/v1/bucket_conversion.go",
                "apis/v1/user_conversion.go",
                "apis/v1alpha1/bucket_conversion.go",
                "apis/v1beta1/bucket_conversion.go",
                "apis/v1beta1/user_conversion.go",
            ]
        );

        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.version, "v1alpha1");
        assert_eq!(failure.resource, "User");
        assert!(matches!(
            &failure.error,
            GenerationError::UnsupportedChange { field, .. } if field == "Password"
        ));
    }

    #[test]
    fn test_should_render_hub_marker() {
        let registry = registry(&storage_manifest()).unwrap();
        let report = generate_conversions(&registry, &GeneratorSettings::default()).unwrap();
        let hub = &report.files["apis/v1/bucket_conversion.go"];
        assert!(hub.starts_with("// Code generated by crdgen. DO NOT EDIT.\n\npackage v1\n"));
        assert!(hub.contains("func (*Bucket) Hub() {}\n"));
    }

    #[test]
    fn test_should_render_spoke_conversions() {
        let registry = registry(&storage_manifest()).unwrap();
        let report = generate_conversions(&registry, &GeneratorSettings::default()).unwrap();
        let go = &report.files["apis/v1beta1/bucket_conversion.go"];

        for expected in [
            "package v1beta1\n",
            "\tackconversion \"github.com/aws-controllers-k8s/runtime/pkg/conversion\"\n",
            "\tctrlrtconversion \"sigs.k8s.io/controller-runtime/pkg/conversion\"\n",
            "\tv1 \"github.com/aws-controllers-k8s/controller/apis/v1\"\n",
            "func (src *Bucket) ConvertTo(dstRaw ctrlrtconversion.Hub) error {\n",
            "\tdst := dstRaw.(*v1.Bucket)\n",
            "\tdst.ObjectMeta = src.ObjectMeta\n",
            "\tdst.Status.ACKResourceMetadata = src.Status.ACKResourceMetadata\n",
            "\tdst.Status.Conditions = src.Status.Conditions\n",
            "\tdst.Spec.Name = src.Spec.Name\n",
            "\t// Spec.Acl only exists in v1beta1\n",
            "\t\tif err := ackconversion.AnnotateField(&dst.ObjectMeta, \"conversions.crdgen.dev/spec.Acl\", \"json\", src.Spec.Acl); err != nil {\n",
            "\t\ttagListCopy1 := make([]*v1.Tag, 0, len(src.Spec.Tags))\n",
            "\t\tfor _, tagsElem1 := range src.Spec.Tags {\n",
            "\t\t\tvar tagsElemCopy1 *v1.Tag\n",
            "\t\t\t\ttagCopy2 := &v1.Tag{}\n",
            "\t\t\t\ttagCopy2.Key = tagsElem1.Key\n",
            "\t\t\ttagListCopy1 = append(tagListCopy1, tagsElemCopy1)\n",
            "\t\truleMapCopy1 := make(map[string]*v1.Rule, len(src.Spec.Rules))\n",
            "\t\tfor rulesKey1, rulesVal1 := range src.Spec.Rules {\n",
            "\t\t\truleMapCopy1[rulesKey1] = rulesElemCopy1\n",
            "\tdst.Status.CreationTime = src.Status.CreationTime\n",
            "func (dst *Bucket) ConvertFrom(srcRaw ctrlrtconversion.Hub) error {\n",
            "\tsrc := srcRaw.(*v1.Bucket)\n",
            "\tif err := ackconversion.DecodeFieldAnnotation(&dst.ObjectMeta, \"conversions.crdgen.dev/spec.Acl\", \"json\", &dst.Spec.Acl); err != nil {\n",
            "\t\t\t\ttagCopy2 := &Tag{}\n",
            "\treturn nil\n}\n",
        ] {
            assert!(go.contains(expected), "missing {expected:?} in:\n{go}");
        }
    }

    #[test]
    fn test_should_copy_secrets_without_annotations() {
        let registry = registry(&storage_manifest()).unwrap();
        let report = generate_conversions(&registry, &GeneratorSettings::default()).unwrap();
        let go = &report.files["apis/v1beta1/user_conversion.go"];
        assert!(go.contains("\tdst.Spec.Password = src.Spec.Password\n"));
        assert!(!go.contains("ackconversion"));
    }

    #[test]
    fn test_should_honor_custom_settings() {
        let registry = registry(&storage_manifest()).unwrap();
        let settings = GeneratorSettings::builder()
            .api_module_path("example.com/storage/apis".to_owned())
            .annotation_prefix("storage.example.com/".to_owned())
            .builtin_status_fields(vec!["Conditions".to_owned()])
            .build();
        let report = generate_conversions(&registry, &settings).unwrap();
        let go = &report.files["apis/v1alpha1/bucket_conversion.go"];
        assert!(go.contains("\tv1 \"example.com/storage/apis/v1\"\n"));
        assert!(go.contains("\"storage.example.com/spec.Tags\""));
        assert!(!go.contains("ACKResourceMetadata"));
    }

    #[test]
    fn test_should_skip_deprecated_spokes() {
        let registry = registry(&manifest(
            "v1",
            &[
                ("v1alpha1", "v1alpha1", true),
                ("v1beta1", "v1beta1", false),
                ("v1", "v1", false),
            ],
        ))
        .unwrap();
        let report = generate_conversions(&registry, &GeneratorSettings::default()).unwrap();
        assert!(report.files.keys().all(|path| !path.starts_with("apis/v1alpha1/")));
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_should_produce_nothing_on_policy_violation() {
        init_tracing();
        let mut registry = VersionRegistry::new("v1");
        for (version, fixture, deprecated) in [
            ("v1alpha1", "v1alpha1", false),
            ("v1alpha2", "v1alpha1", true),
            ("v1", "v1", false),
        ] {
            let info = ApiInfo {
                deprecated,
                api_description: fixture.to_owned(),
                generator_config: fixture.to_owned(),
            };
            let (model, config) = FixtureSource.load(version, &info).unwrap();
            registry.register(version, info, model, config).unwrap();
        }
        let err = generate_conversions(&registry, &GeneratorSettings::default()).unwrap_err();
        assert!(matches!(err, GenerationError::DeprecationPolicy(_)));
    }

    #[test]
    fn test_should_generate_deterministically() {
        let settings = GeneratorSettings::default();
        let first_registry = registry(&storage_manifest()).unwrap();
        let second_registry = registry(&storage_manifest()).unwrap();
        let first = generate_conversions(&first_registry, &settings).unwrap();
        let second = generate_conversions(&second_registry, &settings).unwrap();
        assert_eq!(first.files, second.files);
        assert_eq!(first.failures.len(), second.failures.len());
    }

    /// Go backend that refuses to render the `User` conversion file.
    struct UserRefusingBackend {
        inner: GoBackend,
        run_level: bool,
    }

    impl Backend for UserRefusingBackend {
        fn file_extension(&self) -> &'static str {
            self.inner.file_extension()
        }

        fn render_conversion_file(&self, file: &ConversionFile) -> GenerationResult<String> {
            if file.resource.original != "User" {
                return self.inner.render_conversion_file(file);
            }
            if self.run_level {
                Err(anyhow::anyhow!("template store unavailable").into())
            } else {
                Err(std::fmt::Error.into())
            }
        }

        fn render_hub_file(&self, package: &str, resource: &Names) -> GenerationResult<String> {
            self.inner.render_hub_file(package, resource)
        }
    }

    #[test]
    fn test_should_collect_resource_level_render_failures() {
        let registry = registry(&storage_manifest()).unwrap();
        let settings = GeneratorSettings::default();
        let backend = UserRefusingBackend {
            inner: GoBackend::new(settings.clone()),
            run_level: false,
        };
        let report = generate_conversions_with(&registry, &settings, &backend).unwrap();
        assert!(!report.files.contains_key("apis/v1beta1/user_conversion.go"));
        assert!(report.files.contains_key("apis/v1beta1/bucket_conversion.go"));
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[1].error, GenerationError::Render(_)));
    }

    #[test]
    fn test_should_abort_on_run_level_failures() {
        let registry = registry(&storage_manifest()).unwrap();
        let settings = GeneratorSettings::default();
        let backend = UserRefusingBackend {
            inner: GoBackend::new(settings.clone()),
            run_level: true,
        };
        let err = generate_conversions_with(&registry, &settings, &backend).unwrap_err();
        assert!(err.is_run_level());
        assert!(matches!(err, GenerationError::Internal(_)));
    }
}
