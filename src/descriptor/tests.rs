#[cfg(test)]
mod tests {
    use super::super::*;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
service: orders-${opt:suffix}

provider:
  name: aws
  project: shop
  stage: dev

functions:
  hello:
    name: hello-${opt:suffix}
    handler: com.example.Handler
    description: Says hello
    runtime: java8
    memorySize: 256
  bye:
    name: bye
    handler: bin/bye
    runtime: go1.x
"#;

    fn write_descriptor(content: &str) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("serverless.yml"), content).unwrap();
        dir
    }

    #[test]
    fn test_load_matching_provider() {
        let dir = write_descriptor(SAMPLE);
        let descriptor = ServiceDescriptor::load(dir.path(), "aws").unwrap();

        assert_eq!(descriptor.service, "orders-${opt:suffix}");
        assert_eq!(
            descriptor.provider,
            Provider {
                name: "aws".to_string(),
                project: "shop".to_string(),
                stage: "dev".to_string(),
            }
        );
        assert_eq!(descriptor.functions.len(), 2);

        let hello = &descriptor.functions["hello"];
        assert_eq!(hello.name, "hello-${opt:suffix}");
        assert_eq!(hello.handler, "com.example.Handler");
        assert_eq!(hello.description, "Says hello");
        assert_eq!(hello.runtime, "java8");
        assert_eq!(hello.memory_size, "256");

        let bye = &descriptor.functions["bye"];
        assert_eq!(bye.description, "");
        assert_eq!(bye.memory_size, "");
    }

    #[test]
    fn test_load_provider_mismatch() {
        let dir = write_descriptor(&SAMPLE.replace("name: aws", "name: gcp"));
        let err = ServiceDescriptor::load(dir.path(), "aws").unwrap_err();

        assert!(matches!(err, DescriptorError::ProviderMismatch { .. }));
        assert_eq!(err.to_string(), "expected provider aws, found provider: gcp");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = ServiceDescriptor::load(dir.path(), "aws").unwrap_err();

        assert!(matches!(err, DescriptorError::Read { .. }));
        assert!(err.to_string().contains("serverless.yml"));
    }

    #[test]
    fn test_load_malformed_yaml() {
        let dir = write_descriptor("service: [unterminated\nprovider: {");
        let err = ServiceDescriptor::load(dir.path(), "aws").unwrap_err();
        assert!(matches!(err, DescriptorError::Format(_)));
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        let err = ServiceDescriptor::parse("- just\n- a list\n").unwrap_err();
        assert!(err.to_string().contains("top level must be a mapping"));

        let err = ServiceDescriptor::parse("provider: aws\n").unwrap_err();
        assert!(err.to_string().contains("`provider` must be a mapping"));

        let err = ServiceDescriptor::parse("functions:\n  - hello\n").unwrap_err();
        assert!(err.to_string().contains("`functions` must be a mapping"));

        let err = ServiceDescriptor::parse("functions:\n  hello: nope\n").unwrap_err();
        assert!(err.to_string().contains("functions.hello"));

        let err = ServiceDescriptor::parse("service:\n  nested: true\n").unwrap_err();
        assert!(err.to_string().contains("`service` must be a scalar"));
    }

    #[test]
    fn test_parse_empty_document_fails_provider_check() {
        let descriptor = ServiceDescriptor::parse("").unwrap();
        assert_eq!(descriptor, ServiceDescriptor::default());

        let err = descriptor.check_provider("aws").unwrap_err();
        assert_eq!(err.to_string(), "expected provider aws, found provider: ");
    }

    #[test]
    fn test_parse_without_functions() {
        let descriptor =
            ServiceDescriptor::parse("service: api\nprovider:\n  name: aws\n").unwrap();
        assert!(descriptor.functions.is_empty());
        assert_eq!(descriptor.provider.project, "");
    }

    #[test]
    fn test_stack_id_strips_placeholder() {
        let mut descriptor = ServiceDescriptor::parse(SAMPLE).unwrap();
        assert_eq!(descriptor.stack_id(), "orders");

        descriptor.service = "${opt:suffix}orders".to_string();
        assert_eq!(descriptor.stack_id(), "orders");

        descriptor.service = "plain".to_string();
        assert_eq!(descriptor.stack_id(), "plain");
    }

    #[test]
    fn test_apply_suffix_rewrites_function_names_only() {
        let mut descriptor = ServiceDescriptor::parse(SAMPLE).unwrap();
        descriptor.apply_suffix("1700000000000000000");

        assert_eq!(descriptor.functions["hello"].name, "hello-1700000000000000000");
        assert_eq!(descriptor.functions["bye"].name, "bye");
        assert_eq!(descriptor.service, "orders-${opt:suffix}");
        assert_eq!(descriptor.stack_id(), "orders");
    }

    #[test]
    fn test_apply_suffix_replaces_every_occurrence() {
        let mut descriptor = ServiceDescriptor::parse(
            "functions:\n  twice:\n    name: a-${opt:suffix}-b-${opt:suffix}\n",
        )
        .unwrap();
        descriptor.apply_suffix("42");
        assert_eq!(descriptor.functions["twice"].name, "a-42-b-42");
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let descriptor = ServiceDescriptor::parse(SAMPLE).unwrap();
        let json = serde_json::to_value(descriptor.summary()).unwrap();

        assert_eq!(json["stackId"], "orders");
        assert_eq!(json["project"], "shop");
        assert_eq!(json["stage"], "dev");
        assert_eq!(json["functions"]["hello"]["memorySize"], "256");
    }
}
