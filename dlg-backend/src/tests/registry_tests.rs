use crate::ops::{lower_add, lower_relu, ADD, QUANTIZE_PER_TENSOR_TENSOR, RELU};
use crate::{Registry, RegistryBuilder};
use dlg_common::LoweringError;
use pretty_assertions::assert_eq;

#[test]
fn test_builtin_kinds() {
    let registry = Registry::with_builtins().unwrap();
    assert_eq!(registry.len(), 13);
    assert!(registry.contains(ADD));
    assert!(registry.contains(QUANTIZE_PER_TENSOR_TENSOR));
    assert!(!registry.contains("aten.conv2d.default"));

    let kinds: Vec<&str> = registry.kinds().collect();
    let mut sorted = kinds.clone();
    sorted.sort_unstable();
    assert_eq!(kinds, sorted);
}

#[test]
fn test_duplicate_registration() {
    let mut builder = RegistryBuilder::new();
    builder.register(RELU, lower_relu).unwrap();
    let err = builder.register(RELU, lower_relu).unwrap_err();
    assert_eq!(err, LoweringError::configuration("operator `aten.relu.default` registered twice"));

    let mut builder = RegistryBuilder::new().with_builtins().unwrap();
    assert!(matches!(
        builder.register(ADD, lower_add),
        Err(LoweringError::Configuration { .. })
    ));
}

#[test]
fn test_custom_registry() {
    let mut builder = RegistryBuilder::new();
    builder.register(RELU, lower_relu).unwrap();
    let registry = builder.build();
    assert_eq!(registry.len(), 1);
    assert_eq!(format!("{:?}", registry), r#"["aten.relu.default"]"#);
}
