use irm_core::errors::{ErrorInfo, IrmError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("domain", 5)
        .with_context("reason", "example")
}

#[test]
fn config_error_surface() {
    let err = IrmError::Config(sample_info("domain-out-of-range", "domain id out of range"));
    assert_eq!(err.info().code, "domain-out-of-range");
    assert_eq!(err.info().context.get("domain").map(String::as_str), Some("5"));
    assert!(err.is_config());
}

#[test]
fn primitive_error_surface() {
    let err = IrmError::Primitive(sample_info("slice-nonfinite", "log density is not finite"));
    assert_eq!(err.info().code, "slice-nonfinite");
    assert!(!err.is_config());
}

#[test]
fn ensemble_error_keeps_source_code_and_chain() {
    let source = IrmError::Primitive(sample_info("slice-nonfinite", "log density is not finite"));
    let err = IrmError::ensemble(3, source);
    match &err {
        IrmError::Ensemble(info) => {
            assert_eq!(info.code, "slice-nonfinite");
            assert_eq!(info.context.get("chain").map(String::as_str), Some("3"));
            assert_eq!(info.context.get("source.domain").map(String::as_str), Some("5"));
            assert!(info.message.contains("primitive failure"));
        }
        other => panic!("unexpected family: {other:?}"),
    }
}

#[test]
fn errors_round_trip_json() {
    let err = IrmError::Serde(sample_info("checkpoint-read", "missing file").with_hint("check path"));
    let json = serde_json::to_string(&err).unwrap();
    let restored: IrmError = serde_json::from_str(&json).unwrap();
    assert_eq!(err, restored);
    assert!(err.to_string().contains("hint: check path"));
}
