//! Unit tests for the Error type

use crate::Error;

#[test]
fn test_display_messages() {
    let e = Error::InitializationFailed("no device".to_string());
    assert_eq!(e.to_string(), "Initialization failed: no device");

    let e = Error::AtlasCapacityExceeded { distinct: 600, capacity: 512 };
    assert_eq!(
        e.to_string(),
        "Atlas capacity exceeded: 600 distinct characters, capacity 512"
    );

    let e = Error::ShaderNotFound("shaders/mesh.spv".to_string());
    assert_eq!(e.to_string(), "Shader file not found: shaders/mesh.spv");
}

#[test]
fn test_error_is_std_error() {
    fn takes_std_error(_: &dyn std::error::Error) {}
    takes_std_error(&Error::SurfaceOutOfDate);
}

#[test]
fn test_into_init_reclassifies_backend_errors() {
    let e = Error::BackendError("swapchain creation failed".to_string()).into_init();
    match e {
        Error::InitializationFailed(msg) => assert_eq!(msg, "swapchain creation failed"),
        other => panic!("unexpected error variant: {:?}", other),
    }

    // Other variants keep their identity.
    let e = Error::ShaderNotFound("shaders/mesh.spv".to_string()).into_init();
    assert!(matches!(e, Error::ShaderNotFound(_)));
    assert!(matches!(Error::SurfaceOutOfDate.into_init(), Error::SurfaceOutOfDate));
}

#[test]
fn test_term_err_macro_builds_backend_error() {
    let e = crate::term_err!("glyphterm::test", "fence wait failed: {}", 42);
    match e {
        Error::BackendError(msg) => assert_eq!(msg, "fence wait failed: 42"),
        other => panic!("unexpected error variant: {:?}", other),
    }
}
