use scribe_domain::config::ApiConfig;
use scribe_recognition::{FixedRecognizer, Recognition, RecognitionError, init, with_recognizer};
use std::sync::Arc;

#[test]
fn missing_weights_fail_unless_allowed() {
    let mut config = ApiConfig::default();
    config.model.weights = "/nonexistent/weights.safetensors".into();

    let err = init(&config).unwrap_err();
    assert!(matches!(err, RecognitionError::Model { .. }));

    config.model.allow_missing = true;
    let slice = init(&config).expect("placeholder recognizer");
    assert_eq!(slice.id, std::any::TypeId::of::<Recognition>());
}

#[tokio::test]
async fn predict_runs_on_blocking_pool() {
    let slice = with_recognizer(Arc::new(FixedRecognizer::new("WORD")));
    let recognition = slice.downcast::<Recognition>().expect("recognition slice");

    let err = recognition.predict(b"not an image".to_vec()).await.unwrap_err();
    assert!(matches!(err, RecognitionError::Image { .. }));
}
