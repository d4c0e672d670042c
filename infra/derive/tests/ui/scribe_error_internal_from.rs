use scribe_derive::scribe_error;
use std::borrow::Cow;

#[scribe_error]
pub enum DemoError {
    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn fail() -> Result<(), DemoError> {
    Err("boom".into())
}

fn main() {
    let err = fail().context("while testing").unwrap_err();
    assert_eq!(err.to_string(), "Internal error (while testing): boom");

    let owned: DemoError = String::from("owned").into();
    assert!(matches!(owned, DemoError::Internal { .. }));
}
