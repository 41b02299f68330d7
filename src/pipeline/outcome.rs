use std::sync::Arc;

use http::Extensions;

use crate::introspection::error::IntrospectionError;
use crate::introspection::result::Introspection;

/// Result of one validation: the authority's answer, or why there is none.
pub type Outcome = Result<Arc<Introspection>, IntrospectionError>;

/// Request-scoped slot the pipeline fills in. Absent until the pipeline has run.
#[derive(Debug, Clone)]
pub struct ValidationOutcome(pub Outcome);

/// Attach `outcome` to a request's extensions.
pub fn attach(extensions: &mut Extensions, outcome: Outcome) {
    extensions.insert(ValidationOutcome(outcome));
}

/// Outcome attached to a request, or `NotYetValidated` when the pipeline never ran.
pub fn from_extensions(extensions: &Extensions) -> Outcome {
    extensions
        .get::<ValidationOutcome>()
        .map(|outcome| outcome.0.clone())
        .unwrap_or(Err(IntrospectionError::NotYetValidated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_outcome_is_not_yet_validated() {
        let err = from_extensions(&Extensions::new()).unwrap_err();
        assert!(matches!(err, IntrospectionError::NotYetValidated));
    }

    #[test]
    fn attached_outcome_is_returned() {
        let mut extensions = Extensions::new();
        attach(&mut extensions, Err(IntrospectionError::NoCredential));
        assert!(matches!(
            from_extensions(&extensions),
            Err(IntrospectionError::NoCredential)
        ));

        attach(&mut extensions, Ok(Arc::new(Introspection::new(true))));
        assert!(from_extensions(&extensions).unwrap().is_active());
    }
}
