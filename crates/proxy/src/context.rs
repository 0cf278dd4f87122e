//! Ambient customer attribution.
//!
//! Lets an application bind a customer id once for a whole scope instead of
//! threading it through every call site. Extractors consult
//! [`current_customer_id`] when no id was supplied at call time.

tokio::task_local! {
    static CUSTOMER_ID: String;
}

/// Run `fut` with the given customer id bound for its duration. Scopes nest;
/// the innermost binding wins.
pub async fn with_customer_id<F>(customer_id: impl Into<String>, fut: F) -> F::Output
where
    F: std::future::Future,
{
    CUSTOMER_ID.scope(customer_id.into(), fut).await
}

/// Customer id bound for the current task scope, if any.
pub fn current_customer_id() -> Option<String> {
    CUSTOMER_ID.try_with(|id| id.clone()).ok()
}
